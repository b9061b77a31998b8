//! Reset reason.

/// Why the chip was last reset.
///
/// Only [`ResetReason::Brownout`] affects calibration behavior; the full set
/// is kept so callers can pass their HAL's reason through unmapped. The
/// discriminants match the vendor reset reason codes.
#[derive(strum::FromRepr, strum::Display, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ResetReason {
    Unknown = 0,
    PowerOn = 1,
    External = 2,
    Software = 3,
    Panic = 4,
    IntWatchdog = 5,
    TaskWatchdog = 6,
    Watchdog = 7,
    DeepSleep = 8,
    Brownout = 9,
    Sdio = 10,
}
