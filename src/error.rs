use thiserror::Error;

/// Errors that can occur while loading or storing calibration data.
///
/// Provisioning defects (missing or undersized calibration partition, missing
/// init parameters) are not represented here, they panic instead: the flash
/// image is broken and booting on without calibration capability must not be
/// attempted.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The internal error value is returned from the provided flash
    /// implementation. Non-fatal, the boot continues with whatever
    /// calibration state it has.
    #[error("internal flash error")]
    FlashError,

    /// The stored blob carries a different calibration-format version than
    /// the radio driver expects. This is the expected first-boot condition
    /// and triggers a full calibration rather than failing the boot.
    #[error("invalid calibration data version")]
    InvalidVersion,
}
