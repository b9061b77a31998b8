#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
pub mod init_data;
pub mod partition;
pub mod platform;
pub mod radio;
pub mod reset;

extern crate alloc;

use alloc::boxed::Box;
use core::mem::size_of;
use core::slice::{from_raw_parts, from_raw_parts_mut};

#[cfg(feature = "defmt")]
use defmt::{Debug2Format, error, info, trace, warn};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::error::Error;
use crate::init_data::InitDataProvider;
use crate::partition::{Partition, PartitionTable, PartitionType, SUBTYPE_PHY};
use crate::platform::{Platform, write_aligned};
use crate::radio::{CalMode, DataCheckFailed, Radio};
use crate::reset::ResetReason;

/// Reserved flag bit in the driver-reported calibration version. Masked off
/// before the version comparison.
const CAL_VERSION_FLAG: u32 = 1 << 16;

/// The persisted calibration record. Byte layout matches the vendor
/// calibration blob: the version tag in the first four bytes, the rest is
/// driver-owned measurement data written to flash verbatim.
#[repr(C)]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CalibrationData {
    /// Calibration-format version tag, little endian.
    pub version: [u8; 4],
    /// Station MAC address the data was measured against.
    pub mac: [u8; 6],
    /// Driver-owned measurement payload.
    pub opaque: [u8; 1894],
}

const _: () = assert!(
    size_of::<CalibrationData>() == 1904,
    "Calibration blob layout must match the vendor record"
);

impl CalibrationData {
    pub const SIZE: usize = size_of::<CalibrationData>();

    /// A freshly zeroed blob on the heap.
    pub fn zeroed() -> Box<CalibrationData> {
        Box::new(CalibrationData {
            version: [0; 4],
            mac: [0; 6],
            opaque: [0; 1894],
        })
    }

    /// The stored calibration-format version tag.
    pub fn version(&self) -> u32 {
        u32::from_le_bytes(self.version)
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = version.to_le_bytes();
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { from_raw_parts(self as *const CalibrationData as *const u8, Self::SIZE) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { from_raw_parts_mut(self as *mut CalibrationData as *mut u8, Self::SIZE) }
    }
}

/// Loads, persists and applies PHY calibration data across reboots.
///
/// The calibration partition is resolved once at construction; it is
/// provisioned at image-build time and never moves at runtime.
pub struct PhyCal<T: Platform> {
    hal: T,
    partition: Partition,
}

impl<T: Platform> PhyCal<T> {
    /// Locates the calibration partition and binds it to the given flash.
    ///
    /// Panics if the partition is absent or smaller than the calibration
    /// blob. Both mean the flash image is broken; booting on without
    /// calibration capability is not an option.
    pub fn new(table: &impl PartitionTable, hal: T) -> PhyCal<T> {
        let partition = table
            .find_first(PartitionType::Data, SUBTYPE_PHY)
            .expect("no PHY calibration partition");
        assert!(
            partition.size >= CalibrationData::SIZE,
            "PHY calibration partition is too small"
        );

        Self { hal, partition }
    }

    /// Reads the stored blob into `out` and checks its version tag.
    ///
    /// `driver_version` is the raw version reported by the radio driver;
    /// the reserved flag bit is masked off before the comparison. A
    /// mismatch yields [`Error::InvalidVersion`], the expected condition on
    /// a fresh or power-interrupted partition.
    pub fn load(&mut self, driver_version: u32, out: &mut CalibrationData) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("loading stored calibration");

        self.hal
            .read(self.partition.offset, out.as_bytes_mut())
            .map_err(|_e| {
                #[cfg(feature = "defmt")]
                error!("read err ({})", Debug2Format(&_e));
                Error::FlashError
            })?;

        let cal_format_version = driver_version & !CAL_VERSION_FLAG;
        let cal_data_version = out.version();
        if cal_format_version != cal_data_version {
            #[cfg(feature = "defmt")]
            warn!(
                "invalid data version ({} != {}), calibrating",
                cal_data_version, cal_format_version
            );
            return Err(Error::InvalidVersion);
        }

        Ok(())
    }

    /// Erases the whole partition, then writes the full blob at offset 0.
    ///
    /// There is no journaling: a power loss between the erase and the write
    /// leaves the partition blank, which the next boot's load reports as a
    /// stale version.
    pub fn store(&mut self, cal: &CalibrationData) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("storing calibration");

        let from = self.partition.offset;
        let to = from + self.partition.size as u32;
        self.hal.erase(from, to).map_err(|_e| {
            #[cfg(feature = "defmt")]
            error!("erase err ({})", Debug2Format(&_e));
            Error::FlashError
        })?;

        write_aligned(&mut self.hal, from, cal.as_bytes()).map_err(|_e| {
            #[cfg(feature = "defmt")]
            error!("write err ({})", Debug2Format(&_e));
            Error::FlashError
        })?;

        Ok(())
    }

    /// Registers the radio with stored or freshly measured calibration data.
    ///
    /// Run once at radio driver startup, before any concurrent tasks are
    /// scheduled. The stored blob is used when its version matches; any
    /// other outcome (absent data, read failure, stale version, driver
    /// rejection) ends in a full calibration whose result is persisted.
    ///
    /// Makes exactly one registration call and at most one erase+write
    /// cycle. An `Err` only reflects a failed store; the radio is running
    /// either way and the caller may continue booting.
    ///
    /// Panics if the provider has no init data (a broken firmware image).
    pub fn load_and_init<R: Radio>(
        &mut self,
        radio: &mut R,
        init_data: &impl InitDataProvider,
        reset_reason: ResetReason,
    ) -> Result<(), Error> {
        let mut cal = CalibrationData::zeroed();

        let provided = init_data.get().expect("failed to obtain PHY init data");

        // After a brown-out, register with a clamped copy of the power
        // table. The provider's storage stays untouched.
        #[cfg(feature = "reduce-tx-power")]
        let reduced = if reset_reason == ResetReason::Brownout {
            let mut clone = Box::new(provided.clone());
            clone.reduce_tx_power();
            Some(clone)
        } else {
            None
        };
        #[cfg(feature = "reduce-tx-power")]
        let init_data = reduced.as_deref().unwrap_or(provided);
        #[cfg(not(feature = "reduce-tx-power"))]
        let init_data = provided;
        #[cfg(not(feature = "reduce-tx-power"))]
        let _ = reset_reason;

        match self.load(radio.cal_format_version(), &mut cal) {
            Ok(()) => match radio.register(init_data, &mut cal, CalMode::None) {
                Ok(()) => Ok(()),
                Err(DataCheckFailed) => {
                    // The driver recalibrated on its own; persist the result.
                    #[cfg(feature = "defmt")]
                    warn!("saving new calibration data because of failure");
                    self.store(&cal)
                }
            },
            Err(_) => {
                // A full calibration measures fresh data, there is nothing
                // left to check.
                let _ = radio.register(init_data, &mut cal, CalMode::Full);
                #[cfg(feature = "defmt")]
                info!("saving new calibration data");
                self.store(&cal)
            }
        }
    }
}
