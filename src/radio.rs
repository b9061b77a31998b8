//! Radio driver interface.

use thiserror::Error;

use crate::CalibrationData;
use crate::init_data::InitData;

/// Calibration policy handed to the radio driver at registration.
#[derive(strum::FromRepr, strum::Display, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum CalMode {
    /// Use the supplied calibration data as-is.
    None = 1,
    /// Measure fresh calibration data, overwriting the supplied buffer.
    Full = 2,
}

/// The driver rejected the supplied calibration data.
///
/// When the check fails the driver has already fallen back to a fresh
/// measurement and repopulated the buffer, the caller only has to persist
/// it.
#[derive(Error, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("calibration data check failed")]
pub struct DataCheckFailed;

/// The vendor radio driver.
pub trait Radio {
    /// Version of the calibration data format the driver expects. Bit 16 is
    /// a reserved flag and not part of the version.
    fn cal_format_version(&self) -> u32;

    /// Registers the radio with the given init parameters and calibration
    /// policy. In [`CalMode::Full`] the driver measures and writes fresh
    /// data into `cal_data`.
    fn register(
        &mut self,
        init_data: &InitData,
        cal_data: &mut CalibrationData,
        mode: CalMode,
    ) -> Result<(), DataCheckFailed>;
}
