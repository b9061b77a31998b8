//! PHY init parameters.

/// Number of parameter bytes in the init record.
pub const INIT_DATA_PARAMS: usize = 128;

/// First transmit-power table entry in [`InitData::params`].
pub const TX_POWER_OFFSET: usize = 2;
/// Number of transmit-power table entries.
pub const TX_POWER_NUM: usize = 14;
/// Lowest defined transmit power, in quarter dBm.
pub const TX_POWER_LOWEST: u8 = 8;

/// Read-only PHY configuration record (antenna and power tables). Owned by
/// firmware read-only storage; the layout matches the vendor init data blob
/// for the target chip.
#[repr(C)]
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitData {
    pub params: [u8; INIT_DATA_PARAMS],
}

impl InitData {
    /// Clamps every transmit-power table entry to [`TX_POWER_LOWEST`].
    ///
    /// Applied to a clone of the init data after a brown-out reset, to keep
    /// the power draw low enough to avoid a repeat brown-out.
    #[cfg(feature = "reduce-tx-power")]
    pub fn reduce_tx_power(&mut self) {
        for entry in &mut self.params[TX_POWER_OFFSET..TX_POWER_OFFSET + TX_POWER_NUM] {
            *entry = TX_POWER_LOWEST;
        }
    }
}

/// Source of the init parameters.
///
/// The returned borrow points into read-only storage and is released when it
/// is dropped. `None` means the firmware image carries no init data, a
/// provisioning defect the bootstrap treats as fatal.
pub trait InitDataProvider {
    fn get(&self) -> Option<&InitData>;
}
