#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use esp_phy_cal::CalibrationData;
use esp_phy_cal::init_data::{INIT_DATA_PARAMS, InitData, InitDataProvider};
use esp_phy_cal::partition::{Partition, PartitionTable, PartitionType, SUBTYPE_PHY};
use esp_phy_cal::radio::{CalMode, DataCheckFailed};

pub const FLASH_SECTOR_SIZE: usize = 4096;
// Taken from https://github.com/esp-rs/esp-hal/blob/main/esp-storage/src/stub.rs
pub const WORD_SIZE: usize = 4;

/// Calibration-format version used throughout the tests.
pub const CAL_VERSION: u32 = 0x0102_0003;
/// Reserved flag bit the loader must mask off the driver-reported version.
pub const CAL_VERSION_FLAG: u32 = 1 << 16;

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(sectors: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * sectors],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(sectors: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * sectors],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn erases(&mut self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }
}

#[derive(Debug)]
pub struct FlashFault;

impl NorFlashError for FlashFault {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashFault;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        println!(
            "    flash: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashFault);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashFault);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashFault);
        }
        assert!(bytes.len() > 0);

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // flash writes can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

/// Fixed in-memory partition table.
pub struct Partitions(pub Vec<(PartitionType, u8, Partition)>);

impl Partitions {
    /// A table holding only a PHY calibration partition.
    pub fn with_phy(offset: u32, size: usize) -> Self {
        Self(vec![(
            PartitionType::Data,
            SUBTYPE_PHY,
            Partition { offset, size },
        )])
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

impl PartitionTable for Partitions {
    fn find_first(&self, type_: PartitionType, subtype: u8) -> Option<Partition> {
        self.0
            .iter()
            .find(|(t, s, _)| *t == type_ && *s == subtype)
            .map(|(_, _, partition)| *partition)
    }
}

/// Scripted radio driver recording every registration.
pub struct Driver {
    pub version: u32,
    /// Blob the driver "measures" in full-calibration mode.
    pub measured: Box<CalibrationData>,
    /// When set, stored data handed over in [`CalMode::None`] is rejected.
    pub reject_stored: bool,
    pub registrations: Vec<CalMode>,
    /// Init parameters seen by the most recent registration.
    pub last_params: Option<[u8; INIT_DATA_PARAMS]>,
}

impl Driver {
    pub fn new() -> Self {
        let mut measured = CalibrationData::zeroed();
        measured.set_version(CAL_VERSION);
        measured.mac = [0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01];
        for (i, byte) in measured.opaque.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        Self {
            version: CAL_VERSION | CAL_VERSION_FLAG,
            measured,
            reject_stored: false,
            registrations: Vec::new(),
            last_params: None,
        }
    }
}

impl esp_phy_cal::radio::Radio for Driver {
    fn cal_format_version(&self) -> u32 {
        self.version
    }

    fn register(
        &mut self,
        init_data: &InitData,
        cal_data: &mut CalibrationData,
        mode: CalMode,
    ) -> Result<(), DataCheckFailed> {
        self.registrations.push(mode);
        self.last_params = Some(init_data.params);

        match mode {
            CalMode::Full => {
                *cal_data = (*self.measured).clone();
                Ok(())
            }
            CalMode::None => {
                if self.reject_stored {
                    // the real driver recalibrates in place when the data
                    // check fails
                    *cal_data = (*self.measured).clone();
                    Err(DataCheckFailed)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Provider handing out a fixed init record.
pub struct StaticInitData(pub InitData);

impl StaticInitData {
    pub fn new() -> Self {
        Self(InitData {
            params: [0x40; INIT_DATA_PARAMS],
        })
    }
}

impl InitDataProvider for StaticInitData {
    fn get(&self) -> Option<&InitData> {
        Some(&self.0)
    }
}

/// Provider of a firmware image without init data.
pub struct NoInitData;

impl InitDataProvider for NoInitData {
    fn get(&self) -> Option<&InitData> {
        None
    }
}

/// Copies a blob into the fake flash without going through the store path.
pub fn preload(flash: &mut Flash, offset: usize, cal: &CalibrationData) {
    flash.buf[offset..offset + CalibrationData::SIZE].copy_from_slice(cal.as_bytes());
}

/// A fully populated blob as a previous boot would have persisted it.
pub fn stored_blob(version: u32) -> Box<CalibrationData> {
    let mut cal = CalibrationData::zeroed();
    cal.set_version(version);
    cal.mac = [0x24, 0x0A, 0xC4, 0xAA, 0xBB, 0xCC];
    for (i, byte) in cal.opaque.iter_mut().enumerate() {
        *byte = (i % 239) as u8;
    }
    cal
}
