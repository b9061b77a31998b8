//! Partition lookup.
//!
//! Calibration data lives in a dedicated data partition provisioned at
//! flash-image build time. [`PartitionTable`] abstracts the lookup so tests
//! can substitute a fixed table; [`FlashPartitionTable`] parses the ESP-IDF
//! binary partition table out of flash.

use alloc::vec::Vec;
use core::mem::size_of;

use embedded_storage::nor_flash::ReadNorFlash;

use crate::error::Error;

/// Flash offset of the binary partition table.
pub const PARTITION_TABLE_OFFSET: u32 = 0x8000;
/// Maximum size of the binary partition table.
pub const PARTITION_TABLE_SIZE: usize = 0xC00;

/// Magic of a regular partition entry.
const ENTRY_MAGIC: u16 = 0x50AA;
/// Magic of the MD5 checksum entry terminating the table.
const MD5_MAGIC: u16 = 0xEBEB;

/// Partition subtype of the PHY calibration data partition.
pub const SUBTYPE_PHY: u8 = 0x01;

#[derive(strum::FromRepr, strum::Display, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PartitionType {
    App = 0x00,
    Data = 0x01,
}

/// A fixed region of flash. Provisioned when the image is built, never
/// resized at runtime.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Partition {
    pub offset: u32,
    pub size: usize,
}

/// Lookup of partitions by type and subtype.
pub trait PartitionTable {
    /// The first partition matching `type_` and `subtype`, in table order.
    fn find_first(&self, type_: PartitionType, subtype: u8) -> Option<Partition>;
}

#[repr(C, packed)]
#[derive(Copy, Clone)]
struct RawEntry {
    magic: u16,
    type_: u8,
    subtype: u8,
    offset: u32,
    size: u32,
    _label: [u8; 16],
    _flags: u32,
}

const _: () = assert!(
    size_of::<RawEntry>() == 32,
    "Partition table entries are 32 bytes"
);

union EntryBytes {
    entry: RawEntry,
    raw: [u8; size_of::<RawEntry>()],
}

/// In-memory copy of the flash-resident partition table.
pub struct FlashPartitionTable {
    entries: Vec<(PartitionType, u8, Partition)>,
}

impl FlashPartitionTable {
    /// Reads and parses the binary partition table at
    /// [`PARTITION_TABLE_OFFSET`].
    ///
    /// Scanning stops at the MD5 checksum entry or the first blank slot;
    /// entries with unknown type bytes are skipped.
    pub fn read_from<T: ReadNorFlash>(hal: &mut T) -> Result<FlashPartitionTable, Error> {
        let mut entries = Vec::new();

        let mut offset = PARTITION_TABLE_OFFSET;
        let end = PARTITION_TABLE_OFFSET + PARTITION_TABLE_SIZE as u32;
        while offset < end {
            let mut slot = EntryBytes {
                raw: [0u8; size_of::<RawEntry>()],
            };
            hal.read(offset, unsafe { &mut slot.raw })
                .map_err(|_| Error::FlashError)?;
            let entry = unsafe { slot.entry };

            match entry.magic {
                ENTRY_MAGIC => {
                    if let Some(type_) = PartitionType::from_repr(entry.type_) {
                        entries.push((
                            type_,
                            entry.subtype,
                            Partition {
                                offset: entry.offset,
                                size: entry.size as usize,
                            },
                        ));
                    }
                }
                // The MD5 entry is always last, everything after it is blank.
                MD5_MAGIC => break,
                _ => break,
            }

            offset += size_of::<RawEntry>() as u32;
        }

        Ok(FlashPartitionTable { entries })
    }
}

impl PartitionTable for FlashPartitionTable {
    fn find_first(&self, type_: PartitionType, subtype: u8) -> Option<Partition> {
        self.entries
            .iter()
            .find(|(t, s, _)| *t == type_ && *s == subtype)
            .map(|(_, _, partition)| *partition)
    }
}
