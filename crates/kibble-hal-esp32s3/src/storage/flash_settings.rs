//! Settings record kept in the last sector of a writable data partition.

use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use kibble_core::settings::{
    RECORD_CAPACITY, RecordError, Settings, SettingsStore, decode_record, encode_record,
};
use log::info;

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashSettingsError {
    PartitionTable,
    SettingsPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Misaligned,
    Unsupported,
    Record(RecordError),
}

impl From<RecordError> for FlashSettingsError {
    fn from(err: RecordError) -> Self {
        Self::Record(err)
    }
}

/// Word-granular access to the SPI flash through the ROM routines.
#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashSettingsError> {
        check(unsafe { esp_rom_spiflash_unlock() })?;
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FlashSettingsError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashSettingsError::Misaligned);
        }
        check(unsafe { esp_rom_spiflash_erase_sector(sector_addr / FLASH_SECTOR_SIZE) })
    }

    fn read_word(&mut self, addr: u32) -> Result<[u8; 4], FlashSettingsError> {
        let mut word = 0u32;
        check(unsafe { esp_rom_spiflash_read(addr, &mut word as *mut u32 as *const u32, 4) })?;
        Ok(word.to_le_bytes())
    }

    fn write_word(&mut self, addr: u32, bytes: [u8; 4]) -> Result<(), FlashSettingsError> {
        let word = u32::from_le_bytes(bytes);
        check(unsafe { esp_rom_spiflash_write(addr, &word as *const u32, 4) })
    }

    /// Reads any byte range; unaligned edges are fetched as whole words.
    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashSettingsError> {
        let end = addr + out.len() as u32;
        let mut word_addr = addr & !0b11;

        while word_addr < end {
            let word = self.read_word(word_addr)?;
            for (i, byte) in word.iter().enumerate() {
                let at = word_addr + i as u32;
                if (addr..end).contains(&at) {
                    out[(at - addr) as usize] = *byte;
                }
            }
            word_addr += 4;
        }
        Ok(())
    }

    /// Programs `data` into an erased region starting at a word boundary.
    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashSettingsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashSettingsError::Misaligned);
        }

        for (i, chunk) in data.chunks(4).enumerate() {
            let mut word = [0xFFu8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.write_word(addr + (i * 4) as u32, word)?;
        }
        Ok(())
    }
}

fn check(rc: i32) -> Result<(), FlashSettingsError> {
    if rc == ESP_ROM_SPIFLASH_RESULT_OK {
        Ok(())
    } else {
        Err(FlashSettingsError::FlashOpFailed(rc))
    }
}

impl ReadStorage for RawFlash {
    type Error = FlashSettingsError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

// Only the partition table reader goes through these traits, and it never
// writes.
impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashSettingsError::Unsupported)
    }
}

#[derive(Debug)]
pub struct FlashSettingsStore {
    flash: RawFlash,
    settings_sector_addr: u32,
}

impl FlashSettingsStore {
    /// Locates the settings sector: the first writable `data/undefined`
    /// partition, falling back to `nvs`.
    pub fn new() -> Result<Self, FlashSettingsError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FlashSettingsError::PartitionTable)?;

        let mut data_undefined: Option<(u32, u32)> = None;
        let mut fallback_nvs: Option<(u32, u32)> = None;

        for entry in table.iter() {
            if entry.is_read_only() {
                continue;
            }

            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    data_undefined = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) if fallback_nvs.is_none() => {
                    fallback_nvs = Some((entry.offset(), entry.len()));
                }
                _ => {}
            }
        }

        let (offset, len) = data_undefined
            .or(fallback_nvs)
            .ok_or(FlashSettingsError::SettingsPartitionMissing)?;

        if len < FLASH_SECTOR_SIZE {
            return Err(FlashSettingsError::PartitionTooSmall);
        }

        let settings_sector_addr = offset + len - FLASH_SECTOR_SIZE;
        info!("settings: record sector at 0x{:08X}", settings_sector_addr);
        Ok(Self {
            flash,
            settings_sector_addr,
        })
    }
}

impl SettingsStore for FlashSettingsStore {
    type Error = FlashSettingsError;

    fn load(&mut self) -> Result<Option<Settings>, Self::Error> {
        let mut buf = [0xFFu8; RECORD_CAPACITY];
        self.flash.read_bytes(self.settings_sector_addr, &mut buf)?;
        Ok(decode_record(&buf)?)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), Self::Error> {
        let mut buf = [0xFFu8; RECORD_CAPACITY];
        let len = encode_record(settings, &mut buf)?;

        self.flash.erase_sector(self.settings_sector_addr)?;
        self.flash.program(self.settings_sector_addr, &buf[..len])?;
        Ok(())
    }
}
