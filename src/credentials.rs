use embedded_storage::{ReadStorage, Storage};

use crate::config::{
    CREDENTIAL_STORE_MAGIC, CREDENTIAL_STORE_RECORD_LEN, CREDENTIAL_STORE_VERSION,
    WIFI_PASSWORD_MAX, WIFI_SSID_MAX,
};
use crate::error::{CredentialsError, PersistenceFault};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: [u8; WIFI_SSID_MAX],
    pub ssid_len: u8,
    pub password: [u8; WIFI_PASSWORD_MAX],
    pub password_len: u8,
}

impl WifiCredentials {
    pub fn from_parts(ssid: &[u8], password: &[u8]) -> Result<Self, CredentialsError> {
        if ssid.is_empty() || ssid.len() > WIFI_SSID_MAX || password.len() > WIFI_PASSWORD_MAX {
            return Err(CredentialsError::InvalidLength);
        }
        let mut result = Self {
            ssid: [0u8; WIFI_SSID_MAX],
            ssid_len: ssid.len() as u8,
            password: [0u8; WIFI_PASSWORD_MAX],
            password_len: password.len() as u8,
        };
        result.ssid[..ssid.len()].copy_from_slice(ssid);
        result.password[..password.len()].copy_from_slice(password);
        Ok(result)
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid[..self.ssid_len as usize]
    }

    pub fn password(&self) -> &[u8] {
        &self.password[..self.password_len as usize]
    }

    pub fn ssid_str(&self) -> Option<&str> {
        core::str::from_utf8(self.ssid()).ok()
    }

    pub fn password_str(&self) -> Option<&str> {
        core::str::from_utf8(self.password()).ok()
    }
}

/// Persistent get/set/erase of the station identity.
pub trait CredentialStore {
    /// `Ok(None)` when nothing valid is stored.
    fn load(&mut self) -> Result<Option<WifiCredentials>, PersistenceFault>;
    fn save(&mut self, credentials: &WifiCredentials) -> Result<(), PersistenceFault>;
    fn erase(&mut self) -> Result<(), PersistenceFault>;
}

/// Single checksummed record at a fixed flash offset. An all-0xFF record is
/// empty.
pub struct FlashCredentialStore<F> {
    flash: F,
    offset: u32,
}

impl<F: Storage> FlashCredentialStore<F> {
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    fn load_record(&mut self) -> Result<Option<[u8; CREDENTIAL_STORE_RECORD_LEN]>, PersistenceFault> {
        let mut record = [0u8; CREDENTIAL_STORE_RECORD_LEN];
        self.flash
            .read(self.offset, &mut record)
            .map_err(|_| PersistenceFault::Read)?;
        if record.iter().all(|&byte| byte == 0xFF) {
            return Ok(None);
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != CREDENTIAL_STORE_MAGIC
        {
            return Ok(None);
        }
        let expected = checksum8(&record[..CREDENTIAL_STORE_RECORD_LEN - 1]);
        if record[CREDENTIAL_STORE_RECORD_LEN - 1] != expected {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

const SSID_LEN_AT: usize = 5;
const SSID_AT: usize = SSID_LEN_AT + 1;
const PASSWORD_LEN_AT: usize = SSID_AT + WIFI_SSID_MAX;
const PASSWORD_AT: usize = PASSWORD_LEN_AT + 1;

impl<F: Storage> CredentialStore for FlashCredentialStore<F> {
    fn load(&mut self) -> Result<Option<WifiCredentials>, PersistenceFault> {
        let Some(record) = self.load_record()? else {
            return Ok(None);
        };
        if record[4] != CREDENTIAL_STORE_VERSION {
            return Ok(None);
        }
        let ssid_len = record[SSID_LEN_AT] as usize;
        let password_len = record[PASSWORD_LEN_AT] as usize;
        if ssid_len > WIFI_SSID_MAX || password_len > WIFI_PASSWORD_MAX {
            return Ok(None);
        }
        Ok(WifiCredentials::from_parts(
            &record[SSID_AT..SSID_AT + ssid_len],
            &record[PASSWORD_AT..PASSWORD_AT + password_len],
        )
        .ok())
    }

    fn save(&mut self, credentials: &WifiCredentials) -> Result<(), PersistenceFault> {
        let mut record = [0xFFu8; CREDENTIAL_STORE_RECORD_LEN];
        record[0..4].copy_from_slice(&CREDENTIAL_STORE_MAGIC.to_le_bytes());
        record[4] = CREDENTIAL_STORE_VERSION;
        record[SSID_LEN_AT] = credentials.ssid_len;
        record[SSID_AT..SSID_AT + WIFI_SSID_MAX].copy_from_slice(&credentials.ssid);
        record[PASSWORD_LEN_AT] = credentials.password_len;
        record[PASSWORD_AT..PASSWORD_AT + WIFI_PASSWORD_MAX].copy_from_slice(&credentials.password);
        record[CREDENTIAL_STORE_RECORD_LEN - 1] =
            checksum8(&record[..CREDENTIAL_STORE_RECORD_LEN - 1]);
        self.flash
            .write(self.offset, &record)
            .map_err(|_| PersistenceFault::Write)?;

        match self.load()? {
            Some(stored) if stored == *credentials => Ok(()),
            _ => Err(PersistenceFault::Write),
        }
    }

    fn erase(&mut self) -> Result<(), PersistenceFault> {
        let record = [0xFFu8; CREDENTIAL_STORE_RECORD_LEN];
        self.flash
            .write(self.offset, &record)
            .map_err(|_| PersistenceFault::Erase)
    }
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FLASH_LEN: usize = 4096;

    /// RAM-backed flash with optional write failure.
    pub(crate) struct RamFlash {
        pub(crate) bytes: [u8; FLASH_LEN],
        pub(crate) fail_writes: bool,
    }

    impl RamFlash {
        pub(crate) fn erased() -> Self {
            Self {
                bytes: [0xFF; FLASH_LEN],
                fail_writes: false,
            }
        }
    }

    #[derive(Debug)]
    pub(crate) struct RamFlashError;

    impl ReadStorage for RamFlash {
        type Error = RamFlashError;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let src = self
                .bytes
                .get(start..start + bytes.len())
                .ok_or(RamFlashError)?;
            bytes.copy_from_slice(src);
            Ok(())
        }

        fn capacity(&self) -> usize {
            FLASH_LEN
        }
    }

    impl Storage for RamFlash {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err(RamFlashError);
            }
            let start = offset as usize;
            self.bytes
                .get_mut(start..start + bytes.len())
                .ok_or(RamFlashError)?
                .copy_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn erased_flash_has_no_credentials() {
        let mut store = FlashCredentialStore::new(RamFlash::erased(), 0);
        assert!(matches!(store.load(), Ok(None)));
    }

    #[test]
    fn saved_credentials_load_back() {
        let mut store = FlashCredentialStore::new(RamFlash::erased(), 1024);
        let credentials = WifiCredentials::from_parts(b"lab-net", b"hunter22").unwrap();
        store.save(&credentials).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.ssid_str(), Some("lab-net"));
        assert_eq!(loaded.password_str(), Some("hunter22"));
    }

    #[test]
    fn corrupted_record_reads_as_empty() {
        let mut store = FlashCredentialStore::new(RamFlash::erased(), 0);
        let credentials = WifiCredentials::from_parts(b"lab-net", b"").unwrap();
        store.save(&credentials).unwrap();
        store.flash.bytes[SSID_AT] ^= 0x01;
        assert!(matches!(store.load(), Ok(None)));
    }

    #[test]
    fn erase_clears_record() {
        let mut store = FlashCredentialStore::new(RamFlash::erased(), 0);
        let credentials = WifiCredentials::from_parts(b"x", b"y").unwrap();
        store.save(&credentials).unwrap();
        store.erase().unwrap();
        assert!(matches!(store.load(), Ok(None)));
    }

    #[test]
    fn write_failure_surfaces_as_fault() {
        let mut flash = RamFlash::erased();
        flash.fail_writes = true;
        let mut store = FlashCredentialStore::new(flash, 0);
        let credentials = WifiCredentials::from_parts(b"x", b"y").unwrap();
        assert_eq!(store.save(&credentials), Err(PersistenceFault::Write));
    }

    #[test]
    fn credential_lengths_are_validated() {
        assert!(WifiCredentials::from_parts(b"", b"pw").is_err());
        assert!(WifiCredentials::from_parts(&[b'a'; 33], b"").is_err());
        assert!(WifiCredentials::from_parts(b"ok", &[b'p'; 65]).is_err());
        assert!(WifiCredentials::from_parts(&[b'a'; 32], &[b'p'; 64]).is_ok());
    }
}
