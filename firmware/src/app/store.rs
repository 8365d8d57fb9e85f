use embedded_storage::ReadStorage;
use esp_scope::credentials::FlashCredentialStore;
use esp_storage::FlashStorage;

use super::types::CredentialStore;

/// Credential record in the last flash sector.
pub(crate) fn credential_store(flash_peripheral: esp_hal::peripherals::FLASH<'static>) -> CredentialStore {
    let flash = FlashStorage::new(flash_peripheral);
    #[cfg(feature = "esp32")]
    let flash = flash.multicore_auto_park();
    let capacity = flash.capacity() as u32;
    let offset = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);
    FlashCredentialStore::new(flash, offset)
}
