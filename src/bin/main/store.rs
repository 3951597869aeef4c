use kibble_core::settings::{Settings, SettingsStore};
use kibble_hal_esp32s3::storage::flash_settings::{FlashSettingsError, FlashSettingsStore};
use log::info;

/// Flash-backed settings, or a volatile stand-in when the settings
/// partition cannot be used. Volatile saves succeed so the menu still
/// applies changes for the current session.
pub(super) enum SettingsBackend {
    Flash(FlashSettingsStore),
    Volatile,
}

impl SettingsBackend {
    pub(super) fn open() -> Self {
        match FlashSettingsStore::new() {
            Ok(store) => Self::Flash(store),
            Err(err) => {
                info!(
                    "settings storage unavailable ({:?}); changes will be volatile",
                    err
                );
                Self::Volatile
            }
        }
    }
}

impl SettingsStore for SettingsBackend {
    type Error = FlashSettingsError;

    fn load(&mut self) -> Result<Option<Settings>, Self::Error> {
        match self {
            Self::Flash(store) => store.load(),
            Self::Volatile => Ok(None),
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<(), Self::Error> {
        match self {
            Self::Flash(store) => {
                store.save(settings)?;
                info!("settings: saved to flash");
                Ok(())
            }
            Self::Volatile => Ok(()),
        }
    }
}
