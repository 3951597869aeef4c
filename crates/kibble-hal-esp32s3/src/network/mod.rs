//! Wi-Fi credentials and the fact API client.

pub mod http;

use heapless::String;
use kibble_core::settings::{MAX_PASSWORD_LEN, MAX_SSID_LEN, Settings};

/// Station credentials handed to the Wi-Fi supervisor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WifiCredentials {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_PASSWORD_LEN>,
}

impl WifiCredentials {
    /// Uses the stored credentials when an SSID is set, the build-time
    /// fallback otherwise.
    pub fn resolve(settings: &Settings, fallback_ssid: &str, fallback_password: &str) -> Self {
        let (ssid, password) = if settings.wifi_ssid.is_empty() {
            (fallback_ssid, fallback_password)
        } else {
            (settings.wifi_ssid.as_str(), settings.wifi_password.as_str())
        };

        let mut credentials = Self::default();
        for ch in ssid.chars() {
            if credentials.ssid.push(ch).is_err() {
                break;
            }
        }
        for ch in password.chars() {
            if credentials.password.push(ch).is_err() {
                break;
            }
        }
        credentials
    }

    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}
