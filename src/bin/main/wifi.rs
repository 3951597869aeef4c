use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration as EmbassyDuration, Timer, WithTimeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use kibble_core::connectivity::Connectivity;
use kibble_hal_esp32s3::network::WifiCredentials;
use log::info;

use super::{
    DHCP_TIMEOUT_SECS, NETWORK_POLL_INTERVAL_MS, WIFI_RETRY_BACKOFF_MAX_SECS,
    WIFI_RETRY_BACKOFF_MIN_SECS,
};

/// Latest credentials for the supervisor. Signalling again replaces the
/// active connection.
pub(super) static CREDENTIALS: Signal<CriticalSectionRawMutex, WifiCredentials> = Signal::new();

fn wifi_retry_backoff_secs(consecutive_failures: u32) -> u64 {
    // 2, 4, 8, 16, 32, 64, 120, 120, ...
    let shift = consecutive_failures.min(6);
    WIFI_RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(WIFI_RETRY_BACKOFF_MAX_SECS)
}

/// Sleeps for the backoff delay. New credentials cut the wait short and
/// are returned.
async fn wait_before_wifi_retry(consecutive_failures: &mut u32) -> Option<WifiCredentials> {
    let delay_secs = wifi_retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "wifi retrying in {}s (consecutive_failures={})",
        delay_secs, *consecutive_failures
    );

    match select(Timer::after_secs(delay_secs), CREDENTIALS.wait()).await {
        Either::First(()) => None,
        Either::Second(credentials) => Some(credentials),
    }
}

fn apply_credentials(
    wifi_controller: &mut WifiController<'_>,
    credentials: &WifiCredentials,
) -> bool {
    let client_config = ClientConfig::default()
        .with_ssid(credentials.ssid.as_str().into())
        .with_password(credentials.password.as_str().into());
    match wifi_controller.set_config(&ModeConfig::Client(client_config)) {
        Ok(()) => {
            info!("wifi configured for ssid={}", credentials.ssid.as_str());
            true
        }
        Err(err) => {
            info!("wifi mode config failed: {:?}", err);
            false
        }
    }
}

pub(super) async fn wifi_supervisor(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    connectivity: &'static Connectivity,
) -> ! {
    let mut credentials = CREDENTIALS.wait().await;
    let mut consecutive_failures = 0u32;
    let mut configured = false;

    loop {
        if let Some(next) = CREDENTIALS.try_take() {
            credentials = next;
            configured = false;
            consecutive_failures = 0;
        }

        if !credentials.is_configured() {
            info!("wifi: no ssid configured; waiting for settings");
            connectivity.mark_disconnected();
            credentials = CREDENTIALS.wait().await;
            configured = false;
            continue;
        }

        if !configured {
            let _ = wifi_controller.disconnect_async().await;
            configured = apply_credentials(wifi_controller, &credentials);
            if !configured {
                credentials = CREDENTIALS.wait().await;
                continue;
            }
        }

        if !wifi_controller.is_started().unwrap_or(false) {
            if let Err(err) = wifi_controller.start_async().await {
                info!("wifi start failed: {:?}", err);
                connectivity.mark_disconnected();
                if let Some(next) = wait_before_wifi_retry(&mut consecutive_failures).await {
                    CREDENTIALS.signal(next);
                }
                continue;
            }
        }

        if let Err(err) = wifi_controller.connect_async().await {
            info!("wifi connect failed: {:?}", err);
            connectivity.mark_disconnected();
            let _ = wifi_controller.disconnect_async().await;
            if let Some(next) = wait_before_wifi_retry(&mut consecutive_failures).await {
                CREDENTIALS.signal(next);
            }
            continue;
        }

        match stack
            .wait_config_up()
            .with_timeout(EmbassyDuration::from_secs(DHCP_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                connectivity.update_link_ip(stack.is_link_up(), stack.config_v4().is_some());
                info!("wifi connected and dhcp ready");
            }
            Err(_) => {
                info!("dhcp timeout; forcing reconnect");
                connectivity.update_link_ip(stack.is_link_up(), false);
                let _ = wifi_controller.disconnect_async().await;
                if let Some(next) = wait_before_wifi_retry(&mut consecutive_failures).await {
                    CREDENTIALS.signal(next);
                }
                continue;
            }
        }

        consecutive_failures = 0;

        loop {
            // Checked first: the display loop already took the badge offline
            // and must not see the old link reported again.
            if CREDENTIALS.signaled() {
                info!("wifi credentials changed; reconnecting");
                break;
            }

            let link_up = stack.is_link_up();
            let has_ipv4 = stack.config_v4().is_some();
            let is_connected = matches!(wifi_controller.is_connected(), Ok(true));

            connectivity.update_link_ip(link_up, has_ipv4);

            if !(link_up && has_ipv4 && is_connected) {
                info!(
                    "wifi state lost (link_up={} has_ipv4={} connected={}); reconnecting",
                    link_up, has_ipv4, is_connected
                );
                break;
            }

            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
        }

        connectivity.mark_disconnected();
        let _ = wifi_controller.disconnect_async().await;
        if CREDENTIALS.signaled() {
            continue;
        }
        if let Some(next) = wait_before_wifi_retry(&mut consecutive_failures).await {
            CREDENTIALS.signal(next);
        }
    }
}
