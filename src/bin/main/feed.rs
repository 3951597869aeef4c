use core::fmt::Debug;

use embassy_net::Stack;
use embassy_time::{Delay, Timer};
use esp_hal::{rng::Rng, time::Instant};
use kibble_core::{
    connectivity::Connectivity,
    facts::{API_RETRY_DELAY_MS, CycleStep, FactCycle, FactList},
    input::{InputProvider, Key, poll_key_lossy},
    menu::{MENU_POLL_MS, MenuDisplay, SettingsMenu, run_session},
    render::DisplayContext,
    scroll::{ScrollOutcome, scroll_fact},
    settings::{ChangeSet, Settings},
    time::{Clock, has_elapsed},
};
use kibble_hal_esp32s3::{
    network::{
        WifiCredentials,
        http::{FactRequest, TlsReference, fetch_facts},
    },
    platform::i2c::Peripherals,
};
use log::info;
use smart_leds::{RGB8, SmartLedsWrite};

use super::{store::SettingsBackend, wifi::CREDENTIALS};

/// How long "WiFi" stays up before the badge admits it is offline.
const WIFI_CONNECT_TIMEOUT_MS: u32 = 100_000;
const OFFLINE_NOTICE_MS: u32 = 2_000;
const NETWORK_WAIT_POLL_MS: u32 = 250;

/// Milliseconds since boot on the wrapping core clock.
pub(super) struct BootClock {
    start: Instant,
}

impl BootClock {
    pub(super) fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for BootClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Build-time fallbacks for anything the stored settings leave empty.
#[derive(Clone, Copy, Debug)]
pub(super) struct FeedConfig {
    pub(super) api_base_url: &'static str,
    pub(super) wifi_ssid: &'static str,
    pub(super) wifi_password: &'static str,
    pub(super) api_key: &'static str,
}

impl FeedConfig {
    pub(super) fn credentials(&self, settings: &Settings) -> WifiCredentials {
        WifiCredentials::resolve(settings, self.wifi_ssid, self.wifi_password)
    }
}

/// Everything the display loop owns: matrix, keyboard, OLED, settings and
/// the fact list. `keyboard` is `None` when no CardKB answered at boot.
pub(super) struct FactFeed<'a, S, I, M> {
    pub(super) matrix: DisplayContext<S>,
    pub(super) keyboard: I,
    pub(super) oled: M,
    pub(super) peripherals: Peripherals,
    pub(super) store: SettingsBackend,
    pub(super) settings: Settings,
    pub(super) config: FeedConfig,
    pub(super) clock: BootClock,
    pub(super) rng: Rng,
    pub(super) stack: Stack<'a>,
    pub(super) tls: TlsReference<'a>,
    pub(super) connectivity: &'static Connectivity,
    pub(super) facts: &'a mut FactList,
    pub(super) cycle: FactCycle,
    pub(super) response: &'a mut [u8],
}

impl<S, I, M> FactFeed<'_, S, I, M>
where
    S: SmartLedsWrite<Color = RGB8>,
    S::Error: Debug,
    I: InputProvider,
    I::Error: Debug,
    M: MenuDisplay,
    M::Error: Debug,
{
    pub(super) async fn run(mut self) -> ! {
        self.matrix.clear();

        loop {
            let now_ms = self.clock.now_ms();
            let step = self
                .cycle
                .next(self.facts.len(), now_ms, || self.rng.random());

            match step {
                CycleStep::Refresh => {
                    self.wait_for_network().await;
                    let fetched = self.refresh().await;
                    self.cycle.refreshed(self.clock.now_ms(), fetched);

                    if !fetched && self.facts.is_empty() {
                        self.show_status("NoAPI");
                        if let Some(changes) = self.idle(API_RETRY_DELAY_MS).await {
                            self.apply_changes(changes);
                        }
                    }
                }
                CycleStep::Show(index) => {
                    if !self.online() {
                        self.show_status("WiFi?");
                        if let Some(changes) = self.idle(OFFLINE_NOTICE_MS).await {
                            self.apply_changes(changes);
                            continue;
                        }
                        self.wait_for_network().await;
                    }

                    let Some(fact) = self.facts.get(index) else {
                        continue;
                    };
                    // Without the OLED the keyboard can only skip facts, and
                    // only with ESC.
                    let menu_available = self.peripherals.menu_available();
                    let outcome = scroll_fact(
                        &mut self.matrix,
                        &mut self.keyboard,
                        &mut Delay,
                        fact.as_str(),
                        |key| menu_available || key == Key::Escape,
                    )
                    .await;
                    if let ScrollOutcome::Interrupted(key) = outcome {
                        info!("scroll: interrupted by {:?}", key);
                        self.matrix.clear();
                        if let Some(changes) = self.open_menu().await {
                            self.apply_changes(changes);
                        }
                    }
                }
            }
        }
    }

    fn online(&self) -> bool {
        self.connectivity.is_online()
    }

    fn show_status(&mut self, message: &str) {
        let color = self.matrix.render_settings().color;
        self.matrix.show_status(message, color);
    }

    /// Waits `ms` while watching the keyboard. A key opens the menu and
    /// ends the wait; the menu's changes are returned.
    async fn idle(&mut self, ms: u32) -> Option<ChangeSet> {
        let started = self.clock.now_ms();
        while !has_elapsed(self.clock.now_ms(), started, ms) {
            if self.peripherals.menu_available() && poll_key_lossy(&mut self.keyboard).is_some()
            {
                return self.open_menu().await;
            }
            Timer::after_millis(MENU_POLL_MS as u64).await;
        }
        None
    }

    async fn wait_for_network(&mut self) {
        let mut started = self.clock.now_ms();
        let mut shown: Option<&'static str> = None;

        while !self.online() {
            let gave_up = !self.config.credentials(&self.settings).is_configured()
                || has_elapsed(self.clock.now_ms(), started, WIFI_CONNECT_TIMEOUT_MS);
            let status = if gave_up { "NoWiFi" } else { "WiFi" };
            if shown != Some(status) {
                self.show_status(status);
                shown = Some(status);
            }

            if let Some(changes) = self.idle(NETWORK_WAIT_POLL_MS).await {
                self.apply_changes(changes);
                if changes.requires_reconnect() {
                    started = self.clock.now_ms();
                }
                shown = None;
            }
        }
    }

    async fn refresh(&mut self) -> bool {
        self.show_status("Load");

        let api_key = if self.settings.api_key.is_empty() {
            self.config.api_key
        } else {
            self.settings.api_key.as_str()
        };
        let request = FactRequest {
            base_url: self.config.api_base_url,
            source: self.settings.api_source,
            api_key,
        };

        match fetch_facts(self.stack, self.tls, &request, self.response).await {
            Ok(facts) => {
                info!(
                    "facts: fetched {} from {}",
                    facts.len(),
                    self.settings.api_source.path()
                );
                *self.facts = facts;
                true
            }
            Err(err) => {
                info!("facts: fetch failed: {:?}", err);
                false
            }
        }
    }

    /// Runs the settings menu when both the keyboard and the OLED are
    /// present.
    async fn open_menu(&mut self) -> Option<ChangeSet> {
        if !self.peripherals.menu_available() {
            return None;
        }

        info!("menu: opened");
        let mut menu = SettingsMenu::new(self.settings.clone(), self.clock.now_ms());
        let exit = run_session(
            &mut menu,
            &mut self.keyboard,
            &mut self.oled,
            &self.clock,
            &mut Delay,
            &mut self.store,
        )
        .await;
        info!(
            "menu: closed ({:?}) display={} wifi={} source={}",
            exit.reason, exit.changes.display, exit.changes.wifi, exit.changes.source
        );
        self.settings = menu.into_settings();
        Some(exit.changes)
    }

    /// Pushes new settings to the matrix, the Wi-Fi supervisor and the
    /// fact cycle.
    fn apply_changes(&mut self, changes: ChangeSet) {
        if changes.display {
            self.matrix.apply_settings(&self.settings);
        }
        if changes.requires_reconnect() {
            // Any refetch below has to wait for the new association.
            self.connectivity.mark_disconnected();
            CREDENTIALS.signal(self.config.credentials(&self.settings));
        }
        if changes.requires_refetch() {
            self.cycle.request_refresh();
        }
    }
}
