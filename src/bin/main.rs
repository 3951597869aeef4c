#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_time::Timer;
use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::{
    clock::CpuClock,
    i2c::master::I2c,
    rng::Rng,
    spi::master::Spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use kibble_core::{
    connectivity::Connectivity,
    facts::{FactCycle, FactList},
    render::{DisplayContext, NUM_LEDS, RenderSettings},
    settings::load_or_default,
};
use kibble_hal_esp32s3::{
    input::cardkb::CardKb,
    network::http::Tls,
    platform::{i2c::Peripherals, oled::OledDisplay},
};
use log::{LevelFilter, info};
use static_cell::{ConstStaticCell, StaticCell};
use ws2812_spi_strip::{
    Ws2812,
    protocol::{self, buffer_len},
};

use feed::{BootClock, FactFeed, FeedConfig};
use store::SettingsBackend;
use wifi::CREDENTIALS;

#[path = "main/feed.rs"]
mod feed;
#[path = "main/store.rs"]
mod store;
#[path = "main/wifi.rs"]
mod wifi;

const I2C_HZ: u32 = 100_000;
const RESPONSE_BYTES: usize = 32 * 1024;
const LED_BUFFER_BYTES: usize = buffer_len(NUM_LEDS);
const WIFI_RETRY_BACKOFF_MIN_SECS: u64 = 2;
const WIFI_RETRY_BACKOFF_MAX_SECS: u64 = 120;
const NETWORK_POLL_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;

const API_BASE_URL: &str = env!(
    "KIBBLE_API_BASE_URL",
    "Set KIBBLE_API_BASE_URL (e.g. https://kibble.example.com) before building/flashing."
);
const FEED_CONFIG: FeedConfig = FeedConfig {
    api_base_url: API_BASE_URL,
    wifi_ssid: match option_env!("KIBBLE_WIFI_SSID") {
        Some(ssid) => ssid,
        None => "",
    },
    wifi_password: match option_env!("KIBBLE_WIFI_PASSWORD") {
        Some(password) => password,
        None => "",
    },
    api_key: match option_env!("KIBBLE_API_KEY") {
        Some(key) => key,
        None => "",
    },
};

static CONNECTIVITY: Connectivity = Connectivity::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static LED_BUFFER: ConstStaticCell<[u8; LED_BUFFER_BYTES]> =
    ConstStaticCell::new([0; LED_BUFFER_BYTES]);
static RESPONSE_BUFFER: ConstStaticCell<[u8; RESPONSE_BYTES]> =
    ConstStaticCell::new([0; RESPONSE_BYTES]);
static FACTS: ConstStaticCell<FactList> = ConstStaticCell::new(FactList::new());

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    esp_println::println!("panic: {}", info);
    esp_hal::system::software_reset()
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: kibble starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // LED matrix data line on GPIO16, driven as SPI MOSI.
    let led_spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(protocol::SPI_HZ))
        .with_mode(esp_hal::spi::Mode::_0);
    let led_spi = Spi::new(peripherals.SPI2, led_spi_config)
        .unwrap()
        .with_mosi(peripherals.GPIO16);
    let strip = Ws2812::new(led_spi, LED_BUFFER.take());

    // CardKB and SSD1306 share I2C0: SDA=GPIO8, SCL=GPIO9.
    let i2c_config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_hz(I2C_HZ));
    let i2c = I2c::new(peripherals.I2C0, i2c_config)
        .unwrap()
        .with_sda(peripherals.GPIO8)
        .with_scl(peripherals.GPIO9);
    let i2c_bus = RefCell::new(i2c);

    let detected = Peripherals::detect(&mut RefCellDevice::new(&i2c_bus));
    let keyboard = detected.keyboard.then(|| {
        let mut keyboard = CardKb::new(RefCellDevice::new(&i2c_bus));
        keyboard.drain();
        keyboard
    });
    let mut oled = OledDisplay::new(RefCellDevice::new(&i2c_bus));
    if detected.oled
        && let Err(err) = oled.initialize()
    {
        info!("oled initialize failed: {:?}", err);
    }
    if !detected.menu_available() {
        info!(
            "settings menu unavailable (keyboard={} oled={})",
            detected.keyboard, detected.oled
        );
    }

    let mut store = SettingsBackend::open();
    let settings = load_or_default(&mut store);
    let matrix = DisplayContext::new(strip, RenderSettings::from_settings(&settings));
    info!(
        "settings: source={} color={} brightness={} font={:?} delay_ms={}",
        settings.api_source.label(),
        settings.text_color.label(),
        settings.brightness,
        settings.font_size,
        settings.scroll_delay_ms
    );

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    let tls = match Tls::new(peripherals.SHA) {
        Ok(tls) => tls,
        Err(err) => {
            info!("tls init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let mut rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        seed,
    );

    CREDENTIALS.signal(FEED_CONFIG.credentials(&settings));
    info!("api base url: {}", API_BASE_URL);
    info!("Matrix pins: DIN=GPIO16 (SPI2 MOSI)");
    info!("I2C pins: SDA=GPIO8 SCL=GPIO9");

    let clock = BootClock::new();
    let feed = FactFeed {
        matrix,
        keyboard,
        oled,
        peripherals: detected,
        store,
        settings,
        config: FEED_CONFIG,
        cycle: FactCycle::new(0),
        clock,
        rng,
        stack,
        tls: tls.reference(),
        connectivity: &CONNECTIVITY,
        facts: FACTS.take(),
        response: RESPONSE_BUFFER.take(),
    };

    let net_future = net_runner.run();
    let wifi_future = wifi::wifi_supervisor(&mut wifi_controller, stack, &CONNECTIVITY);
    let ui_future = feed.run();

    let _ = embassy_futures::join::join3(net_future, wifi_future, ui_future).await;
    unreachable!()
}
