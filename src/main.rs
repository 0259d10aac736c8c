//! MeshNode firmware entry point.
//!
//! Hexagonal architecture with a single-threaded event dispatcher.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MeshAdapter    GenericModels   NvsAdapter    RowDisplay       │
//! │  (MeshStack)    (Model)         (Storage+Cfg) (Display)        │
//! │  AlertLeds  ButtonDriver  MotionSensor  I2cBus                 │
//! │  (Indicator)  (Input)       (Input)       (Bus)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Dispatcher (pure logic)                   │    │
//! │  │  Session · Acquisition FSM                             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EVENTS (stack task, timers) · SIGNALS (ISRs, I²C callback)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use log::{error, info, warn};

use meshnode::adapters::display::RowDisplay;
use meshnode::adapters::mesh::MeshAdapter;
use meshnode::adapters::models::GenericModels;
use meshnode::adapters::node::NodeAdapter;
use meshnode::adapters::nvs::NvsAdapter;
use meshnode::app::ports::ConfigPort;
use meshnode::app::service::Dispatcher;
use meshnode::config::NodeConfig;
use meshnode::drivers::button::ButtonDriver;
use meshnode::drivers::hw_init::{self, GpioOut};
use meshnode::drivers::i2c::{self, I2cBus, TRANSFER};
use meshnode::drivers::indicators::AlertLeds;
use meshnode::drivers::motion::MotionSensor;
use meshnode::events::{StackEvent, EVENTS};
use meshnode::pins;
use meshnode::signals::SIGNALS;

/// Sleep when both queues are empty.
const IDLE_SLEEP_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  MeshNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware peripherals ───────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("GPIO init failed: {e}, halting");
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service() {
        error!("ISR service init failed: {e}, continuing without inputs");
    }

    // ── 3. Storage and configuration ──────────────────────────
    let mut storage = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init: {e}"))?;
    let config = match storage.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            let cfg = NodeConfig::default();
            if let Err(e) = storage.save_config(&cfg) {
                warn!("config rewrite failed: {e}");
            }
            cfg
        }
    };

    // ── 4. Sensor power and bus ───────────────────────────────
    let mut rail = GpioOut(pins::SENSOR_ENABLE_GPIO);
    i2c::power_on_sensor(&mut rail, &mut FreeRtos, config.sensor_settle_ms)?;
    let bus = I2cBus::new(&TRANSFER, &SIGNALS, config.sensor_address)
        .map_err(|e| anyhow::anyhow!("I2C init: {e}"))?;

    // ── 5. Adapters and dispatcher ────────────────────────────
    let mut node = NodeAdapter::new(
        MeshAdapter::new(&EVENTS),
        GenericModels::new(&EVENTS),
        storage,
        RowDisplay::new(),
        AlertLeds::new(GpioOut(pins::LED0_GPIO), GpioOut(pins::LED1_GPIO)),
        ButtonDriver::new(),
        MotionSensor::new(),
        bus,
    );
    let mut dispatcher = Dispatcher::new(config);

    EVENTS.post(StackEvent::Boot);
    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let idle = EVENTS.is_empty() && SIGNALS.is_empty();

        EVENTS.drain(|event| dispatcher.on_event(event, &mut node));
        dispatcher.drain_signals(&SIGNALS, &mut node);

        if idle {
            FreeRtos::delay_ms(IDLE_SLEEP_MS);
        }
    }
}
