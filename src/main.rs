//! usb-keydemo firmware for the nRF52840.
//!
//! Six buttons to ground, each typing one letter. The main task runs the
//! polling loop from `usb_keydemo::controller`; the USB device and the
//! HID writer run as their own tasks.

#![no_std]
#![no_main]

mod usb;

use defmt::{debug, info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::config::{Config as NrfConfig, HfclkSource};
use embassy_nrf::gpio::{Input, Pull};
use embassy_nrf::wdt::{self, WatchdogHandle};
use embassy_time::{Delay, Duration, Ticker};
use embassy_usb::class::hid::HidWriter;
use panic_probe as _;
use usb::hid_device::{self, EmbassyTransport, UsbDriver};
use usb_keydemo::config::{self, NUM_CHANNELS};
use usb_keydemo::hid::KEYBOARD_REPORT_SIZE;
use usb_keydemo::{reenumerate, ActiveLow, Controller, Debouncer, Error, HostLink, Watchdog};

/// LED state and idle rate, shared with the USB control handler.
static HOST: HostLink = HostLink::new();

/// Watchdog ticks run from the 32.768 kHz low-frequency clock.
const WDT_TICKS_PER_SEC: u32 = 32_768;

struct HardwareWatchdog(WatchdogHandle);

impl Watchdog for HardwareWatchdog {
    fn feed(&mut self) {
        self.0.pet();
    }
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_writer_task(
    writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
) -> ! {
    hid_device::hid_writer_task(writer).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // USB needs the external crystal.
    let mut nrf_config = NrfConfig::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    info!("usb-keydemo starting");

    let mut wdt_config = wdt::Config::default();
    wdt_config.timeout_ticks = WDT_TICKS_PER_SEC * config::WATCHDOG_TIMEOUT_SECS;
    let (_wdt, [handle]) =
        unwrap!(wdt::Watchdog::try_new(p.WDT, wdt_config).map_err(|_| Error::Watchdog));
    let mut watchdog = HardwareWatchdog(handle);

    let lines: [ActiveLow<Input<'static>>; NUM_CHANNELS] = [
        ActiveLow(Input::new(p.P0_11, Pull::Up)),
        ActiveLow(Input::new(p.P0_12, Pull::Up)),
        ActiveLow(Input::new(p.P0_24, Pull::Up)),
        ActiveLow(Input::new(p.P0_25, Pull::Up)),
        ActiveLow(Input::new(p.P0_03, Pull::Up)),
        ActiveLow(Input::new(p.P0_04, Pull::Up)),
    ];

    let usb = hid_device::init(p.USBD, &HOST);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(hid_writer_task(usb.keyboard_writer)));

    let mut transport = EmbassyTransport::new();
    reenumerate(&mut transport, &mut watchdog, &mut Delay);

    let mut controller: Controller<'_, _, NUM_CHANNELS> =
        Controller::new(Debouncer::new(lines), &HOST);
    let mut ticker = Ticker::every(Duration::from_micros(config::SCAN_INTERVAL_US));

    info!("Entering polling loop");
    loop {
        if let Some(report) = controller.tick(&mut transport, &mut watchdog) {
            debug!("Sent report {}", report);
        }
        ticker.next().await;
    }
}
