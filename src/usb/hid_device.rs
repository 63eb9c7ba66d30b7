//! USB HID keyboard device.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral, exposes one HID keyboard endpoint and adapts it to the
//! engine's [`HidTransport`] contract.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use heapless::Vec;
use static_cell::StaticCell;
use usb_keydemo::config;
use usb_keydemo::error::{Error, Result};
use usb_keydemo::hid::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
use usb_keydemo::{ControlRequest, HidTransport, HostLink};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// One serialized keyboard report.
type Packet = Vec<u8, KEYBOARD_REPORT_SIZE>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_POWER_HANDLER: StaticCell<UsbPowerHandler> = StaticCell::new();
static KB_REQUEST_HANDLER: StaticCell<KeyboardRequestHandler> = StaticCell::new();
static USB_SUSPEND_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Released once the device may pull up D+ and appear on the bus.
static USB_ATTACH: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Reports queued by the polling loop for the writer task.
static REPORTS: Channel<CriticalSectionRawMutex, Packet, 1> = Channel::new();

/// Set while a report is queued or being written to the endpoint.
static IN_FLIGHT: AtomicBool = AtomicBool::new(false);

struct UsbPowerHandler;

impl embassy_usb::Handler for UsbPowerHandler {
    fn suspended(&mut self, suspended: bool) {
        USB_SUSPEND_SIGNAL.signal(suspended);
    }
}

/// Forwards HID class requests to the shared [`HostLink`].
struct KeyboardRequestHandler {
    host: &'static HostLink,
}

impl RequestHandler for KeyboardRequestHandler {
    fn get_report(&mut self, _id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let len = self.host.control(ControlRequest::GetReport, buf);
        (len > 0).then_some(len)
    }

    fn set_report(&mut self, _id: ReportId, data: &[u8]) -> OutResponse {
        self.host.control(ControlRequest::SetReport(data), &mut []);
        OutResponse::Accepted
    }

    // embassy-usb speaks milliseconds; HID idle rates are in 4 ms units.
    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        let mut rate = [0u8; 1];
        self.host.control(ControlRequest::GetIdle, &mut rate);
        Some(u32::from(rate[0]) * 4)
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, duration_ms: u32) {
        let rate = (duration_ms / 4).min(u32::from(u8::MAX)) as u8;
        self.host.control(ControlRequest::SetIdle(rate), &mut []);
    }
}

/// Build result containing the USB device runner and the keyboard writer.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard_writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
}

/// Initialise the USB stack and create the keyboard HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, host: &'static HostLink) -> UsbHidDevice {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    // USB device-level configuration.
    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    // Allocate static descriptor buffers.
    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let usb_handler = USB_POWER_HANDLER.init(UsbPowerHandler);
    builder.handler(usb_handler);

    let request_handler = KB_REQUEST_HANDLER.init(KeyboardRequestHandler { host });
    let kb_state = KB_STATE.init(State::new());
    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: Some(request_handler),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: KEYBOARD_REPORT_SIZE as u16,
    };
    let keyboard_writer = HidWriter::new(&mut builder, kb_state, kb_config);

    let device = builder.build();

    info!("USB HID keyboard initialised");

    UsbHidDevice {
        device,
        keyboard_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
///
/// Stays off the bus until [`EmbassyTransport::connect`] releases it, then
/// handles enumeration, suspend/resume, and endpoint servicing forever.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    USB_ATTACH.wait().await;
    info!("USB device task started");
    device.run().await
}

/// HID report forwarding task - writes queued reports to the interrupt
/// endpoint and frees the transport once each one is out.
pub async fn hid_writer_task(
    mut keyboard: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
) -> ! {
    info!("HID writer task started - waiting for reports");

    loop {
        let packet = REPORTS.receive().await;
        if let Err(_e) = keyboard.write(&packet).await {
            warn!("USB keyboard write failed");
        }
        IN_FLIGHT.store(false, Ordering::Release);
    }
}

/// [`HidTransport`] over the embassy-usb keyboard endpoint.
pub struct EmbassyTransport {
    suspended: bool,
}

impl EmbassyTransport {
    pub const fn new() -> Self {
        Self { suspended: false }
    }
}

impl HidTransport for EmbassyTransport {
    fn poll(&mut self) {
        if let Some(suspended) = USB_SUSPEND_SIGNAL.try_take() {
            info!("USB suspended={}", suspended);
            self.suspended = suspended;
        }
    }

    fn interrupt_endpoint_ready(&self) -> bool {
        !self.suspended && !IN_FLIGHT.load(Ordering::Acquire)
    }

    fn send_report(&mut self, report: &[u8]) -> Result<()> {
        let packet = Packet::from_slice(report).map_err(|_| Error::BufferOverflow)?;
        IN_FLIGHT.store(true, Ordering::Release);
        REPORTS.try_send(packet).map_err(|_| {
            IN_FLIGHT.store(false, Ordering::Release);
            Error::EndpointBusy
        })
    }

    fn disconnect(&mut self) {
        USB_ATTACH.reset();
    }

    fn connect(&mut self) {
        USB_ATTACH.signal(());
    }
}
