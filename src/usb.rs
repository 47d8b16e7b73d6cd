use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use motor_speed_pid::drivers::telemetry::MAX_LINE_LEN;

bind_interrupts!(struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type UsbSerial<'a> = CdcAcmClass<'a, UsbDriver>;

/// CDC-ACM packet size; one telemetry line always fits.
pub const MAX_PACKET_SIZE: u16 = MAX_LINE_LEN as u16;

static EP_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// Build the USB serial port used for telemetry. Call once.
pub fn init(
    usb_periph: peripherals::USB_OTG_FS,
    dp: peripherals::PA12,
    dm: peripherals::PA11,
) -> (UsbDevice<'static, UsbDriver>, UsbSerial<'static>) {
    let mut usb_config = usb_otg::Config::default();
    usb_config.vbus_detection = false;
    let driver = Driver::new_fs(
        usb_periph,
        Irqs,
        dp,
        dm,
        EP_OUT_BUFFER.init([0; 256]),
        usb_config,
    );

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("motor-speed-pid");
    config.product = Some("DC motor speed controller");
    config.serial_number = Some("00000001");
    config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        &mut [], // no MS OS descriptors
        CONTROL_BUF.init([0; 64]),
    );

    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), MAX_PACKET_SIZE);
    let usb = builder.build();

    (usb, class)
}
