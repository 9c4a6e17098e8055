//! Demonstrates an analog input: a potentiometer on pin A0, and a button on pin 2.
//! https://docs.arduino.cc/built-in-examples/analog/AnalogInput/

use std::sync::Arc;
use std::time::Duration;

use firmata_link::errors::Error;
use firmata_link::io::{FirmataClient, Options, PinReport};

fn main() -> Result<(), Error> {
    env_logger::init();

    let client = FirmataClient::open(Options::auto())?;

    // Only changes of 5 or more are reported.
    client.set_pin_mode_analog_input(
        0,
        5.0,
        Some(Arc::new(|report: PinReport| {
            println!("Potentiometer: {:?}", report.value)
        })),
    )?;
    client.set_pin_mode_digital_input_pullup(
        2,
        Some(Arc::new(|report: PinReport| {
            println!("Button: {:?}", report.value)
        })),
    )?;

    std::thread::sleep(Duration::from_secs(30));
    println!("Last value: {}", client.analog_read(0)?);
    client.shutdown()
}
