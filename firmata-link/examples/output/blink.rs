//! Blinks the embedded led (pin 13) and fades a led on PWM pin 9.
//! https://docs.arduino.cc/built-in-examples/basics/Blink/

use std::time::Duration;

use firmata_link::errors::Error;
use firmata_link::io::{FirmataClient, Options};

fn main() -> Result<(), Error> {
    env_logger::init();

    let client = FirmataClient::open(Options::serial("/dev/ttyACM0").instance_id(None))?;
    client.set_pin_mode_digital_output(13)?;
    client.set_pin_mode_pwm_output(9)?;

    for i in 0..10u16 {
        client.digital_write(13, i % 2 == 0)?;
        client.analog_write(9, i * 25)?;
        std::thread::sleep(Duration::from_millis(500));
    }

    client.shutdown()
}
