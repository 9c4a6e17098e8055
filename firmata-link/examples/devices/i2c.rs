//! Reads the temperature of a TMP102 sensor (I2C address 0x48) once per second.

use std::time::Duration;

use firmata_link::errors::Error;
use firmata_link::io::{FirmataClient, Options};

const TMP102: u8 = 0x48;

fn main() -> Result<(), Error> {
    env_logger::init();

    let client = FirmataClient::open(Options::auto())?;
    client.set_pin_mode_i2c(0)?;

    for _ in 0..10 {
        // Blocking read: 2 bytes of the temperature register.
        match client.i2c_read(TMP102, 0x00, 2, None)? {
            Some(reply) if reply.data.len() == 2 => {
                let raw = ((reply.data[0] << 4) | (reply.data[1] >> 4)) as i16;
                println!("Temperature: {:.2}°C", raw as f32 * 0.0625);
            }
            other => println!("No temperature: {:?}", other),
        }
        std::thread::sleep(Duration::from_secs(1));
    }

    client.shutdown()
}
