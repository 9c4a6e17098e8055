//! Connects to a board behind a TCP bridge (ESP8266 running FirmataExpress over Wi-Fi, ser2net...)
//! and keeps it alive while blinking pin 2.

use std::time::Duration;

use firmata_link::errors::Error;
use firmata_link::io::{FirmataClient, Options};

fn main() -> Result<(), Error> {
    env_logger::init();

    let client = FirmataClient::open(Options::network("192.168.1.50", 3030))?;
    // The board resets if no keep-alive arrives within 2 seconds.
    client.keep_alive(2, 0.3)?;

    client.set_pin_mode_digital_output(2)?;
    for i in 0..20 {
        client.digital_write(2, i % 2 == 0)?;
        std::thread::sleep(Duration::from_millis(500));
    }

    println!("{:?}", client.stats());
    client.shutdown()
}
