//! Measures distances with an HC-SR04 (trigger pin 12, echo pin 11) and the temperature with a
//! DHT22 on pin 8. Requires FirmataExpress.

use std::sync::Arc;
use std::time::Duration;

use firmata_link::errors::Error;
use firmata_link::io::constants::DEFAULT_SONAR_TIMEOUT;
use firmata_link::io::{DhtSensor, FirmataClient, Options, SonarReading};

fn main() -> Result<(), Error> {
    env_logger::init();

    let client = FirmataClient::open(Options::auto())?;
    client.set_pin_mode_sonar(
        12,
        11,
        Some(Arc::new(|reading: SonarReading| {
            println!("Distance: {}cm", reading.distance)
        })),
        DEFAULT_SONAR_TIMEOUT,
    )?;
    client.set_pin_mode_dht(8, DhtSensor::DHT22, 0.5, None)?;

    for _ in 0..10 {
        std::thread::sleep(Duration::from_secs(2));
        println!("Sonar: {:?}", client.sonar_read(12)?);
        println!("DHT: {:?}", client.dht_read(8)?);
    }

    client.shutdown()
}
