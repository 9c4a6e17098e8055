//! Probes every USB serial port and connects to the first board answering with instance id 1.
//! Prints what the board tells about itself.

use firmata_link::errors::Error;
use firmata_link::io::{FirmataClient, Options, Serial};

fn main() -> Result<(), Error> {
    env_logger::init();

    println!("Available ports: {:?}", Serial::usb_ports()?);
    let client = FirmataClient::open(Options::auto().instance_id(Some(1)))?;

    println!("Protocol: {:?}", client.get_protocol_version()?);
    println!("Firmware: {:?}", client.get_firmware_version()?);
    if let Some(capabilities) = client.get_capability_report()? {
        for (pin, modes) in capabilities.iter().enumerate() {
            println!("Pin {}: {:?}", pin, modes);
        }
    }
    println!("Pin 13 state: {:?}", client.get_pin_state(13)?);

    client.shutdown()
}
