#![doc(html_root_url = "https://docs.rs/firmata-link/0.1.0")]

//! <h1 align="center">FIRMATA-LINK</h1>
//! <div style="text-align:center;font-style:italic;">A threaded Firmata client for serial and network attached boards - written in Rust.</div>
//!
//! # Features
//!
//! **Firmata-Link** talks the [Firmata protocol](https://github.com/firmata/protocol) to a
//! microcontroller running [StandardFirmata](https://github.com/firmata/arduino) or
//! [FirmataExpress](https://github.com/MrYsLab/FirmataExpress), over a serial port or a TCP
//! bridge.
//!
//! - Connect to a board through a [`Serial`](io::Serial) port (given or auto-discovered) or a
//!   [`TcpTransport`](io::TcpTransport)
//! - Drive digital, PWM and servo outputs; read digital and analog inputs, with change callbacks
//!   gated by a differential
//! - Query the firmware, protocol version, capabilities, analog mapping and pin states
//! - Use I2C devices, HC-SR04 sonars, DHT sensors, steppers and tones (FirmataExpress)
//! - Drive neopixel strips, infrared and DS18B20 sensors through the vendor extension frames
//! - Register custom frame handlers in the per-client [`DispatchTable`](io::DispatchTable)
//!
//! The client runs two threads: a receiver reading the transport and a reporter decoding the
//! frames and invoking the callbacks. Every operation takes `&self`, so a client can be shared
//! between threads.
//!
//! # Getting Started
//!
//! - Upload [FirmataExpress](https://github.com/MrYsLab/FirmataExpress) (or StandardFirmata for
//!   the standard features only) to the board.
//!
//! - Add the following to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! firmata-link = "0.1.0"
//! ```
//!
//! The following code blinks the Arduino embedded led on pin 13.
//! ```no_run
//! use std::time::Duration;
//! use firmata_link::io::{FirmataClient, Options};
//!
//! fn main() -> Result<(), firmata_link::errors::Error> {
//!     let client = FirmataClient::open(Options::auto())?;
//!     client.set_pin_mode_digital_output(13)?;
//!     for _ in 0..10 {
//!         client.digital_write(13, true)?;
//!         std::thread::sleep(Duration::from_millis(500));
//!         client.digital_write(13, false)?;
//!         std::thread::sleep(Duration::from_millis(500));
//!     }
//!     client.shutdown()
//! }
//! ```
//!
//! # Feature flags
//!
//! - **libudev** -- (enabled by default) Activates `serialport` crate _libudev_ feature under-the-hood (required on Linux only for port listing).
//! - **serde** -- Enables serialize/deserialize capabilities for the options and most entities.
//! - **mocks** -- Provides an in-memory transport emulating a board (useful for tests mostly).

#[cfg(test)]
extern crate self as firmata_link;

pub mod errors;
pub mod io;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod utils;
