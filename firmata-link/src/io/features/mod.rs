//! The public operations of [`FirmataClient`](crate::io::FirmataClient), one module per family.
//!
//! Modules handling inbound device messages (I2C, sonar, DHT, vendor) also hold their frame
//! handler, registered by [`DispatchTable::default`](crate::io::DispatchTable).

pub mod dht;
pub mod i2c;
pub mod keep_alive;
pub mod pins;
pub mod queries;
pub mod servo;
pub mod sonar;
pub mod stepper;
pub mod tone;
pub mod vendor;
