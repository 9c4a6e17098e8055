//! The Firmata client: transports, inbound frame decoding and the board operations.
//!
//! A [`FirmataClient`] owns a transport ([`Serial`], [`TcpTransport`] or any [`IoTransport`]),
//! a receiver thread moving its bytes to a queue, and a reporter thread assembling them into
//! frames dispatched through a [`DispatchTable`] to handlers updating the shared [`IoData`].

mod assembler;
mod client;
pub mod constants;
mod data;
mod dispatch;
pub mod encoding;
mod features;
pub mod handlers;
mod options;
mod queue;
mod receiver;
mod replies;
mod reporter;
mod transports;

pub use assembler::{AssemblerState, Frame, FrameAssembler, Step};
pub use client::FirmataClient;
pub use data::*;
pub use dispatch::{DispatchEntry, DispatchTable, FrameHandler};
pub use features::{dht::dht_data, i2c::i2c_reply, sonar::sonar_data, vendor::vendor_message};
pub use options::{Options, TransportOptions, UnknownCommandPolicy};
pub use reporter::Reporter;
pub use transports::discovery;
pub use transports::serial::Serial;
pub use transports::tcp::TcpTransport;
pub use transports::IoTransport;
