use log::error;
use snafu::Snafu;

pub use crate::errors::Error::*;
use crate::errors::ConnectionError::IoException;
use crate::io::PinModeId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Connection error: {source}.
    ConnectionError { source: ConnectionError },
    /// Protocol error: {source}.
    ProtocolError { source: ProtocolError },
    /// Hardware error: {source}.
    HardwareError { source: HardwareError },
    /// Unknown error: {info}.
    Unknown { info: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        error!("std::io error {:?}", error);
        let info = match error.kind() {
            std::io::ErrorKind::NotFound => String::from("Board not found or already in use"),
            std::io::ErrorKind::PermissionDenied => String::from("Board connection lost"),
            std::io::ErrorKind::ConnectionRefused => String::from("Board refused the connection"),
            _ => error.to_string(),
        };
        Self::ConnectionError {
            source: IoException { info },
        }
    }
}

impl From<serialport::Error> for Error {
    fn from(value: serialport::Error) -> Self {
        std::io::Error::from(value).into()
    }
}

impl From<ConnectionError> for Error {
    fn from(value: ConnectionError) -> Self {
        Self::ConnectionError { source: value }
    }
}

impl From<ProtocolError> for Error {
    fn from(value: ProtocolError) -> Self {
        Self::ProtocolError { source: value }
    }
}

impl From<HardwareError> for Error {
    fn from(value: HardwareError) -> Self {
        Self::HardwareError { source: value }
    }
}

/// Failures to reach, identify or keep talking to the board.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConnectionError {
    /// {info}
    IoException { info: String },
    /// Connection has not been initialized
    NotInitialized,
    /// Connection to the board has been lost
    Disconnected,
    /// No board answered the identification request
    NoDeviceFound,
    /// No identification reply received on {port}
    NoReply { port: String },
    /// Invalid identification reply on {port}: {received:02X?}
    InvalidReply { port: String, received: Vec<u8> },
    /// Board on {port} has instance id {received}, expected {expected}
    WrongInstanceId {
        port: String,
        expected: u8,
        received: u8,
    },
    /// Firmware version could not be retrieved
    FirmwareNotFound,
    /// Analog mapping could not be retrieved
    AnalogMapNotFound,
}

/// Malformed or unexpected frames.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProtocolError {
    /// Not enough bytes received - '{operation}' expected {expected} bytes, {received} received
    MessageTooShort {
        operation: &'static str,
        expected: usize,
        received: usize,
    },
    /// Unexpected data received - '{operation}': {info}
    UnexpectedData {
        operation: &'static str,
        info: String,
    },
    /// Unknown command 0x{command:02X}
    UnknownCommand { command: u8 },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HardwareError {
    /// Pin ({pin}) not compatible with mode ({mode}) - {context}
    IncompatibleMode {
        pin: u8,
        mode: PinModeId,
        context: &'static str,
    },
    /// Unknown pin {pin}
    UnknownPin { pin: u8 },
    /// Too many sonar devices (max: {max})
    TooManySonars { max: usize },
    /// Stepper motors require 2 or 4 pins ({count} given)
    InvalidStepperPins { count: usize },
    /// Unknown I2C device at address 0x{address:02X}
    UnknownI2cDevice { address: u8 },
}
