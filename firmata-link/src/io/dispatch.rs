use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::errors::Error;
use crate::io::assembler::Frame;
use crate::io::constants::*;
use crate::io::features::{dht, i2c, sonar, vendor};
use crate::io::{handlers, IoData};

/// Decodes the data of one kind of inbound frame into the shared [`IoData`].
///
/// Implemented for any `Fn(&IoData, &[u8]) -> Result<(), Error>`, so plain functions and closures
/// can be registered in a [`DispatchTable`].
pub trait FrameHandler: Send + Sync {
    /// Handles the frame `data`: fixed arguments (preceded by the port/pin number for digital
    /// and analog messages) or the sysex body without its command byte.
    fn handle(&self, io: &IoData, data: &[u8]) -> Result<(), Error>;
}

impl<F> FrameHandler for F
where
    F: Fn(&IoData, &[u8]) -> Result<(), Error> + Send + Sync,
{
    fn handle(&self, io: &IoData, data: &[u8]) -> Result<(), Error> {
        self(io, data)
    }
}

/// A handler and the number of argument bytes following its command byte.
///
/// An `arg_count` of 0 stands for "no fixed arguments": sysex sub-commands carry a variable
/// length body terminated by END_SYSEX.
#[derive(Clone)]
pub struct DispatchEntry {
    pub handler: Arc<dyn FrameHandler>,
    pub arg_count: usize,
}

impl Debug for DispatchEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DispatchEntry(args: {})", self.arg_count)
    }
}

/// Maps command bytes (and sysex sub-commands) to their handler.
///
/// Each client owns its table: it is built before the connection threads start and is
/// immutable afterwards. [`DispatchTable::default`] knows every standard message this crate
/// decodes; custom firmware messages can be added with [`DispatchTable::register`].
#[derive(Clone)]
pub struct DispatchTable {
    entries: HashMap<u8, DispatchEntry>,
}

impl DispatchTable {
    /// Creates a table without any handler.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `handler` for `command`, replacing (and returning) any previous entry.
    ///
    /// For digital (0x90..0x9F) and analog (0xE0..0xEF) messages, register the base command.
    pub fn register<H: FrameHandler + 'static>(
        &mut self,
        command: u8,
        arg_count: usize,
        handler: H,
    ) -> Option<DispatchEntry> {
        self.entries.insert(
            command,
            DispatchEntry {
                handler: Arc::new(handler),
                arg_count,
            },
        )
    }

    /// Builder flavor of [`DispatchTable::register`].
    pub fn with<H: FrameHandler + 'static>(
        mut self,
        command: u8,
        arg_count: usize,
        handler: H,
    ) -> Self {
        self.register(command, arg_count, handler);
        self
    }

    pub fn get(&self, command: u8) -> Option<&DispatchEntry> {
        self.entries.get(&command)
    }

    pub fn contains(&self, command: u8) -> bool {
        self.entries.contains_key(&command)
    }

    /// Hands `frame` to its handler.
    ///
    /// # Returns
    /// `Ok(false)` when no handler is registered for the frame command.
    pub fn dispatch(&self, io: &IoData, frame: &Frame) -> Result<bool, Error> {
        match self.entries.get(&frame.command) {
            None => Ok(false),
            Some(entry) => {
                entry.handler.handle(io, &frame.data)?;
                Ok(true)
            }
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::empty()
            .with(REPORT_VERSION, 2, handlers::report_version)
            .with(ANALOG_MESSAGE, 2, handlers::analog_message)
            .with(DIGITAL_MESSAGE, 2, handlers::digital_message)
            .with(REPORT_FIRMWARE, 0, handlers::report_firmware)
            .with(CAPABILITY_RESPONSE, 0, handlers::capability_response)
            .with(ANALOG_MAPPING_RESPONSE, 0, handlers::analog_mapping_response)
            .with(PIN_STATE_RESPONSE, 0, handlers::pin_state_response)
            .with(STRING_DATA, 0, handlers::string_data)
            .with(I2C_REPLY, 0, i2c::i2c_reply)
            .with(SONAR_DATA, 0, sonar::sonar_data)
            .with(DHT_DATA, 0, dht::dht_data)
            .with(VENDOR_MESSAGE, 0, vendor::vendor_message)
    }
}

impl Debug for DispatchTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<String> = self
            .entries
            .keys()
            .map(|command| format!("0x{:02X}", command))
            .collect();
        commands.sort();
        f.debug_struct("DispatchTable")
            .field("commands", &commands)
            .finish()
    }
}
