use crate::errors::Error;
use crate::io::constants::*;
use crate::io::{FirmataClient, FirmwareVersion, PinMode, PinState, ProtocolVersion};

impl FirmataClient {
    /// Queries the firmware name and version (REPORT_FIRMWARE).
    ///
    /// # Returns
    /// `None` when no reply arrived within the query timeout.
    pub fn get_firmware_version(&self) -> Result<Option<FirmwareVersion>, Error> {
        self.query(
            &[START_SYSEX, REPORT_FIRMWARE, END_SYSEX],
            |slots| slots.firmware = None,
            |slots| slots.firmware.take(),
        )
    }

    /// Queries the Firmata protocol version (REPORT_VERSION).
    pub fn get_protocol_version(&self) -> Result<Option<ProtocolVersion>, Error> {
        self.query(
            &[REPORT_VERSION],
            |slots| slots.protocol_version = None,
            |slots| slots.protocol_version.take(),
        )
    }

    /// Queries the modes supported by every pin. The pins of the store are updated with the
    /// reply, which later pin mode changes are checked against.
    pub fn get_capability_report(&self) -> Result<Option<Vec<Vec<PinMode>>>, Error> {
        self.query(
            &[START_SYSEX, CAPABILITY_QUERY, END_SYSEX],
            |slots| slots.capabilities = None,
            |slots| slots.capabilities.take(),
        )
    }

    /// Queries the analog channel of every pin (`0x7F` for digital only pins).
    pub fn get_analog_map(&self) -> Result<Option<Vec<u8>>, Error> {
        self.query(
            &[START_SYSEX, ANALOG_MAPPING_QUERY, END_SYSEX],
            |slots| slots.analog_map = None,
            |slots| slots.analog_map.take(),
        )
    }

    /// Queries the mode and state of `pin` as known by the board.
    ///
    /// Replies concerning another pin are left aside.
    pub fn get_pin_state(&self, pin: u8) -> Result<Option<PinState>, Error> {
        self.query(
            &[START_SYSEX, PIN_STATE_QUERY, pin, END_SYSEX],
            |slots| slots.pin_state = None,
            |slots| match slots.pin_state {
                Some(state) if state.pin == pin => slots.pin_state.take(),
                _ => None,
            },
        )
    }
}
