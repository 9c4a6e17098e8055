use log::trace;

use crate::io::constants::{ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX, START_SYSEX};
use crate::io::DispatchTable;

/// A complete inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Command byte (base command for digital/analog messages) or sysex sub-command.
    pub command: u8,
    /// Arguments, or sysex body. Digital and analog messages get their port/pin number first.
    pub data: Vec<u8>,
}

/// Outcome of feeding one byte to the [`FrameAssembler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// More bytes are needed.
    Pending,
    /// A frame is complete.
    Frame(Frame),
    /// A command byte (or sysex sub-command) without handler was skipped.
    Unknown(u8),
    /// A data byte received outside of any frame was skipped.
    Discarded(u8),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for a command byte.
    #[default]
    Idle,
    /// START_SYSEX received, waiting for the sub-command.
    SysexCommand,
    /// Collecting a sysex body until END_SYSEX.
    SysexBody { command: u8, body: Vec<u8> },
    /// Collecting the fixed arguments of a command.
    FixedArgs {
        command: u8,
        remaining: usize,
        data: Vec<u8>,
    },
}

/// Turns the inbound byte stream into frames.
///
/// The assembler knows nothing about the meaning of frames: it only asks the
/// [`DispatchTable`] whether a command is known and how many argument bytes follow it.
/// Any command byte (bit 7 set) received in the middle of a frame aborts that frame and starts
/// a new one, so the stream resynchronizes on the next valid command.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    state: AssemblerState,
}

impl FrameAssembler {
    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Feeds one byte.
    pub fn push(&mut self, byte: u8, table: &DispatchTable) -> Step {
        let interrupts = byte & 0x80 != 0 && byte != END_SYSEX;
        if interrupts && self.state != AssemblerState::Idle {
            trace!(
                "Frame interrupted by 0x{:02X}, dropping {:?}",
                byte,
                self.state
            );
            self.state = AssemblerState::Idle;
        }

        match std::mem::take(&mut self.state) {
            AssemblerState::Idle => self.start(byte, table),
            AssemblerState::SysexCommand => match byte {
                END_SYSEX => Step::Discarded(byte),
                command => {
                    self.state = AssemblerState::SysexBody {
                        command,
                        body: vec![],
                    };
                    Step::Pending
                }
            },
            AssemblerState::SysexBody { command, mut body } => match byte {
                END_SYSEX => match table.contains(command) {
                    true => Step::Frame(Frame {
                        command,
                        data: body,
                    }),
                    false => Step::Unknown(command),
                },
                byte => {
                    body.push(byte);
                    self.state = AssemblerState::SysexBody { command, body };
                    Step::Pending
                }
            },
            AssemblerState::FixedArgs {
                command,
                remaining,
                mut data,
            } => {
                // END_SYSEX is a command byte as well: it ends any fixed frame in progress.
                if byte == END_SYSEX {
                    return Step::Discarded(byte);
                }
                data.push(byte);
                match remaining - 1 {
                    0 => Step::Frame(Frame { command, data }),
                    remaining => {
                        self.state = AssemblerState::FixedArgs {
                            command,
                            remaining,
                            data,
                        };
                        Step::Pending
                    }
                }
            }
        }
    }

    fn start(&mut self, byte: u8, table: &DispatchTable) -> Step {
        if byte & 0x80 == 0 || byte == END_SYSEX {
            return Step::Discarded(byte);
        }
        if byte == START_SYSEX {
            self.state = AssemblerState::SysexCommand;
            return Step::Pending;
        }

        // Digital and analog messages carry their port/pin in the low nibble.
        let (command, parameter) = match byte & 0xF0 {
            DIGITAL_MESSAGE | ANALOG_MESSAGE => (byte & 0xF0, Some(byte & 0x0F)),
            _ => (byte, None),
        };
        let data: Vec<u8> = parameter.into_iter().collect();

        match table.get(command).map(|entry| entry.arg_count) {
            None => Step::Unknown(byte),
            Some(0) => Step::Frame(Frame { command, data }),
            Some(remaining) => {
                self.state = AssemblerState::FixedArgs {
                    command,
                    remaining,
                    data,
                };
                Step::Pending
            }
        }
    }
}
