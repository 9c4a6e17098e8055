use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, trace, warn};

use crate::errors::{Error, ProtocolError};
use crate::io::assembler::{FrameAssembler, Step};
use crate::io::data::FrameCounters;
use crate::io::queue::ByteQueue;
use crate::io::{DispatchTable, IoData, UnknownCommandPolicy};
use crate::utils::{format_as_hex, RunSignal};

/// Longest wait for a byte before the stop flag is checked again.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Assembles inbound bytes into frames and dispatches them to the table handlers.
pub struct Reporter {
    assembler: FrameAssembler,
    table: DispatchTable,
    io: Arc<IoData>,
    policy: UnknownCommandPolicy,
}

impl Reporter {
    pub fn new(table: DispatchTable, io: Arc<IoData>, policy: UnknownCommandPolicy) -> Self {
        Self {
            assembler: FrameAssembler::default(),
            table,
            io,
            policy,
        }
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    /// Processes one inbound byte.
    ///
    /// Handler failures are logged and counted, they never interrupt the stream.
    ///
    /// # Errors
    /// * `UnknownCommand`: an unknown command was received under the strict policy.
    pub fn process(&mut self, byte: u8) -> Result<(), Error> {
        let stats = &self.io.stats;
        match self.assembler.push(byte, &self.table) {
            Step::Pending => {}
            Step::Discarded(byte) => {
                FrameCounters::increment(&stats.discarded_bytes);
                trace!("Discarded byte 0x{:02X}", byte);
            }
            Step::Frame(frame) => {
                FrameCounters::increment(&stats.frames);
                trace!(
                    "Frame 0x{:02X}: [{}]",
                    frame.command,
                    format_as_hex(&frame.data)
                );
                if let Err(err) = self.table.dispatch(&self.io, &frame) {
                    FrameCounters::increment(&stats.handler_errors);
                    warn!("Frame 0x{:02X} rejected: {}", frame.command, err);
                }
            }
            Step::Unknown(command) => {
                FrameCounters::increment(&stats.unknown_commands);
                match self.policy {
                    UnknownCommandPolicy::Permissive => {
                        debug!("Unknown command 0x{:02X} skipped", command)
                    }
                    UnknownCommandPolicy::Strict => {
                        Err(ProtocolError::UnknownCommand { command })?
                    }
                }
            }
        }
        Ok(())
    }

    /// Body of the reporter thread.
    pub(crate) fn run(mut self, queue: Arc<ByteQueue>, signal: Arc<RunSignal>) {
        debug!("Reporter started");
        loop {
            match queue.pop(IDLE_WAIT) {
                Some(byte) => {
                    if let Err(err) = self.process(byte) {
                        error!("Reporter stopped: {}", err);
                        signal.stop();
                        queue.close();
                        break;
                    }
                }
                None if queue.is_closed() || !signal.is_running() => break,
                None => {}
            }
        }
        self.io.replies.close();
        debug!("Reporter stopped");
    }
}
