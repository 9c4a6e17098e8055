use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::ConnectionError::IoException;
use crate::errors::Error;
use crate::io::IoTransport;
use crate::pause_sync;

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    /// Scripted `(request, reply)` pairs: writing `request` queues `reply` for reading.
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    fail_writes: bool,
    fail_reads: bool,
}

/// Scriptable in-memory transport. Clones share the same state, like the real transports.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Queues bytes as if sent by the board.
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().incoming.extend(bytes);
    }

    /// Answers each write of exactly `request` with `reply`.
    pub fn reply_to(self, request: &[u8], reply: &[u8]) -> Self {
        self.state
            .lock()
            .replies
            .push((request.to_vec(), reply.to_vec()));
        self
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    pub fn clear_written(&self) {
        self.state.lock().written.clear();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

impl Display for MockTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockTransport")
    }
}

impl IoTransport for MockTransport {
    fn open(&mut self) -> Result<(), Error> {
        self.state.lock().connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn set_timeout(&mut self, _: Duration) -> Result<(), Error> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut state = self.state.lock();
        if state.fail_writes {
            Err(IoException {
                info: String::from("Mock write failure"),
            })?
        }
        state.written.extend_from_slice(buf);
        let reply = state
            .replies
            .iter()
            .find(|(request, _)| request == buf)
            .map(|(_, reply)| reply.clone());
        if let Some(reply) = reply {
            state.incoming.extend(reply);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        {
            let mut state = self.state.lock();
            if state.fail_reads {
                Err(IoException {
                    info: String::from("Mock read failure"),
                })?
            }
            if !state.incoming.is_empty() {
                let count = buf.len().min(state.incoming.len());
                for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..count)) {
                    *slot = byte;
                }
                return Ok(count);
            }
        }
        // Nothing available: behave like a read timeout.
        pause_sync!(1);
        Ok(0)
    }
}

/// A 20 pins board (14 digital + 6 analog, Arduino UNO like) answering the queries sent while
/// a client initializes, plus the protocol version and capability queries.
pub fn create_test_transport() -> MockTransport {
    let mut analog_map = vec![0xF0, 0x6A];
    analog_map.extend([0x7F; 14]);
    analog_map.extend(0..6u8);
    analog_map.push(0xF7);

    MockTransport::default()
        .reply_to(
            &[0xF0, 0x79, 0xF7],
            &[
                0xF0, 0x79, 0x02, 0x05, b'M', 0x00, b'o', 0x00, b'c', 0x00, b'k', 0x00, 0xF7,
            ],
        )
        .reply_to(&[0xF0, 0x69, 0xF7], &analog_map)
        .reply_to(&[0xF9], &[0xF9, 0x02, 0x05])
        .reply_to(&[0xF0, 0x6B, 0xF7], &create_test_capabilities())
}

/// CAPABILITY_RESPONSE of the test board.
fn create_test_capabilities() -> Vec<u8> {
    let mut response = vec![0xF0, 0x6C];
    for pin in 0..20u8 {
        match pin {
            0 | 1 => {}
            3 | 5 | 6 | 9 | 10 | 11 => {
                response.extend([0x00, 0x01, 0x01, 0x01, 0x0B, 0x01, 0x03, 0x08, 0x04, 0x0E])
            }
            2..=13 => response.extend([0x00, 0x01, 0x01, 0x01, 0x0B, 0x01, 0x04, 0x0E]),
            18 | 19 => response.extend([0x00, 0x01, 0x01, 0x01, 0x02, 0x0A, 0x06, 0x01]),
            _ => response.extend([0x00, 0x01, 0x01, 0x01, 0x02, 0x0A]),
        }
        response.push(0x7F);
    }
    response.push(0xF7);
    response
}
