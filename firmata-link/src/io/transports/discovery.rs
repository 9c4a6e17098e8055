//! Board identification (ARE_YOU_THERE / I_AM_HERE) and serial auto-discovery.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::errors::ConnectionError::{InvalidReply, NoDeviceFound, NoReply, WrongInstanceId};
use crate::errors::Error;
use crate::io::constants::{ARE_YOU_THERE, END_SYSEX, I_AM_HERE, START_SYSEX};
use crate::io::{IoTransport, Options, Serial};

/// Sends ARE_YOU_THERE on `transport` and validates the `F0 51 <id> F7` reply.
///
/// Bytes preceding the reply (boot messages) are ignored. With `expected` set to `None` any
/// instance id is accepted.
///
/// # Returns
/// The instance id reported by the board.
pub fn handshake(
    transport: &mut dyn IoTransport,
    expected: Option<u8>,
    timeout: Duration,
) -> Result<u8, Error> {
    let port = transport.to_string();
    transport.write(&[START_SYSEX, ARE_YOU_THERE, END_SYSEX])?;

    let deadline = Instant::now() + timeout;
    let mut received: Vec<u8> = vec![];
    let mut buf = [0u8; 32];
    while Instant::now() < deadline {
        let count = transport.read(&mut buf)?;
        received.extend_from_slice(&buf[..count]);
        let start = received.iter().position(|b| *b == START_SYSEX);
        if let Some(start) = start {
            if received[start..].contains(&END_SYSEX) {
                received.drain(..start);
                break;
            }
        }
    }

    if received.is_empty() {
        return Err(NoReply { port }.into());
    }
    let reply: Vec<u8> = match received.iter().position(|b| *b == END_SYSEX) {
        Some(end) => received[..=end].to_vec(),
        None => received,
    };
    if reply.len() != 4 || reply[0] != START_SYSEX || reply[1] != I_AM_HERE {
        return Err(InvalidReply {
            port,
            received: reply,
        }
        .into());
    }
    let instance_id = reply[2];
    match expected {
        Some(expected) if expected != instance_id => Err(WrongInstanceId {
            port,
            expected,
            received: instance_id,
        }
        .into()),
        _ => Ok(instance_id),
    }
}

/// Picks, among `candidates`, the first board answering the identification.
///
/// Every candidate is opened, given `options.reset_wait` to reboot, then identified in turn.
/// Candidates not selected are closed.
pub fn select_device(
    candidates: Vec<Box<dyn IoTransport>>,
    options: &Options,
) -> Result<Box<dyn IoTransport>, Error> {
    let mut opened: Vec<Box<dyn IoTransport>> = vec![];
    for mut candidate in candidates {
        match candidate.open() {
            Ok(()) => opened.push(candidate),
            Err(err) => debug!("Skipping {}: {}", candidate, err),
        }
    }
    if opened.is_empty() {
        Err(NoDeviceFound)?
    }
    std::thread::sleep(options.reset_wait);

    let mut selected: Option<Box<dyn IoTransport>> = None;
    for mut candidate in opened {
        if selected.is_none() {
            match handshake(candidate.as_mut(), options.instance_id, options.query_timeout) {
                Ok(id) => {
                    info!("Board with instance id {} found on {}", id, candidate);
                    selected = Some(candidate);
                    continue;
                }
                Err(err) => warn!("Rejected {}: {}", candidate, err),
            }
        }
        candidate.close()?;
    }
    selected.ok_or(NoDeviceFound.into())
}

/// Probes every USB serial port for a board with the configured instance id.
#[cfg(not(tarpaulin_include))]
pub fn discover(options: &Options) -> Result<Box<dyn IoTransport>, Error> {
    let candidates: Vec<Box<dyn IoTransport>> = Serial::usb_ports()?
        .into_iter()
        .map(|port| {
            Box::new(Serial::new(port).with_baud_rate(options.baud_rate)) as Box<dyn IoTransport>
        })
        .collect();
    debug!("Auto-discovery candidates: {:?}", candidates);
    select_device(candidates, options)
}
