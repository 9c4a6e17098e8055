use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::io::{FirmwareVersion, I2cReply, PinMode, PinState, ProtocolVersion};

/// Replies not yet consumed by a synchronous query.
#[derive(Debug, Default)]
pub(crate) struct ReplySlots {
    pub(crate) protocol_version: Option<ProtocolVersion>,
    pub(crate) firmware: Option<FirmwareVersion>,
    pub(crate) capabilities: Option<Vec<Vec<PinMode>>>,
    pub(crate) analog_map: Option<Vec<u8>>,
    pub(crate) pin_state: Option<PinState>,
    pub(crate) i2c: HashMap<u8, I2cReply>,
    pub(crate) ds18b20: HashMap<u8, f32>,
    closed: bool,
}

/// Rendezvous between the reporter thread (publishing replies) and the threads blocked in a
/// synchronous query.
#[derive(Debug, Default)]
pub(crate) struct Replies {
    slots: Mutex<ReplySlots>,
    condvar: Condvar,
}

impl Replies {
    /// Stores a reply and wakes the waiting queries.
    pub(crate) fn publish(&self, store: impl FnOnce(&mut ReplySlots)) {
        let mut slots = self.slots.lock();
        store(&mut slots);
        self.condvar.notify_all();
    }

    /// Clears a slot ahead of a new request.
    pub(crate) fn discard(&self, clear: impl FnOnce(&mut ReplySlots)) {
        clear(&mut self.slots.lock());
    }

    /// Waits until `take` extracts a reply, for at most `timeout`.
    ///
    /// # Returns
    /// `None` on timeout or once the replies have been closed.
    pub(crate) fn wait<T>(
        &self,
        timeout: Duration,
        mut take: impl FnMut(&mut ReplySlots) -> Option<T>,
    ) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        loop {
            if let Some(reply) = take(&mut slots) {
                return Some(reply);
            }
            if slots.closed {
                return None;
            }
            if self.condvar.wait_until(&mut slots, deadline).timed_out() {
                return take(&mut slots);
            }
        }
    }

    /// Wakes every pending query for good: the connection is going down.
    pub(crate) fn close(&self) {
        self.slots.lock().closed = true;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_consumes_published_reply() {
        let replies = Replies::default();
        replies.publish(|slots| slots.analog_map = Some(vec![0x7F, 0x00]));
        let map = replies.wait(Duration::ZERO, |slots| slots.analog_map.take());
        assert_eq!(map, Some(vec![0x7F, 0x00]));
        let map = replies.wait(Duration::from_millis(10), |slots| slots.analog_map.take());
        assert_eq!(map, None, "Reply has been consumed");
    }

    #[test]
    fn test_wait_timeout() {
        let replies = Replies::default();
        let start = Instant::now();
        let firmware = replies.wait(Duration::from_millis(50), |slots| slots.firmware.take());
        assert!(firmware.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_wakes_on_publish() {
        let replies = Arc::new(Replies::default());
        let waiter = {
            let replies = replies.clone();
            thread::spawn(move || {
                replies.wait(Duration::from_secs(5), |slots| slots.protocol_version.take())
            })
        };
        thread::sleep(Duration::from_millis(20));
        replies.publish(|slots| {
            slots.protocol_version = Some(ProtocolVersion { major: 2, minor: 5 })
        });
        assert_eq!(
            waiter.join().unwrap(),
            Some(ProtocolVersion { major: 2, minor: 5 })
        );
    }

    #[test]
    fn test_close_wakes_waiters() {
        let replies = Arc::new(Replies::default());
        let waiter = {
            let replies = replies.clone();
            thread::spawn(move || replies.wait(Duration::from_secs(10), |slots| slots.pin_state.take()))
        };
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        replies.close();
        assert!(waiter.join().unwrap().is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_discard() {
        let replies = Replies::default();
        replies.publish(|slots| {
            slots.i2c.insert(
                0x48,
                I2cReply {
                    address: 0x48,
                    register: 0,
                    data: vec![1],
                },
            );
        });
        replies.discard(|slots| {
            slots.i2c.remove(&0x48);
        });
        assert!(replies
            .wait(Duration::ZERO, |slots| slots.i2c.remove(&0x48))
            .is_none());
    }
}
