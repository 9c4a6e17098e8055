use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct QueueState {
    bytes: VecDeque<u8>,
    closed: bool,
}

/// FIFO of raw bytes between the receiver thread and the reporter thread.
///
/// Consumers block on [`ByteQueue::pop`] with a bounded wait instead of spinning.
#[derive(Debug, Default)]
pub struct ByteQueue {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

impl ByteQueue {
    /// Appends `bytes` in order. Bytes pushed after [`ByteQueue::close`] are dropped.
    pub fn push_all(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.bytes.extend(bytes);
        self.condvar.notify_one();
    }

    /// Pops the oldest byte, waiting up to `timeout` for one to arrive.
    ///
    /// Remaining bytes are still handed out after the queue has been closed.
    pub fn pop(&self, timeout: Duration) -> Option<u8> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(byte) = state.bytes.pop_front() {
                return Some(byte);
            }
            if state.closed || self.condvar.wait_until(&mut state, deadline).timed_out() {
                return state.bytes.pop_front();
            }
        }
    }

    /// Closes the queue and wakes every waiting consumer.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = ByteQueue::default();
        queue.push_all(&[0xF0, 0x79]);
        queue.push_all(&[0xF7]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(Duration::ZERO), Some(0xF0));
        assert_eq!(queue.pop(Duration::ZERO), Some(0x79));
        assert_eq!(queue.pop(Duration::ZERO), Some(0xF7));
        assert_eq!(queue.pop(Duration::from_millis(10)), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_wakes_on_push() {
        let queue = Arc::new(ByteQueue::default());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push_all(&[0x42]);
        assert_eq!(consumer.join().unwrap(), Some(0x42));
    }

    #[test]
    fn test_close() {
        let queue = Arc::new(ByteQueue::default());
        queue.push_all(&[0x01]);
        queue.close();
        queue.push_all(&[0x02]);
        assert!(queue.is_closed());
        assert_eq!(queue.pop(Duration::from_secs(5)), Some(0x01));

        let start = Instant::now();
        assert_eq!(queue.pop(Duration::from_secs(5)), None);
        assert!(start.elapsed() < Duration::from_secs(1), "Closed queue does not wait");
    }
}
