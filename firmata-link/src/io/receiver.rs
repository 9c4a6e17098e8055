use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};

use crate::io::queue::ByteQueue;
use crate::io::IoTransport;
use crate::utils::RunSignal;

/// Read timeout of the transports: bounds how long the receiver takes to notice a stop request.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Body of the receiver thread: moves every byte read from `transport` to `queue`.
///
/// A transport error while running stops the whole connection. The queue is closed on exit so
/// the reporter thread drains it and stops as well.
pub(crate) fn run(mut transport: Box<dyn IoTransport>, queue: Arc<ByteQueue>, signal: Arc<RunSignal>) {
    debug!("Receiver started on {}", transport);
    let mut buf = [0u8; 256];
    while signal.is_running() {
        match transport.read(&mut buf) {
            Ok(0) => {}
            Ok(count) => queue.push_all(&buf[..count]),
            Err(err) => {
                if signal.stop() {
                    error!("Receiver on {} failed: {}", transport, err);
                }
                break;
            }
        }
    }
    queue.close();
    debug!("Receiver stopped on {}", transport);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::transport::MockTransport;
    use std::thread;

    #[test]
    fn test_receiver_forwards_bytes() {
        let transport = MockTransport::default();
        transport.feed(&[0xF9, 0x02, 0x05]);
        let queue = Arc::new(ByteQueue::default());
        let signal = Arc::new(RunSignal::default());

        let handle = {
            let (queue, signal) = (queue.clone(), signal.clone());
            let transport: Box<dyn IoTransport> = Box::new(transport.clone());
            thread::spawn(move || run(transport, queue, signal))
        };

        assert_eq!(queue.pop(Duration::from_secs(1)), Some(0xF9));
        assert_eq!(queue.pop(Duration::from_secs(1)), Some(0x02));
        assert_eq!(queue.pop(Duration::from_secs(1)), Some(0x05));

        signal.stop();
        handle.join().unwrap();
        assert!(queue.is_closed());
    }

    #[test]
    fn test_receiver_stops_on_transport_error() {
        let transport = MockTransport::default();
        transport.fail_reads(true);
        let queue = Arc::new(ByteQueue::default());
        let signal = Arc::new(RunSignal::default());

        run(Box::new(transport), queue.clone(), signal.clone());
        assert!(!signal.is_running(), "Connection flagged as stopped");
        assert!(queue.is_closed());
    }
}
