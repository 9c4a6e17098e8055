//! Test doubles: an in-memory serial port and a scriptable transport emulating a board.

use std::time::Duration;

use crate::io::{FirmataClient, Options};
use crate::mocks::transport::{create_test_transport, MockTransport};

pub mod serial_port;
pub mod transport;

/// A client connected to the [`create_test_transport`] board, with short query timeouts.
///
/// # Returns
/// The client and a handle on its transport to feed board messages and inspect written bytes
/// (the initialization traffic already cleared).
pub fn create_test_client() -> (FirmataClient, MockTransport) {
    let transport = create_test_transport();
    let options = Options::default().query_timeout(Duration::from_millis(200));
    let client = FirmataClient::connect(transport.clone(), options)
        .expect("The test board answers the initialization queries");
    transport.clear_written();
    (client, transport)
}
