use crate::errors::Error;
use crate::io::transports::private::TraitToAny;
use dyn_clone::DynClone;
use std::fmt::{Debug, Display};
use std::time::Duration;

pub mod discovery;
pub mod serial;
pub mod tcp;

pub(crate) mod private {
    use std::any::Any;

    pub trait TraitToAny: 'static {
        fn as_any(&self) -> &dyn Any;
    }

    impl<T: 'static> TraitToAny for T {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}

dyn_clone::clone_trait_object!(IoTransport);

/// A byte pipe to the board.
///
/// Clones share the underlying connection: the receiver thread reads through a clone while
/// callers write through the original.
pub trait IoTransport: Debug + Display + DynClone + Send + Sync + TraitToAny {
    /// Opens communication (in a blocking way) using the transport layer.
    ///
    /// # Notes
    /// Opening an already opened transport is a no-op.
    fn open(&mut self) -> Result<(), Error>;

    /// Gracefully shuts down the transport layer. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), Error>;

    /// Sets the read timeout of the transport layer.
    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error>;

    /// Writes all of `buf` to the connection.
    ///
    /// # Notes
    /// This function blocks until the write operation is complete.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error>;

    /// Reads available bytes into `buf`.
    ///
    /// # Returns
    /// The number of bytes read: 0 if nothing arrived before the read timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Whether the board should receive a SYSTEM_RESET when the client shuts down.
    fn reset_on_shutdown(&self) -> bool {
        true
    }
}
