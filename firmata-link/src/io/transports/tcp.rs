use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use log::trace;
use parking_lot::Mutex;

use crate::errors::ConnectionError::{Disconnected, NotInitialized};
use crate::errors::Error;
use crate::io::IoTransport;

type SharedStream = Arc<Mutex<Option<TcpStream>>>;

/// Transport to a board reachable through a TCP bridge (Wi-Fi or Ethernet shields, ser2net...).
#[derive(Clone, Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    /// Pause after each write: slow bridges drop bytes when flooded.
    pacing: Duration,
    timeout: Duration,
    writer: SharedStream,
    reader: SharedStream,
}

impl TcpTransport {
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            pacing: Duration::from_millis(8),
            timeout: Duration::from_secs(1),
            writer: Arc::new(Mutex::new(None)),
            reader: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the pause observed after each write (zero disables it).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Display for TcpTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tcp({}:{})", self.host, self.port)
    }
}

impl IoTransport for TcpTransport {
    fn open(&mut self) -> Result<(), Error> {
        if self.writer.lock().is_some() {
            return Ok(());
        }
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.timeout))?;
        trace!("Tcp stream is now opened: {:?}", stream);

        let reader = stream.try_clone()?;
        *self.reader.lock() = Some(reader);
        *self.writer.lock() = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(stream) = self.writer.lock().take() {
            // The peer may already be gone.
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        *self.reader.lock() = None;
        Ok(())
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.timeout = duration;
        if let Some(stream) = self.reader.lock().as_ref() {
            stream.set_read_timeout(Some(duration))?;
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        {
            let mut lock = self.writer.lock();
            let stream = lock.as_mut().ok_or(NotInitialized)?;
            stream.write_all(buf)?;
            stream.flush()?;
        }
        if !self.pacing.is_zero() {
            std::thread::sleep(self.pacing);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut lock = self.reader.lock();
        let stream = lock.as_mut().ok_or(NotInitialized)?;
        match stream.read(buf) {
            Ok(0) => Err(Disconnected)?,
            Ok(count) => Ok(count),
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// A network bridge outlives the client session: the board is left as is.
    fn reset_on_shutdown(&self) -> bool {
        false
    }
}
