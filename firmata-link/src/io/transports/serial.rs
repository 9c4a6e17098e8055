use crate::errors::ConnectionError::NotInitialized;
use crate::errors::Error;
use crate::io::IoTransport;
use log::trace;
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;

type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// Serial transport (USB or UART).
///
/// Two handles on the same OS port are kept: reads never wait for a write in progress.
#[derive(Clone, Debug)]
pub struct Serial {
    /// The connection port.
    port: String,
    baud_rate: u32,
    timeout: Duration,
    writer: SharedPort,
    reader: SharedPort,
}

impl Serial {
    /// Constructs a new `Serial` transport layer instance for the specified port (115200 bauds).
    ///
    /// # Example
    /// ```no_run
    /// use firmata_link::io::{FirmataClient, Options, Serial};
    ///
    /// let serial = Serial::new("/dev/ttyACM0").with_baud_rate(57_600);
    /// let client = FirmataClient::connect(serial, Options::default().instance_id(None));
    /// ```
    pub fn new<P: Into<String>>(port: P) -> Self {
        Self {
            port: port.into(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
            writer: Arc::new(Mutex::new(None)),
            reader: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Retrieves the configured port.
    pub fn get_port(&self) -> String {
        self.port.clone()
    }

    pub fn get_baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Lists the USB serial ports: the candidates for auto-discovery.
    #[cfg(not(tarpaulin_include))]
    pub fn usb_ports() -> Result<Vec<String>, Error> {
        Ok(serialport::available_ports()?
            .into_iter()
            .filter(|port| matches!(port.port_type, SerialPortType::UsbPort(_)))
            .map(|port| port.port_name)
            .collect())
    }
}

impl Display for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Serial({})", self.port)
    }
}

impl IoTransport for Serial {
    fn open(&mut self) -> Result<(), Error> {
        if self.writer.lock().is_some() {
            return Ok(());
        }
        let connexion = serialport::new(self.port.clone(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        trace!("Serial port is now opened: {:?}", connexion);

        let reader = connexion.try_clone()?;
        *self.reader.lock() = Some(reader);
        *self.writer.lock() = Some(connexion);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        *self.writer.lock() = None;
        *self.reader.lock() = None;
        Ok(())
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.timeout = duration;
        if let Some(port) = self.writer.lock().as_mut() {
            port.set_timeout(duration)?;
        }
        if let Some(port) = self.reader.lock().as_mut() {
            port.set_timeout(duration)?;
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut lock = self.writer.lock();
        let port = lock.as_mut().ok_or(NotInitialized)?;
        port.write_all(buf)?;
        port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut lock = self.reader.lock();
        let port = lock.as_mut().ok_or(NotInitialized)?;
        match port.read(buf) {
            Ok(count) => Ok(count),
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}
