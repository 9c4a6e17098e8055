use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;

use crate::errors::ConnectionError::{AnalogMapNotFound, Disconnected, FirmwareNotFound};
use crate::errors::Error;
use crate::io::queue::ByteQueue;
use crate::io::receiver::{self, READ_TIMEOUT};
use crate::io::replies::ReplySlots;
use crate::io::transports::discovery::{discover, handshake};
use crate::io::transports::private::TraitToAny;
use crate::io::{
    DispatchTable, FrameStats, IoData, IoTransport, Options, Reporter, Serial, TcpTransport,
    TransportOptions,
};
use crate::utils::{format_as_hex, RunSignal};

/// Handles shared by the client and its helper threads.
#[derive(Clone)]
pub(crate) struct Connection {
    pub(crate) transport: Arc<Mutex<Box<dyn IoTransport>>>,
    pub(crate) io: Arc<IoData>,
    pub(crate) queue: Arc<ByteQueue>,
    pub(crate) signal: Arc<RunSignal>,
}

impl Connection {
    /// Writes `payload` as one frame: concurrent senders never interleave their bytes.
    ///
    /// A write failure stops the connection.
    pub(crate) fn send(&self, payload: &[u8]) -> Result<(), Error> {
        if !self.signal.is_running() {
            Err(Disconnected)?
        }
        trace!("Sending [{}]", format_as_hex(payload));
        let result = self.transport.lock().write(payload);
        if let Err(err) = &result {
            error!("Write failed, stopping the connection: {}", err);
            self.halt();
        }
        result
    }

    /// Stops both threads and wakes the pending queries.
    pub(crate) fn halt(&self) {
        self.signal.stop();
        self.queue.close();
        self.io.replies.close();
    }
}

/// A connection to a Firmata board.
///
/// Two threads run for the lifetime of the client: the receiver moves the transport bytes to
/// a queue, the reporter decodes them into the shared [`IoData`] and invokes the callbacks.
/// All the methods take `&self`: a client can be shared between threads (`Arc<FirmataClient>`).
///
/// # Example
/// ```no_run
/// use firmata_link::io::{FirmataClient, Options};
///
/// let client = FirmataClient::open(Options::serial("/dev/ttyACM0")).unwrap();
/// client.set_pin_mode_digital_output(13).unwrap();
/// client.digital_write(13, true).unwrap();
/// client.shutdown().unwrap();
/// ```
pub struct FirmataClient {
    pub(crate) options: Options,
    pub(crate) connection: Connection,
    threads: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) keep_alive: Mutex<Option<(Arc<RunSignal>, JoinHandle<()>)>>,
    closed: AtomicBool,
}

impl FirmataClient {
    /// Connects to the board described by `options`.
    ///
    /// # Errors
    /// * `NoDeviceFound`: auto-discovery found no board answering with the expected instance id.
    /// * `WrongInstanceId`, `InvalidReply`, `NoReply`: the board on the given serial port failed
    ///   the identification.
    /// * `FirmwareNotFound`, `AnalogMapNotFound`: the board did not answer the initialization.
    pub fn open(options: Options) -> Result<Self, Error> {
        Self::open_with(options, DispatchTable::default())
    }

    /// Same as [`FirmataClient::open`] with a custom dispatch table.
    pub fn open_with(options: Options, table: DispatchTable) -> Result<Self, Error> {
        let transport: Box<dyn IoTransport> = match &options.transport {
            TransportOptions::Auto => discover(&options)?,
            TransportOptions::Serial { port } => {
                let mut serial = Serial::new(port.clone()).with_baud_rate(options.baud_rate);
                serial.open()?;
                thread::sleep(options.reset_wait);
                if options.instance_id.is_some() {
                    if let Err(err) =
                        handshake(&mut serial, options.instance_id, options.query_timeout)
                    {
                        serial.close()?;
                        return Err(err);
                    }
                }
                Box::new(serial)
            }
            TransportOptions::Network { host, port } => {
                Box::new(TcpTransport::new(host.clone(), *port))
            }
        };
        Self::connect_with(transport, options, table)
    }

    /// Starts a client on an explicit transport. No identification is performed.
    pub fn connect<T: IoTransport + 'static>(transport: T, options: Options) -> Result<Self, Error> {
        Self::connect_with(Box::new(transport), options, DispatchTable::default())
    }

    /// Starts a client on `transport`, decoding the inbound frames with `table`.
    pub fn connect_with(
        mut transport: Box<dyn IoTransport>,
        options: Options,
        table: DispatchTable,
    ) -> Result<Self, Error> {
        transport.open()?;
        transport.set_timeout(READ_TIMEOUT)?;
        debug!("Transport {} opened", transport);

        let connection = Connection {
            transport: Arc::new(Mutex::new(dyn_clone::clone_box(&*transport))),
            io: Arc::new(IoData::default()),
            queue: Arc::new(ByteQueue::default()),
            signal: Arc::new(RunSignal::default()),
        };

        let receiver = {
            let (queue, signal) = (connection.queue.clone(), connection.signal.clone());
            thread::Builder::new()
                .name(String::from("firmata-receiver"))
                .spawn(move || receiver::run(transport, queue, signal))?
        };
        let reporter = {
            let reporter = Reporter::new(table, connection.io.clone(), options.unknown_commands);
            let (queue, signal) = (connection.queue.clone(), connection.signal.clone());
            thread::Builder::new()
                .name(String::from("firmata-reporter"))
                .spawn(move || reporter.run(queue, signal))
        };

        let client = Self {
            options,
            connection,
            threads: Mutex::new(vec![receiver]),
            keep_alive: Mutex::new(None),
            closed: AtomicBool::new(false),
        };
        // On error the client is dropped, which stops the receiver.
        client.threads.lock().push(reporter?);
        client.initialize()?;
        Ok(client)
    }

    /// Queries the firmware and the analog mapping, builds the pins and sets the sampling
    /// interval.
    fn initialize(&self) -> Result<(), Error> {
        let firmware = match self.get_firmware_version()? {
            Some(firmware) => Some(firmware),
            None => {
                warn!("No firmware report received, retrying");
                self.get_firmware_version()?
            }
        }
        .ok_or(FirmwareNotFound)?;

        let analog_map = self.get_analog_map()?.ok_or(AnalogMapNotFound)?;
        self.connection.io.init_pins(&analog_map);
        self.set_sampling_interval(self.options.sampling_interval)?;

        info!(
            "Connected to {} on {} ({} pins, {} analog)",
            firmware,
            self.connection.transport.lock(),
            self.connection.io.digital_pin_count(),
            self.connection.io.analog_pin_count()
        );
        Ok(())
    }

    /// Closes the connection: disables the reporting, resets the board (serial only), stops the
    /// threads, wakes the pending queries and closes the transport.
    ///
    /// # Notes
    /// Calling it more than once is a no-op. It is also performed when the client is dropped.
    pub fn shutdown(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_keep_alive();

        let mut result = Ok(());
        if self.connection.signal.is_running() {
            result = self.disable_all_reporting();
            if result.is_ok() && self.connection.transport.lock().reset_on_shutdown() {
                result = self.send_reset();
            }
        }
        self.connection.halt();

        // A callback may shut the client down from the reporter thread itself.
        let current = thread::current().id();
        for handle in self.threads.lock().drain(..) {
            if handle.thread().id() != current && handle.join().is_err() {
                warn!("A connection thread panicked");
            }
        }

        let mut transport = self.connection.transport.lock();
        transport.close()?;
        info!("Disconnected from {}", transport);
        result
    }

    /// Turns off the reporting of every pin that has it enabled.
    fn disable_all_reporting(&self) -> Result<(), Error> {
        let io = &self.connection.io;
        let channels: Vec<u8> = io
            .analog_pins
            .read()
            .iter()
            .filter(|pin| pin.reporting)
            .map(|pin| pin.id)
            .collect();
        for channel in channels {
            self.disable_analog_reporting(channel)?;
        }

        let mut ports: Vec<u8> = io
            .digital_pins
            .read()
            .iter()
            .filter(|pin| pin.reporting)
            .map(|pin| pin.id / 8)
            .collect();
        ports.dedup();
        for port in ports {
            self.disable_digital_reporting(port * 8)?;
        }
        Ok(())
    }

    /// Whether the connection threads are still running.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.connection.signal.is_running()
    }

    /// The shared pins and devices store.
    pub fn io(&self) -> &IoData {
        &self.connection.io
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// A handle on the transport if it is a `T`: clones share the connection.
    pub fn transport<T: IoTransport + Clone>(&self) -> Option<T> {
        let transport = self.connection.transport.lock();
        TraitToAny::as_any(&**transport).downcast_ref::<T>().cloned()
    }

    /// Inbound traffic statistics.
    pub fn stats(&self) -> FrameStats {
        self.connection.io.stats()
    }

    /// Sends raw bytes to the board.
    pub fn send(&self, payload: &[u8]) -> Result<(), Error> {
        self.connection.send(payload)
    }

    /// Sends `START_SYSEX command data END_SYSEX`.
    pub fn send_sysex(&self, command: u8, data: &[u8]) -> Result<(), Error> {
        let mut payload = Vec::with_capacity(data.len() + 3);
        payload.push(crate::io::constants::START_SYSEX);
        payload.push(command);
        payload.extend_from_slice(data);
        payload.push(crate::io::constants::END_SYSEX);
        self.connection.send(&payload)
    }

    /// Sends `request` and waits (at most `query_timeout`) for `take` to find the reply.
    ///
    /// `discard` runs before the request is sent so a stale reply is never returned.
    pub(crate) fn query<T>(
        &self,
        request: &[u8],
        discard: impl FnOnce(&mut ReplySlots),
        take: impl FnMut(&mut ReplySlots) -> Option<T>,
    ) -> Result<Option<T>, Error> {
        let replies = &self.connection.io.replies;
        replies.discard(discard);
        self.connection.send(request)?;
        let reply = replies.wait(self.options.query_timeout, take);
        if reply.is_none() {
            debug!("No reply to [{}]", format_as_hex(request));
        }
        Ok(reply)
    }
}

impl Drop for FirmataClient {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("Shutdown failed: {}", err);
        }
    }
}

impl Debug for FirmataClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmataClient")
            .field("transport", &self.connection.transport.lock().to_string())
            .field("connected", &self.is_connected())
            .field("io", &self.connection.io)
            .finish()
    }
}
