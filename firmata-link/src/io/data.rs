use std::collections::{HashMap, VecDeque};
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::errors::HardwareError::UnknownPin;
use crate::errors::*;
use crate::io::constants::NO_ANALOG_CHANNEL;
use crate::io::replies::Replies;

/// Callback invoked (on the reporter thread) when a pin value changes.
pub type PinCallback = Arc<dyn Fn(PinReport) + Send + Sync>;
/// Callback invoked with every I2C reply of a device.
pub type I2cCallback = Arc<dyn Fn(I2cReply) + Send + Sync>;
/// Callback invoked when a sonar distance changes.
pub type SonarCallback = Arc<dyn Fn(SonarReading) + Send + Sync>;
/// Callback invoked with every decoded infrared code.
pub type IrCallback = Arc<dyn Fn(IrCode) + Send + Sync>;

/// Shared state of a connection: written by the reporter thread, read by callers.
///
/// Every map sits behind its own lock so a slow reader of one never stalls the others.
/// Callbacks are always invoked once the relevant lock has been released.
pub struct IoData {
    pub(crate) digital_pins: RwLock<Vec<Pin>>,
    pub(crate) analog_pins: RwLock<Vec<Pin>>,
    pub(crate) i2c_devices: RwLock<HashMap<u8, I2cDevice>>,
    pub(crate) sonars: RwLock<HashMap<u8, Sonar>>,
    pub(crate) ir_receivers: RwLock<HashMap<u8, IrReceiver>>,
    pub(crate) ds18b20_sensors: RwLock<HashMap<u8, Option<f32>>>,
    pub(crate) last_string: RwLock<Option<String>>,
    pub(crate) replies: Replies,
    pub(crate) stats: FrameCounters,
    port_masks: [Mutex<u8>; 16],
}

impl Default for IoData {
    fn default() -> Self {
        Self {
            digital_pins: RwLock::new(vec![]),
            analog_pins: RwLock::new(vec![]),
            i2c_devices: RwLock::new(HashMap::new()),
            sonars: RwLock::new(HashMap::new()),
            ir_receivers: RwLock::new(HashMap::new()),
            ds18b20_sensors: RwLock::new(HashMap::new()),
            last_string: RwLock::new(None),
            replies: Replies::default(),
            stats: FrameCounters::default(),
            port_masks: std::array::from_fn(|_| Mutex::new(0)),
        }
    }
}

impl IoData {
    /// Creates a store with `digital` pins, the last `analog` of them being analog capable.
    pub fn with_pins(digital: u8, analog: u8) -> Self {
        let first_analog = digital.saturating_sub(analog);
        let map: Vec<u8> = (0..digital)
            .map(|pin| match pin >= first_analog {
                true => pin - first_analog,
                false => NO_ANALOG_CHANNEL,
            })
            .collect();
        let io = Self::default();
        io.init_pins(&map);
        io
    }

    /// (Re)builds the pin lists from an analog mapping report.
    ///
    /// The report holds one entry per digital pin: its analog channel or `0x7F`.
    pub fn init_pins(&self, analog_map: &[u8]) {
        let digital_pins: Vec<Pin> = analog_map
            .iter()
            .enumerate()
            .map(|(id, channel)| {
                let mut pin = Pin::new(id as u8);
                pin.channel = (*channel != NO_ANALOG_CHANNEL).then_some(*channel);
                pin
            })
            .collect();
        let analog_count = digital_pins.iter().filter(|p| p.channel.is_some()).count();
        let analog_pins = (0..analog_count).map(|id| Pin::new(id as u8)).collect();

        *self.digital_pins.write() = digital_pins;
        *self.analog_pins.write() = analog_pins;
    }

    /// Number of digital pins.
    pub fn digital_pin_count(&self) -> usize {
        self.digital_pins.read().len()
    }

    /// Number of analog pins.
    pub fn analog_pin_count(&self) -> usize {
        self.analog_pins.read().len()
    }

    /// Digital index of analog pin A0: total pins - analog pins.
    pub fn first_analog_pin(&self) -> u8 {
        self.digital_pin_count()
            .saturating_sub(self.analog_pin_count()) as u8
    }

    /// Returns a copy of the digital `pin`.
    pub fn digital_pin(&self, pin: u8) -> Result<Pin, Error> {
        Ok(self
            .digital_pins
            .read()
            .get(pin as usize)
            .ok_or(UnknownPin { pin })?
            .clone())
    }

    /// Returns a copy of the analog `pin` (channel number).
    pub fn analog_pin(&self, pin: u8) -> Result<Pin, Error> {
        Ok(self
            .analog_pins
            .read()
            .get(pin as usize)
            .ok_or(UnknownPin { pin })?
            .clone())
    }

    /// Applies `f` to the digital `pin` under the write lock.
    pub(crate) fn update_digital_pin<R>(
        &self,
        pin: u8,
        f: impl FnOnce(&mut Pin) -> R,
    ) -> Result<R, Error> {
        let mut pins = self.digital_pins.write();
        let pin = pins.get_mut(pin as usize).ok_or(UnknownPin { pin })?;
        Ok(f(pin))
    }

    /// Applies `f` to the analog `pin` under the write lock.
    pub(crate) fn update_analog_pin<R>(
        &self,
        pin: u8,
        f: impl FnOnce(&mut Pin) -> R,
    ) -> Result<R, Error> {
        let mut pins = self.analog_pins.write();
        let pin = pins.get_mut(pin as usize).ok_or(UnknownPin { pin })?;
        Ok(f(pin))
    }

    /// Locks the output mask of `port`. Holding the guard serializes read-modify-write cycles
    /// (and the write of the resulting message) on that port only.
    pub(crate) fn port_mask(&self, port: u8) -> Result<MutexGuard<'_, u8>, Error> {
        Ok(self
            .port_masks
            .get(port as usize)
            .ok_or(UnknownPin {
                pin: port.saturating_mul(8),
            })?
            .lock())
    }

    /// The last string message sent by the board.
    pub fn last_string(&self) -> Option<String> {
        self.last_string.read().clone()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats.snapshot()
    }
}

impl Debug for IoData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoData")
            .field("digital_pins", &*self.digital_pins.read())
            .field("analog_pins", &*self.analog_pins.read())
            .field("i2c_devices", &self.i2c_devices.read().keys())
            .field("sonars", &self.sonars.read().keys())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

// ########################################

/// Enumerates the possible modes for a pin.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[repr(u8)]
pub enum PinModeId {
    /// Same as INPUT defined in Arduino.
    INPUT = 0,
    /// Same as OUTPUT defined in Arduino.h
    OUTPUT = 1,
    /// Analog pin in analogInput mode
    ANALOG = 2,
    /// Digital pin in PWM output mode
    PWM = 3,
    /// Digital pin in Servo output mode
    SERVO = 4,
    /// shiftIn/shiftOut mode
    SHIFT = 5,
    /// Pin included in I2C setup
    I2C = 6,
    /// Pin configured for 1-wire
    ONEWIRE = 7,
    /// Pin configured for stepper motor
    STEPPER = 8,
    /// Pin configured for rotary encoders
    ENCODER = 9,
    /// Pin configured for serial communication
    SERIAL = 0x0A,
    /// Enable internal pull-up resistor for pin
    PULLUP = 0x0B,
    /// Pin configured for HC-SR04 sonar (trigger pin)
    SONAR = 0x0C,
    /// Pin configured for piezo buzzer tone generation
    TONE = 0x0D,
    /// Pin configured for DHT humidity and temperature sensors
    DHT = 0x0F,
    /// Pin not configured, or configured to be ignored
    #[default]
    UNSUPPORTED = 0x7F,
}

impl PinModeId {
    /// Converts a `u8` byte value into a `PinModeId`.
    ///
    /// # Errors
    /// * `UnexpectedData`: The value does not match any known pin mode.
    pub fn from_u8(value: u8) -> Result<PinModeId, Error> {
        match value {
            0 => Ok(PinModeId::INPUT),
            1 => Ok(PinModeId::OUTPUT),
            2 => Ok(PinModeId::ANALOG),
            3 => Ok(PinModeId::PWM),
            4 => Ok(PinModeId::SERVO),
            5 => Ok(PinModeId::SHIFT),
            6 => Ok(PinModeId::I2C),
            7 => Ok(PinModeId::ONEWIRE),
            8 => Ok(PinModeId::STEPPER),
            9 => Ok(PinModeId::ENCODER),
            0x0A => Ok(PinModeId::SERIAL),
            0x0B => Ok(PinModeId::PULLUP),
            0x0C => Ok(PinModeId::SONAR),
            0x0D => Ok(PinModeId::TONE),
            0x0F => Ok(PinModeId::DHT),
            0x7F => Ok(PinModeId::UNSUPPORTED),
            x => Err(ProtocolError::UnexpectedData {
                operation: "pin_mode",
                info: format!("PinMode not found with value: {}", x),
            }
            .into()),
        }
    }

    /// Modes driven by the host: digital port reports never overwrite those pins.
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            PinModeId::OUTPUT
                | PinModeId::PWM
                | PinModeId::SERVO
                | PinModeId::STEPPER
                | PinModeId::TONE
        )
    }
}

impl From<PinModeId> for u8 {
    fn from(mode: PinModeId) -> u8 {
        mode as u8
    }
}

impl Display for PinModeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A mode supported by a pin, as listed in the capability report.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PinMode {
    pub id: PinModeId,
    /// Resolution (number of bits) this mode uses.
    pub resolution: u8,
}

impl Debug for PinMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[id: {}, resolution: {}]", self.id, self.resolution)
    }
}

// ########################################

/// Value held by a pin.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinValue {
    /// Digital level or analog reading.
    Scalar(u16),
    /// Last DHT reading (or failure).
    Dht(DhtValue),
}

impl Default for PinValue {
    fn default() -> Self {
        PinValue::Scalar(0)
    }
}

impl PinValue {
    pub fn as_scalar(&self) -> Option<u16> {
        match self {
            PinValue::Scalar(value) => Some(*value),
            PinValue::Dht(_) => None,
        }
    }
}

/// Result of a DHT measurement.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DhtValue {
    Reading { humidity: f32, temperature: f32 },
    Error(DhtError),
}

/// Failures reported by the firmware for a DHT measurement.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtError {
    /// Unknown sensor type or bad configuration.
    Configuration,
    /// Checksum mismatch.
    Checksum,
    /// Sensor did not answer in time.
    Timeout,
}

impl DhtError {
    /// Sentinel code: -1 configuration, -2 checksum, -3 timeout.
    pub fn code(&self) -> i8 {
        match self {
            DhtError::Configuration => -1,
            DhtError::Checksum => -2,
            DhtError::Timeout => -3,
        }
    }
}

/// Supported DHT sensor models.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DhtSensor {
    DHT11 = 11,
    DHT22 = 22,
}

/// Payload handed to pin callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinReport {
    pub mode: PinModeId,
    /// Digital pin number, or analog channel for analog reports.
    pub pin: u8,
    pub value: PinValue,
    pub timestamp: SystemTime,
}

/// Current state and configuration of a pin.
#[derive(Clone)]
pub struct Pin {
    /// Digital pin number, or channel number for analog pins.
    pub id: u8,
    /// Currently configured mode.
    pub mode: PinModeId,
    /// Modes listed by the last capability report.
    pub supported_modes: Vec<PinMode>,
    /// Analog channel of a digital pin ("A0" => 0, "A1" => 1, etc.)
    pub channel: Option<u8>,
    /// Last stored value.
    pub value: PinValue,
    /// Minimum change required to store a new value and fire the callback.
    pub differential: f32,
    /// Reporting is enabled on the board.
    pub reporting: bool,
    pub(crate) callback: Option<PinCallback>,
}

impl Pin {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            mode: PinModeId::default(),
            supported_modes: vec![],
            channel: None,
            value: PinValue::default(),
            differential: 1.0,
            reporting: false,
            callback: None,
        }
    }

    /// Verifies if a pin supports the given mode.
    pub fn supports_mode(&self, mode: PinModeId) -> Option<PinMode> {
        self.supported_modes.iter().find(|m| m.id == mode).copied()
    }

    /// Tells whether `value` differs enough from the stored value to be reported.
    pub fn exceeds_differential(&self, value: u16) -> bool {
        let current = self.value.as_scalar().unwrap_or(0);
        (value as f32 - current as f32).abs() >= self.differential
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Builds the callback invocation for the current value, if a callback is registered.
    pub(crate) fn report(&self) -> Option<(PinCallback, PinReport)> {
        self.callback.clone().map(|callback| {
            let report = PinReport {
                mode: self.mode,
                pin: self.id,
                value: self.value,
                timestamp: SystemTime::now(),
            };
            (callback, report)
        })
    }

    /// Resets mode related state before a new mode gets configured.
    pub(crate) fn configure(
        &mut self,
        mode: PinModeId,
        differential: f32,
        callback: Option<PinCallback>,
    ) {
        self.mode = mode;
        self.differential = differential;
        self.callback = callback;
    }
}

impl Debug for Pin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pin")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("channel", &self.channel)
            .field("value", &self.value)
            .field("differential", &self.differential)
            .field("reporting", &self.reporting)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

// ########################################
// Query replies

/// Firmata protocol version (REPORT_VERSION).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Firmware name and version (REPORT_FIRMWARE).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub name: String,
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} {}", self.major, self.minor, self.name)
    }
}

/// Mode and value of a pin as seen by the board (PIN_STATE_RESPONSE).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinState {
    pub pin: u8,
    pub mode: PinModeId,
    pub value: u32,
}

// ########################################
// Devices

/// Defines an I2C reply.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct I2cReply {
    pub address: u8,
    pub register: u16,
    pub data: Vec<u16>,
}

#[derive(Clone, Default)]
pub(crate) struct I2cDevice {
    pub(crate) last_reply: Option<I2cReply>,
    pub(crate) callback: Option<I2cCallback>,
}

/// Distance measured by a sonar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SonarReading {
    pub trigger: u8,
    /// Distance in centimeters.
    pub distance: u16,
    pub timestamp: SystemTime,
}

#[derive(Clone)]
pub(crate) struct Sonar {
    pub(crate) echo: u8,
    pub(crate) reading: Option<SonarReading>,
    pub(crate) callback: Option<SonarCallback>,
}

/// An infrared code decoded on a receiver pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrCode {
    pub pin: u8,
    pub code: u32,
    pub timestamp: SystemTime,
}

#[derive(Clone, Default)]
pub(crate) struct IrReceiver {
    pub(crate) codes: VecDeque<IrCode>,
    pub(crate) callback: Option<IrCallback>,
}

// ########################################
// Statistics

/// Counters updated by the reporter thread.
#[derive(Debug, Default)]
pub(crate) struct FrameCounters {
    pub(crate) frames: AtomicU64,
    pub(crate) unknown_commands: AtomicU64,
    pub(crate) handler_errors: AtomicU64,
    pub(crate) discarded_bytes: AtomicU64,
}

impl FrameCounters {
    pub(crate) fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> FrameStats {
        FrameStats {
            frames: self.frames.load(Ordering::Relaxed),
            unknown_commands: self.unknown_commands.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            discarded_bytes: self.discarded_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the inbound traffic statistics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames dispatched to a handler.
    pub frames: u64,
    /// Command bytes (or sysex sub-commands) without a registered handler.
    pub unknown_commands: u64,
    /// Frames a handler failed to decode.
    pub handler_errors: u64,
    /// Data bytes received outside of any frame.
    pub discarded_bytes: u64,
}
