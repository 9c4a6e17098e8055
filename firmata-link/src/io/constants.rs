//! Firmata command bytes, sysex sub-commands and protocol parameters.
//!
//! <https://github.com/firmata/protocol/blob/master/protocol.md>

// ########################################
// Message types

/// Send data for a digital port (collection of 8 pins).
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Send data for an analog pin (or PWM).
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Enable analog input by pin #.
pub const REPORT_ANALOG: u8 = 0xC0;
/// Enable digital input by port pair.
pub const REPORT_DIGITAL: u8 = 0xD0;
/// Set a pin to INPUT/OUTPUT/PWM/etc.
pub const SET_PIN_MODE: u8 = 0xF4;
/// Set value of an individual digital pin.
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
/// Report protocol version.
pub const REPORT_VERSION: u8 = 0xF9;
/// Reset from MIDI.
pub const SYSTEM_RESET: u8 = 0xFF;
/// Start a MIDI Sysex message.
pub const START_SYSEX: u8 = 0xF0;
/// End a MIDI Sysex message.
pub const END_SYSEX: u8 = 0xF7;

// ########################################
// Sysex sub-commands

/// Vendor (DFRobot) extension messages.
pub const VENDOR_MESSAGE: u8 = 0x0D;
/// Keep-alive heartbeat (FirmataExpress).
pub const KEEP_ALIVE: u8 = 0x50;
/// Board identification request.
pub const ARE_YOU_THERE: u8 = 0x51;
/// Board identification reply.
pub const I_AM_HERE: u8 = 0x51;
/// Play a tone on a piezo buzzer.
pub const TONE_DATA: u8 = 0x5F;
/// Configure an HC-SR04 sonar.
pub const SONAR_CONFIG: u8 = 0x62;
/// Sonar distance report.
pub const SONAR_DATA: u8 = 0x63;
/// Configure a DHT sensor.
pub const DHT_CONFIG: u8 = 0x64;
/// DHT humidity/temperature report.
pub const DHT_DATA: u8 = 0x65;
/// Ask for mapping of analog to pin numbers.
pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
/// Reply with mapping info.
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
/// Ask for supported modes and resolution of all pins.
pub const CAPABILITY_QUERY: u8 = 0x6B;
/// Reply with supported modes and resolution.
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
/// Ask for a pin's current mode and value.
pub const PIN_STATE_QUERY: u8 = 0x6D;
/// Reply with pin's current mode and value.
pub const PIN_STATE_RESPONSE: u8 = 0x6E;
/// Analog write (PWM, Servo, etc) to any pin.
pub const EXTENDED_ANALOG: u8 = 0x6F;
/// Set max angle, minPulse, maxPulse, freq.
pub const SERVO_CONFIG: u8 = 0x70;
/// A string message with 14-bits per char.
pub const STRING_DATA: u8 = 0x71;
/// Control a stepper motor.
pub const STEPPER_DATA: u8 = 0x72;
/// Send an I2C read/write request.
pub const I2C_REQUEST: u8 = 0x76;
/// A reply to an I2C read request.
pub const I2C_REPLY: u8 = 0x77;
/// Config I2C settings such as delay times and power pins.
pub const I2C_CONFIG: u8 = 0x78;
/// Report name and version of the firmware.
pub const REPORT_FIRMWARE: u8 = 0x79;
/// Set the poll rate of the main loop.
pub const SAMPLING_INTERVAL: u8 = 0x7A;

// ########################################
// Sub-command parameters

/// I2C write request.
pub const I2C_WRITE: u8 = 0x00;
/// I2C one-shot read request.
pub const I2C_READ: u8 = 0x08;
/// I2C continuous read request.
pub const I2C_READ_CONTINUOUSLY: u8 = 0x10;
/// Stop an I2C continuous read.
pub const I2C_STOP_READING: u8 = 0x18;
/// Restart transmission bit (no STOP between write and read).
pub const I2C_END_TX_MASK: u8 = 0x40;

/// Tone sub-command: play.
pub const TONE_TONE: u8 = 0x00;
/// Tone sub-command: stop.
pub const TONE_NO_TONE: u8 = 0x01;

/// Stepper sub-command: configure.
pub const STEPPER_CONFIGURE: u8 = 0x00;
/// Stepper sub-command: step.
pub const STEPPER_STEP: u8 = 0x01;

/// Vendor sub-message: infrared.
pub const VENDOR_IR: u8 = 0x00;
/// Vendor sub-message: neopixel strips.
pub const VENDOR_NEOPIXEL: u8 = 0x01;
/// Vendor sub-message: DS18B20 one-wire temperature sensor.
pub const VENDOR_DS18B20: u8 = 0x02;

/// Infrared: send a code.
pub const IR_SEND: u8 = 0x00;
/// Infrared: start decoding on a pin.
pub const IR_RECEIVE: u8 = 0x01;

/// Neopixel: configure a strip.
pub const NEOPIXEL_CONFIG: u8 = 0x00;
/// Neopixel: set a range of leds to one color.
pub const NEOPIXEL_SET_RANGE: u8 = 0x01;
/// Neopixel: rainbow on a range of leds.
pub const NEOPIXEL_RAINBOW: u8 = 0x03;
/// Neopixel: shift the strip content.
pub const NEOPIXEL_SHIFT: u8 = 0x04;
/// Neopixel: rotate the strip content.
pub const NEOPIXEL_ROTATE: u8 = 0x05;
/// Neopixel: bar graph.
pub const NEOPIXEL_BAR_GRAPH: u8 = 0x06;

/// DS18B20: start a conversion and report the temperature.
pub const DS18B20_READ: u8 = 0x01;

// ########################################
// Protocol parameters

/// Value reported in the analog mapping for a pin without analog capability.
pub const NO_ANALOG_CHANNEL: u8 = 0x7F;
/// Maximum number of sonar devices the firmware supports.
pub const MAX_SONARS: usize = 6;
/// Default sampling interval in milliseconds.
pub const DEFAULT_SAMPLING_INTERVAL: u16 = 19;
/// Default sonar echo timeout in microseconds.
pub const DEFAULT_SONAR_TIMEOUT: u32 = 80_000;
/// Default servo minimum pulse in microseconds.
pub const DEFAULT_SERVO_MIN_PULSE: u16 = 544;
/// Default servo maximum pulse in microseconds.
pub const DEFAULT_SERVO_MAX_PULSE: u16 = 2400;
