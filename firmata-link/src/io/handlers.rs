//! Decoders for the standard Firmata messages.
//!
//! Each handler receives the frame data as assembled by the reporter thread and updates the
//! shared [`IoData`]. Device specific messages (I2C, sonar, DHT, vendor) live next to their
//! outbound counterparts in [`crate::io::features`].

use log::{info, trace};

use crate::errors::{Error, ProtocolError};
use crate::io::encoding::{decode_7bit, decode_string, decode_u14};
use crate::io::{
    FirmwareVersion, IoData, PinCallback, PinMode, PinModeId, PinReport, PinState, PinValue,
    ProtocolVersion,
};

pub(crate) fn ensure_length(operation: &'static str, data: &[u8], expected: usize) -> Result<(), Error> {
    match data.len() < expected {
        true => Err(ProtocolError::MessageTooShort {
            operation,
            expected,
            received: data.len(),
        })?,
        false => Ok(()),
    }
}

/// Invokes the collected callbacks (no lock held anymore).
pub(crate) fn notify(reports: Vec<(PinCallback, PinReport)>) {
    for (callback, report) in reports {
        callback(report);
    }
}

/// REPORT_VERSION: `[major, minor]`
pub fn report_version(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("report_version", data, 2)?;
    let version = ProtocolVersion {
        major: data[0],
        minor: data[1],
    };
    trace!("Protocol version: {}", version);
    io.replies
        .publish(|slots| slots.protocol_version = Some(version));
    Ok(())
}

/// REPORT_FIRMWARE: `[major, minor, name as 14-bit chars...]`
pub fn report_firmware(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("report_firmware", data, 2)?;
    let firmware = FirmwareVersion {
        major: data[0],
        minor: data[1],
        name: decode_string(&data[2..]),
    };
    trace!("Firmware: {}", firmware);
    io.replies.publish(|slots| slots.firmware = Some(firmware));
    Ok(())
}

/// ANALOG_MESSAGE: `[channel, lsb, msb]`
///
/// The value is only stored (and the callback fired) when it differs from the stored one by
/// at least the pin differential.
pub fn analog_message(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("analog_message", data, 3)?;
    let value = decode_u14(data[1], data[2]);
    let report = io.update_analog_pin(data[0], |pin| match pin.exceeds_differential(value) {
        true => {
            pin.value = PinValue::Scalar(value);
            pin.report()
        }
        false => None,
    })?;
    notify(report.into_iter().collect());
    Ok(())
}

/// DIGITAL_MESSAGE: `[port, lsb, msb]`: the levels of the 8 pins of a port.
///
/// Pins driven by the host (output modes) are left untouched.
pub fn digital_message(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("digital_message", data, 3)?;
    let port = data[0] as usize;
    let levels = decode_u14(data[1], data[2]);

    let mut reports = vec![];
    {
        let mut pins = io.digital_pins.write();
        for pin in pins.iter_mut().skip(port * 8).take(8) {
            if pin.mode.is_output() {
                continue;
            }
            let value = (levels >> (pin.id as usize - port * 8)) & 0x01;
            if pin.exceeds_differential(value) {
                pin.value = PinValue::Scalar(value);
                reports.extend(pin.report());
            }
        }
    }
    notify(reports);
    Ok(())
}

/// CAPABILITY_RESPONSE: for each pin, `(mode, resolution)` pairs terminated by `0x7F`.
pub fn capability_response(io: &IoData, data: &[u8]) -> Result<(), Error> {
    let mut capabilities: Vec<Vec<PinMode>> = vec![];
    let mut modes: Vec<PinMode> = vec![];
    let mut bytes = data.iter();
    while let Some(byte) = bytes.next() {
        if *byte == 0x7F {
            capabilities.push(std::mem::take(&mut modes));
            continue;
        }
        let resolution = bytes.next().ok_or(ProtocolError::MessageTooShort {
            operation: "capability_response",
            expected: data.len() + 1,
            received: data.len(),
        })?;
        // Modes this crate does not know about are skipped.
        if let Ok(id) = PinModeId::from_u8(*byte) {
            modes.push(PinMode {
                id,
                resolution: *resolution,
            });
        }
    }

    {
        let mut pins = io.digital_pins.write();
        for (pin, modes) in pins.iter_mut().zip(capabilities.iter()) {
            pin.supported_modes = modes.clone();
        }
    }
    io.replies
        .publish(|slots| slots.capabilities = Some(capabilities));
    Ok(())
}

/// ANALOG_MAPPING_RESPONSE: one entry per digital pin, its analog channel or `0x7F`.
pub fn analog_mapping_response(io: &IoData, data: &[u8]) -> Result<(), Error> {
    let map = data.to_vec();
    io.replies.publish(|slots| slots.analog_map = Some(map));
    Ok(())
}

/// PIN_STATE_RESPONSE: `[pin, mode, state bits 0-6, state bits 7-13, ...]`
pub fn pin_state_response(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("pin_state_response", data, 3)?;
    let state = PinState {
        pin: data[0],
        mode: PinModeId::from_u8(data[1])?,
        value: decode_7bit(&data[2..]),
    };
    io.replies.publish(|slots| slots.pin_state = Some(state));
    Ok(())
}

/// STRING_DATA: a message sent by the firmware, 14-bit chars.
pub fn string_data(io: &IoData, data: &[u8]) -> Result<(), Error> {
    let message = decode_string(data);
    info!("Board message: {}", message);
    *io.last_string.write() = Some(message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn record_reports(reports: &Arc<Mutex<Vec<PinReport>>>) -> Option<PinCallback> {
        let reports = reports.clone();
        Some(Arc::new(move |report: PinReport| reports.lock().push(report)))
    }

    #[test]
    fn test_report_version() {
        let io = IoData::default();
        report_version(&io, &[0x02, 0x05]).unwrap();
        let version = io
            .replies
            .wait(Duration::ZERO, |slots| slots.protocol_version.take());
        assert_eq!(version, Some(ProtocolVersion { major: 2, minor: 5 }));
        assert!(report_version(&io, &[0x02]).is_err());
    }

    #[test]
    fn test_report_firmware() {
        let io = IoData::default();
        report_firmware(&io, &[0x02, 0x05, 0x41, 0x00, 0x42, 0x00]).unwrap();
        let firmware = io.replies.wait(Duration::ZERO, |slots| slots.firmware.take());
        assert_eq!(firmware.unwrap().to_string(), "2.5 AB");

        let result = report_firmware(&io, &[0x02]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Protocol error: Not enough bytes received - 'report_firmware' expected 2 bytes, 1 received."
        );
    }

    #[test]
    fn test_analog_message_differential() {
        let io = IoData::with_pins(20, 6);
        let reports = Arc::new(Mutex::new(vec![]));
        io.update_analog_pin(2, |pin| {
            pin.configure(PinModeId::ANALOG, 5.0, record_reports(&reports))
        })
        .unwrap();

        // 4 < 5: neither stored nor reported.
        analog_message(&io, &[0x02, 0x04, 0x00]).unwrap();
        assert_eq!(io.analog_pin(2).unwrap().value, PinValue::Scalar(0));
        assert!(reports.lock().is_empty());

        // 170 - 0 >= 5
        analog_message(&io, &[0x02, 0x2A, 0x01]).unwrap();
        assert_eq!(io.analog_pin(2).unwrap().value, PinValue::Scalar(170));
        // 173 - 170 < 5
        analog_message(&io, &[0x02, 0x2D, 0x01]).unwrap();
        assert_eq!(io.analog_pin(2).unwrap().value, PinValue::Scalar(170));

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].pin, 2);
        assert_eq!(reports[0].mode, PinModeId::ANALOG);
        assert_eq!(reports[0].value, PinValue::Scalar(170));
    }

    #[test]
    fn test_analog_message_unknown_channel() {
        let io = IoData::with_pins(20, 6);
        let result = analog_message(&io, &[0x0A, 0x01, 0x00]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Unknown pin 10."
        );
    }

    #[test]
    fn test_digital_message() {
        let io = IoData::with_pins(20, 6);
        let reports = Arc::new(Mutex::new(vec![]));
        io.update_digital_pin(9, |pin| {
            pin.configure(PinModeId::INPUT, 1.0, record_reports(&reports))
        })
        .unwrap();
        io.update_digital_pin(10, |pin| {
            pin.configure(PinModeId::OUTPUT, 1.0, None);
            pin.value = PinValue::Scalar(1);
        })
        .unwrap();

        // Port 1 (pins 8-15): pins 9 and 11 high, pin 10 low.
        digital_message(&io, &[0x01, 0b0000_1010, 0x00]).unwrap();
        assert_eq!(io.digital_pin(8).unwrap().value, PinValue::Scalar(0));
        assert_eq!(io.digital_pin(9).unwrap().value, PinValue::Scalar(1));
        assert_eq!(
            io.digital_pin(10).unwrap().value,
            PinValue::Scalar(1),
            "Output pin untouched"
        );
        assert_eq!(io.digital_pin(11).unwrap().value, PinValue::Scalar(1));
        assert_eq!(io.digital_pin(3).unwrap().value, PinValue::Scalar(0));

        // Same levels again: nothing changes, no new report.
        digital_message(&io, &[0x01, 0b0000_1010, 0x00]).unwrap();
        assert_eq!(reports.lock().len(), 1);
        assert_eq!(reports.lock()[0].pin, 9);

        // Ports beyond the board are ignored.
        assert!(digital_message(&io, &[0x0F, 0x7F, 0x01]).is_ok());
    }

    #[test]
    fn test_capability_response() {
        let io = IoData::with_pins(3, 1);
        capability_response(
            &io,
            &[
                0x7F, // pin 0: no mode
                0x00, 0x01, 0x01, 0x01, 0x7F, // pin 1: INPUT, OUTPUT
                0x02, 0x0A, 0x0E, 0x01, 0x7F, // pin 2: ANALOG (10 bits), unknown mode 0x0E
            ],
        )
        .unwrap();
        assert!(io.digital_pin(0).unwrap().supported_modes.is_empty());
        assert!(io
            .digital_pin(1)
            .unwrap()
            .supports_mode(PinModeId::OUTPUT)
            .is_some());
        let analog = io
            .digital_pin(2)
            .unwrap()
            .supports_mode(PinModeId::ANALOG)
            .unwrap();
        assert_eq!(analog.resolution, 10);

        let capabilities = io
            .replies
            .wait(Duration::ZERO, |slots| slots.capabilities.take())
            .unwrap();
        assert_eq!(capabilities.len(), 3);
        assert_eq!(capabilities[2].len(), 1);

        assert!(capability_response(&io, &[0x00, 0x01, 0x03]).is_err());
    }

    #[test]
    fn test_pin_state_response() {
        let io = IoData::default();
        pin_state_response(&io, &[0x0D, 0x01, 0x01]).unwrap();
        let state = io.replies.wait(Duration::ZERO, |slots| slots.pin_state.take());
        assert_eq!(
            state,
            Some(PinState {
                pin: 13,
                mode: PinModeId::OUTPUT,
                value: 1
            })
        );

        pin_state_response(&io, &[0x03, 0x03, 0x7F, 0x01]).unwrap();
        let state = io.replies.wait(Duration::ZERO, |slots| slots.pin_state.take());
        assert_eq!(state.unwrap().value, 255);
    }

    #[test]
    fn test_string_data() {
        let io = IoData::default();
        string_data(&io, &[0x4F, 0x00, 0x4B, 0x00]).unwrap();
        assert_eq!(io.last_string(), Some(String::from("OK")));
    }

    proptest::proptest! {
        #[test]
        fn prop_analog_differential_gating(
            first in 0u16..0x4000,
            second in 0u16..0x4000,
            differential in 1u16..200,
        ) {
            let io = IoData::with_pins(20, 6);
            let reports = Arc::new(Mutex::new(vec![]));
            io.update_analog_pin(0, |pin| {
                pin.configure(PinModeId::ANALOG, differential as f32, record_reports(&reports))
            })
            .unwrap();

            let [lsb, msb] = crate::io::encoding::encode_u14(first);
            analog_message(&io, &[0x00, lsb, msb]).unwrap();
            let stored = match first >= differential {
                true => first,
                false => 0,
            };
            proptest::prop_assert_eq!(io.analog_pin(0).unwrap().value, PinValue::Scalar(stored));

            let [lsb, msb] = crate::io::encoding::encode_u14(second);
            analog_message(&io, &[0x00, lsb, msb]).unwrap();
            let expected = match stored.abs_diff(second) >= differential {
                true => second,
                false => stored,
            };
            proptest::prop_assert_eq!(io.analog_pin(0).unwrap().value, PinValue::Scalar(expected));

            let fired = (first >= differential) as usize + (stored.abs_diff(second) >= differential) as usize;
            proptest::prop_assert_eq!(reports.lock().len(), fired);
        }
    }
}
