use log::trace;

use crate::errors::HardwareError::{IncompatibleMode, UnknownPin};
use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::{encode_7bit, encode_u14};
use crate::io::{FirmataClient, Pin, PinCallback, PinModeId, PinValue};

/// REPORT_ANALOG carries the channel in its low nibble: channels above 15 cannot be reported.
fn report_analog_command(channel: u8) -> Result<u8, Error> {
    match channel < 16 {
        true => Ok(REPORT_ANALOG | channel),
        false => Err(UnknownPin { pin: channel }.into()),
    }
}

/// Rejects `mode` when the capability report of `pin` is known and does not list it.
pub(crate) fn check_mode(pin: &Pin, mode: PinModeId, context: &'static str) -> Result<(), Error> {
    match pin.supported_modes.is_empty() || pin.supports_mode(mode).is_some() {
        true => Ok(()),
        false => Err(IncompatibleMode {
            pin: pin.id,
            mode,
            context,
        }
        .into()),
    }
}

impl FirmataClient {
    // ########################################
    // Pin modes

    /// Sends SET_PIN_MODE for `pin`, without any reporting change.
    ///
    /// # Errors
    /// * `UnknownPin`: the board has no such pin.
    /// * `IncompatibleMode`: the capability report says the pin does not support `mode`.
    pub fn set_pin_mode(&self, pin: u8, mode: PinModeId) -> Result<(), Error> {
        self.configure_pin(pin, mode, 1.0, None)
    }

    /// Stores the new mode of a digital pin and sends SET_PIN_MODE.
    pub(crate) fn configure_pin(
        &self,
        pin: u8,
        mode: PinModeId,
        differential: f32,
        callback: Option<PinCallback>,
    ) -> Result<(), Error> {
        self.connection.io.update_digital_pin(pin, |instance| {
            check_mode(instance, mode, "try to set pin mode")?;
            instance.configure(mode, differential, callback);
            Ok::<(), Error>(())
        })??;
        self.connection.send(&[SET_PIN_MODE, pin, mode.into()])
    }

    /// Sets `pin` as a digital input and enables the reporting of its port.
    pub fn set_pin_mode_digital_input(
        &self,
        pin: u8,
        callback: Option<PinCallback>,
    ) -> Result<(), Error> {
        self.configure_pin(pin, PinModeId::INPUT, 1.0, callback)?;
        self.enable_digital_reporting(pin)
    }

    /// Sets `pin` as a digital input with the internal pull-up enabled, and enables the
    /// reporting of its port.
    pub fn set_pin_mode_digital_input_pullup(
        &self,
        pin: u8,
        callback: Option<PinCallback>,
    ) -> Result<(), Error> {
        self.configure_pin(pin, PinModeId::PULLUP, 1.0, callback)?;
        self.enable_digital_reporting(pin)
    }

    pub fn set_pin_mode_digital_output(&self, pin: u8) -> Result<(), Error> {
        self.configure_pin(pin, PinModeId::OUTPUT, 1.0, None)
    }

    pub fn set_pin_mode_pwm_output(&self, pin: u8) -> Result<(), Error> {
        self.configure_pin(pin, PinModeId::PWM, 1.0, None)
    }

    /// Sets the analog `channel` (A0 = 0) as an analog input and enables its reporting.
    ///
    /// The callback fires when the value moves by at least `differential`.
    pub fn set_pin_mode_analog_input(
        &self,
        channel: u8,
        differential: f32,
        callback: Option<PinCallback>,
    ) -> Result<(), Error> {
        report_analog_command(channel)?;
        let io = &self.connection.io;
        let pin = io.first_analog_pin() + channel;
        io.update_analog_pin(channel, |instance| {
            instance.configure(PinModeId::ANALOG, differential, callback)
        })?;
        io.update_digital_pin(pin, |instance| {
            check_mode(instance, PinModeId::ANALOG, "try to set analog input")?;
            instance.mode = PinModeId::ANALOG;
            Ok::<(), Error>(())
        })??;
        self.connection
            .send(&[SET_PIN_MODE, pin, PinModeId::ANALOG.into()])?;
        self.enable_analog_reporting(channel)
    }

    // ########################################
    // Write

    /// Sets the level of a digital output.
    ///
    /// Firmata drives digital outputs a port (8 pins) at a time: the port mask is updated and
    /// sent whole. Writers of the same port are serialized.
    pub fn digital_write(&self, pin: u8, level: bool) -> Result<(), Error> {
        let io = &self.connection.io;
        if pin as usize >= io.digital_pin_count() {
            Err(UnknownPin { pin })?
        }
        let port = pin / 8;
        let mut mask = io.port_mask(port)?;
        io.update_digital_pin(pin, |instance| {
            instance.value = PinValue::Scalar(u16::from(level))
        })?;
        match level {
            true => *mask |= 1 << (pin % 8),
            false => *mask &= !(1 << (pin % 8)),
        }
        trace!("Port {} mask: {:08b}", port, *mask);
        self.connection
            .send(&[DIGITAL_MESSAGE | port, *mask & 0x7F, *mask >> 7])
    }

    /// Sets the level of a single digital output (SET_DIGITAL_PIN_VALUE).
    pub fn digital_pin_write(&self, pin: u8, level: bool) -> Result<(), Error> {
        let io = &self.connection.io;
        if pin as usize >= io.digital_pin_count() {
            Err(UnknownPin { pin })?
        }
        let mut mask = io.port_mask(pin / 8)?;
        io.update_digital_pin(pin, |instance| {
            instance.value = PinValue::Scalar(u16::from(level))
        })?;
        match level {
            true => *mask |= 1 << (pin % 8),
            false => *mask &= !(1 << (pin % 8)),
        }
        self.connection
            .send(&[SET_DIGITAL_PIN_VALUE, pin, u8::from(level)])
    }

    /// Writes an analog (PWM, servo) value.
    ///
    /// Pins above 15 and values above 14 bits go through EXTENDED_ANALOG.
    pub fn analog_write(&self, pin: u8, value: u16) -> Result<(), Error> {
        self.connection
            .io
            .update_digital_pin(pin, |instance| instance.value = PinValue::Scalar(value))?;

        let payload = match pin > 15 || value > 0x3FFF {
            true => {
                let groups = match value > 0x3FFF {
                    true => 3,
                    false => 2,
                };
                let mut payload = vec![START_SYSEX, EXTENDED_ANALOG, pin];
                payload.extend(encode_7bit(value as u32, groups));
                payload.push(END_SYSEX);
                payload
            }
            false => {
                let [lsb, msb] = encode_u14(value);
                vec![ANALOG_MESSAGE | pin, lsb, msb]
            }
        };
        self.connection.send(&payload)
    }

    // ########################################
    // Read

    /// Last known level of a digital pin: reported by the board for inputs, written by the
    /// host for outputs.
    pub fn digital_read(&self, pin: u8) -> Result<u16, Error> {
        Ok(self
            .connection
            .io
            .digital_pin(pin)?
            .value
            .as_scalar()
            .unwrap_or_default())
    }

    /// Last value reported for the analog `channel`.
    pub fn analog_read(&self, channel: u8) -> Result<u16, Error> {
        Ok(self
            .connection
            .io
            .analog_pin(channel)?
            .value
            .as_scalar()
            .unwrap_or_default())
    }

    // ########################################
    // Reporting

    /// Enables the reporting of the port `pin` belongs to.
    pub fn enable_digital_reporting(&self, pin: u8) -> Result<(), Error> {
        self.connection
            .io
            .update_digital_pin(pin, |instance| instance.reporting = true)?;
        self.connection.send(&[REPORT_DIGITAL | (pin / 8), 1])
    }

    /// Disables the reporting of the port `pin` belongs to.
    pub fn disable_digital_reporting(&self, pin: u8) -> Result<(), Error> {
        let port = pin / 8;
        {
            let mut pins = self.connection.io.digital_pins.write();
            if pin as usize >= pins.len() {
                Err(UnknownPin { pin })?
            }
            for instance in pins.iter_mut().skip(port as usize * 8).take(8) {
                instance.reporting = false;
            }
        }
        self.connection.send(&[REPORT_DIGITAL | port, 0])
    }

    pub fn enable_analog_reporting(&self, channel: u8) -> Result<(), Error> {
        self.connection
            .io
            .update_analog_pin(channel, |instance| instance.reporting = true)?;
        self.connection.send(&[report_analog_command(channel)?, 1])
    }

    pub fn disable_analog_reporting(&self, channel: u8) -> Result<(), Error> {
        self.connection
            .io
            .update_analog_pin(channel, |instance| instance.reporting = false)?;
        self.connection.send(&[report_analog_command(channel)?, 0])
    }

    // ########################################
    // Board

    /// Sets the interval (ms) between two samplings of the analog inputs and I2C devices.
    pub fn set_sampling_interval(&self, interval: u16) -> Result<(), Error> {
        self.send_sysex(SAMPLING_INTERVAL, &encode_u14(interval))
    }

    /// Sends SYSTEM_RESET: the firmware resets its pins and stops every reporting.
    pub fn send_reset(&self) -> Result<(), Error> {
        self.connection.send(&[SYSTEM_RESET])
    }
}

#[cfg(test)]
mod tests {
    use crate::io::{PinModeId, PinReport, PinValue};
    use crate::mocks::create_test_client;
    use crate::utils::format_as_hex;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_set_pin_mode() {
        let (client, transport) = create_test_client();
        client.set_pin_mode(8, PinModeId::OUTPUT).unwrap();
        assert_eq!(transport.written(), vec![0xF4, 0x08, 0x01]);
        assert_eq!(client.io().digital_pin(8).unwrap().mode, PinModeId::OUTPUT);

        let result = client.set_pin_mode(66, PinModeId::OUTPUT);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Unknown pin 66."
        );
    }

    #[test]
    fn test_set_pin_mode_checks_capabilities() {
        let (client, transport) = create_test_client();
        client.get_capability_report().unwrap().unwrap();
        transport.clear_written();

        let result = client.set_pin_mode(8, PinModeId::SHIFT);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Pin (8) not compatible with mode (SHIFT) - try to set pin mode."
        );
        assert!(transport.written().is_empty(), "Nothing sent");
        assert!(client.set_pin_mode_pwm_output(9).is_ok());
    }

    #[test]
    fn test_set_pin_mode_digital_input() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_digital_input(10, None).unwrap();
        client.set_pin_mode_digital_input_pullup(2, None).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF4, 0x0A, 0x00, 0xD1, 0x01, 0xF4, 0x02, 0x0B, 0xD0, 0x01]
        );
        assert!(client.io().digital_pin(10).unwrap().reporting);
    }

    #[test]
    fn test_set_pin_mode_analog_input() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_analog_input(3, 2.0, None).unwrap();
        assert_eq!(transport.written(), vec![0xF4, 0x11, 0x02, 0xC3, 0x01]);

        let pin = client.io().analog_pin(3).unwrap();
        assert_eq!(pin.mode, PinModeId::ANALOG);
        assert_eq!(pin.differential, 2.0);
        assert!(pin.reporting);
        assert_eq!(client.io().digital_pin(17).unwrap().mode, PinModeId::ANALOG);

        assert!(client.set_pin_mode_analog_input(6, 1.0, None).is_err());
    }

    #[test]
    fn test_simple_analog_write() {
        let (client, transport) = create_test_client();
        client.analog_write(0, 170).unwrap();
        assert!(
            transport.written().starts_with(&[0xE0, 0x2A, 0x01]),
            "Buffer data has been sent [{:?}]",
            format_as_hex(&transport.written())
        );
        assert_eq!(client.io().digital_pin(0).unwrap().value, PinValue::Scalar(170));

        let result = client.analog_write(66, 0);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Unknown pin 66."
        );
    }

    #[test]
    fn test_extended_analog_write() {
        let (client, transport) = create_test_client();
        // Pin over 15 and value over 14 bits.
        client.analog_write(18, 17000).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x6F, 0x12, 0x68, 0x04, 0x01, 0xF7]
        );

        transport.clear_written();
        client.analog_write(16, 170).unwrap();
        assert_eq!(transport.written(), vec![0xF0, 0x6F, 0x10, 0x2A, 0x01, 0xF7]);
    }

    #[test]
    fn test_digital_write() {
        let (client, transport) = create_test_client();
        client.digital_write(13, true).unwrap();
        client.digital_write(9, true).unwrap();
        client.digital_write(13, false).unwrap();
        assert_eq!(
            transport.written(),
            vec![0x91, 0x20, 0x00, 0x91, 0x22, 0x00, 0x91, 0x02, 0x00]
        );

        client.digital_write(7, true).unwrap();
        assert!(transport.written().ends_with(&[0x90, 0x00, 0x01]));

        let result = client.digital_write(66, true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Unknown pin 66."
        );
    }

    #[test]
    fn test_digital_write_read_isolation() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_digital_input(10, None).unwrap();
        client.set_pin_mode_digital_output(12).unwrap();
        client.set_pin_mode_digital_output(13).unwrap();

        // Pin 10 high reported by the board.
        transport.feed(&[0x91, 0x04, 0x00]);
        wait_until(|| client.digital_read(10).unwrap() == 1);

        client.digital_write(13, true).unwrap();
        assert_eq!(client.digital_read(13).unwrap(), 1);
        assert_eq!(client.digital_read(12).unwrap(), 0, "Same port, not written");
        assert_eq!(client.digital_read(10).unwrap(), 1, "Input left untouched");

        // A port report never overrides the outputs.
        transport.feed(&[0x91, 0x00, 0x00]);
        wait_until(|| client.digital_read(10).unwrap() == 0);
        assert_eq!(client.digital_read(13).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_writes_on_one_port() {
        let (client, transport) = create_test_client();
        let client = Arc::new(client);
        let handles: Vec<_> = (8..14u8)
            .map(|pin| {
                let client = client.clone();
                std::thread::spawn(move || client.digital_write(pin, true).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(transport.written().ends_with(&[0x91, 0x3F, 0x00]));
        for pin in 8..14 {
            assert_eq!(client.digital_read(pin).unwrap(), 1);
        }
    }

    #[test]
    fn test_digital_pin_write() {
        let (client, transport) = create_test_client();
        client.digital_pin_write(5, true).unwrap();
        assert_eq!(transport.written(), vec![0xF5, 0x05, 0x01]);
        client.digital_write(4, true).unwrap();
        assert!(
            transport.written().ends_with(&[0x90, 0x30, 0x00]),
            "Port mask kept in sync"
        );
    }

    #[test]
    fn test_analog_callback_differential() {
        let (client, transport) = create_test_client();
        let reports = Arc::new(Mutex::new(vec![]));
        let callback = {
            let reports = reports.clone();
            Arc::new(move |report: PinReport| reports.lock().push(report))
        };
        client
            .set_pin_mode_analog_input(0, 5.0, Some(callback))
            .unwrap();

        // 3 (ignored), 10 (reported), 12 (ignored), 4 (reported)
        transport.feed(&[0xE0, 0x03, 0x00, 0xE0, 0x0A, 0x00, 0xE0, 0x0C, 0x00, 0xE0, 0x04, 0x00]);
        wait_until(|| reports.lock().len() == 2);
        std::thread::sleep(Duration::from_millis(20));

        let values: Vec<PinValue> = reports.lock().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![PinValue::Scalar(10), PinValue::Scalar(4)]);
        assert_eq!(client.analog_read(0).unwrap(), 4);
        assert_eq!(reports.lock()[0].mode, PinModeId::ANALOG);
    }

    #[test]
    fn test_reporting() {
        let (client, transport) = create_test_client();
        client.enable_digital_reporting(12).unwrap();
        client.disable_digital_reporting(12).unwrap();
        client.enable_analog_reporting(5).unwrap();
        client.disable_analog_reporting(5).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xD1, 0x01, 0xD1, 0x00, 0xC5, 0x01, 0xC5, 0x00]
        );
        assert!(!client.io().digital_pin(12).unwrap().reporting);
        assert!(client.enable_analog_reporting(9).is_err());
    }

    #[test]
    fn test_analog_reporting_above_channel_15() {
        let (client, transport) = create_test_client();
        // A board exposing 20 analog channels.
        let analog_map: Vec<u8> = (0..20).collect();
        client.io().init_pins(&analog_map);

        client.enable_analog_reporting(15).unwrap();
        assert_eq!(transport.written(), vec![0xCF, 0x01]);
        transport.clear_written();

        assert_eq!(
            client.enable_analog_reporting(16).unwrap_err().to_string(),
            "Hardware error: Unknown pin 16."
        );
        assert!(client.disable_analog_reporting(16).is_err());
        assert!(client.set_pin_mode_analog_input(17, 1.0, None).is_err());
        assert!(transport.written().is_empty(), "No REPORT_DIGITAL sent instead");
    }

    #[test]
    fn test_sampling_interval_and_reset() {
        let (client, transport) = create_test_client();
        client.set_sampling_interval(1000).unwrap();
        client.send_reset().unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x7A, 0x68, 0x07, 0xF7, 0xFF]
        );
    }
}
