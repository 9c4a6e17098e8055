use crate::errors::HardwareError::InvalidStepperPins;
use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::{encode_7bit, encode_u14};
use crate::io::features::pins::check_mode;
use crate::io::{FirmataClient, PinModeId};

impl FirmataClient {
    /// Configures the (single) stepper motor driven by 2 or 4 `pins`.
    pub fn set_pin_mode_stepper(&self, steps_per_revolution: u16, pins: &[u8]) -> Result<(), Error> {
        if pins.len() != 2 && pins.len() != 4 {
            Err(InvalidStepperPins { count: pins.len() })?
        }
        for pin in pins {
            self.connection.io.update_digital_pin(*pin, |instance| {
                check_mode(instance, PinModeId::STEPPER, "try to set stepper")?;
                instance.configure(PinModeId::STEPPER, 1.0, None);
                Ok::<(), Error>(())
            })??;
        }

        let mut body = vec![STEPPER_CONFIGURE];
        body.extend(encode_u14(steps_per_revolution));
        body.extend_from_slice(pins);
        self.send_sysex(STEPPER_DATA, &body)
    }

    /// Moves the stepper by `steps` (negative: reverse) at `speed`.
    ///
    /// The frame carries 21 bits of speed and 14 bits of steps: larger values are clamped to
    /// 0x1FFFFF and 16383.
    pub fn stepper_write(&self, speed: u32, steps: i32) -> Result<(), Error> {
        let direction = u8::from(steps > 0);
        let mut body = vec![STEPPER_STEP];
        body.extend(encode_7bit(speed.min(0x1F_FFFF), 3));
        body.extend(encode_7bit(steps.unsigned_abs().min(0x3FFF), 2));
        body.push(direction);
        self.send_sysex(STEPPER_DATA, &body)
    }
}

#[cfg(test)]
mod tests {
    use crate::io::PinModeId;
    use crate::mocks::create_test_client;

    #[test]
    fn test_set_pin_mode_stepper() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_stepper(512, &[8, 9, 10, 11]).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x72, 0x00, 0x00, 0x04, 0x08, 0x09, 0x0A, 0x0B, 0xF7]
        );
        assert_eq!(client.io().digital_pin(9).unwrap().mode, PinModeId::STEPPER);
    }

    #[test]
    fn test_set_pin_mode_stepper_pin_count() {
        let (client, transport) = create_test_client();
        let result = client.set_pin_mode_stepper(200, &[8, 9, 10]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Stepper motors require 2 or 4 pins (3 given)."
        );
        assert!(transport.written().is_empty());
        assert!(client.set_pin_mode_stepper(200, &[8, 66]).is_err());
    }

    #[test]
    fn test_stepper_write() {
        let (client, transport) = create_test_client();
        client.stepper_write(20000, 300).unwrap();
        client.stepper_write(100, -5).unwrap();
        assert_eq!(
            transport.written(),
            vec![
                0xF0, 0x72, 0x01, 0x20, 0x1C, 0x01, 0x2C, 0x02, 0x01, 0xF7, // forward
                0xF0, 0x72, 0x01, 0x64, 0x00, 0x00, 0x05, 0x00, 0x00, 0xF7, // reverse
            ]
        );
    }

    #[test]
    fn test_stepper_write_clamped() {
        let (client, transport) = create_test_client();
        client.stepper_write(0x20_0005, -20000).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x72, 0x01, 0x7F, 0x7F, 0x7F, 0x7F, 0x7F, 0x00, 0xF7]
        );
    }
}
