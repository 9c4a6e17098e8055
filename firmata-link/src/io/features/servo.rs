use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::encode_u14;
use crate::io::features::pins::check_mode;
use crate::io::{FirmataClient, PinModeId};

impl FirmataClient {
    /// Attaches a servo to `pin` with the given pulse range (µs).
    ///
    /// [`DEFAULT_SERVO_MIN_PULSE`] and [`DEFAULT_SERVO_MAX_PULSE`] suit most hobby servos.
    pub fn set_pin_mode_servo(&self, pin: u8, min_pulse: u16, max_pulse: u16) -> Result<(), Error> {
        self.connection.io.update_digital_pin(pin, |instance| {
            check_mode(instance, PinModeId::SERVO, "try to set servo")?;
            instance.configure(PinModeId::SERVO, 1.0, None);
            Ok::<(), Error>(())
        })??;

        let mut body = vec![pin];
        body.extend(encode_u14(min_pulse));
        body.extend(encode_u14(max_pulse));
        self.send_sysex(SERVO_CONFIG, &body)
    }

    /// Moves the servo on `pin` to `position`: an angle (0-180) or a pulse width (µs).
    pub fn servo_write(&self, pin: u8, position: u16) -> Result<(), Error> {
        self.analog_write(pin, position)
    }
}
