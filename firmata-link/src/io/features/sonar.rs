//! HC-SR04 style ultrasonic sensors (FirmataExpress SONAR_CONFIG / SONAR_DATA).

use std::time::SystemTime;

use log::{trace, warn};

use crate::errors::HardwareError::{IncompatibleMode, TooManySonars};
use crate::errors::{Error, ProtocolError};
use crate::io::constants::*;
use crate::io::encoding::{decode_u14, encode_7bit};
use crate::io::handlers::ensure_length;
use crate::io::{FirmataClient, IoData, PinModeId, Sonar, SonarCallback, SonarReading};

impl FirmataClient {
    /// Configures a sonar, the board then reports its distance at every sampling interval.
    ///
    /// # Parameters
    /// * `timeout`: maximum echo wait, in microseconds ([`DEFAULT_SONAR_TIMEOUT`] is a sane
    ///   value). Only its 14 low bits reach the board.
    ///
    /// # Notes
    /// A trigger pin already configured is left as is. At most [`MAX_SONARS`] sonars can be
    /// active, further requests fail with `TooManySonars` and send nothing.
    pub fn set_pin_mode_sonar(
        &self,
        trigger: u8,
        echo: u8,
        callback: Option<SonarCallback>,
        timeout: u32,
    ) -> Result<(), Error> {
        let io = &self.connection.io;
        io.digital_pin(trigger)?;
        io.digital_pin(echo)?;
        {
            let mut sonars = io.sonars.write();
            if sonars.contains_key(&trigger) {
                warn!("Sonar already configured on pin {}, request ignored", trigger);
                return Ok(());
            }
            if sonars.len() >= MAX_SONARS {
                Err(TooManySonars { max: MAX_SONARS })?
            }
            sonars.insert(
                trigger,
                Sonar {
                    echo,
                    reading: None,
                    callback,
                },
            );
        }
        for pin in [trigger, echo] {
            io.update_digital_pin(pin, |instance| instance.configure(PinModeId::SONAR, 1.0, None))?;
        }

        let mut body = vec![trigger, echo];
        body.extend(encode_7bit(timeout, 2));
        self.send_sysex(SONAR_CONFIG, &body)
    }

    /// The last distance reported by the sonar on `trigger`, `None` before the first report.
    pub fn sonar_read(&self, trigger: u8) -> Result<Option<SonarReading>, Error> {
        match self.connection.io.sonars.read().get(&trigger) {
            Some(sonar) => Ok(sonar.reading),
            None => Err(IncompatibleMode {
                pin: trigger,
                mode: PinModeId::SONAR,
                context: "no sonar configured on this pin",
            }
            .into()),
        }
    }
}

/// SONAR_DATA: `[trigger, distance lsb, distance msb]`, the distance in centimeters.
///
/// The callback fires when the distance differs from the previous one.
pub fn sonar_data(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("sonar_data", data, 3)?;
    let reading = SonarReading {
        trigger: data[0],
        distance: decode_u14(data[1], data[2]),
        timestamp: SystemTime::now(),
    };
    trace!("Sonar {} distance: {}cm", reading.trigger, reading.distance);

    let callback = {
        let mut sonars = io.sonars.write();
        let sonar = sonars
            .get_mut(&reading.trigger)
            .ok_or(ProtocolError::UnexpectedData {
                operation: "sonar_data",
                info: format!("no sonar configured on pin {}", reading.trigger),
            })?;
        let previous = sonar.reading.map(|r| r.distance).unwrap_or(0);
        sonar.reading = Some(reading);
        match previous != reading.distance {
            true => sonar.callback.clone(),
            false => None,
        }
    };
    if let Some(callback) = callback {
        callback(reading);
    }
    Ok(())
}
