//! DHT11 / DHT22 humidity and temperature sensors (FirmataExpress DHT_CONFIG / DHT_DATA).

use log::trace;

use crate::errors::HardwareError::IncompatibleMode;
use crate::errors::{Error, ProtocolError};
use crate::io::constants::*;
use crate::io::handlers::notify;
use crate::io::{
    DhtError, DhtSensor, DhtValue, FirmataClient, IoData, PinCallback, PinModeId, PinValue,
};

impl FirmataClient {
    /// Configures a DHT sensor on `pin`. The board then reports it at every sampling interval.
    ///
    /// The callback fires when the humidity or the temperature moves by at least
    /// `differential`. Configuring a pin already holding a DHT only updates its differential.
    pub fn set_pin_mode_dht(
        &self,
        pin: u8,
        sensor: DhtSensor,
        differential: f32,
        callback: Option<PinCallback>,
    ) -> Result<(), Error> {
        let configured = self.connection.io.update_digital_pin(pin, |instance| {
            match instance.mode == PinModeId::DHT {
                true => {
                    instance.differential = differential;
                    true
                }
                false => {
                    instance.configure(PinModeId::DHT, differential, callback);
                    instance.value = PinValue::default();
                    false
                }
            }
        })?;
        match configured {
            true => Ok(()),
            false => self.send_sysex(DHT_CONFIG, &[pin, sensor as u8]),
        }
    }

    /// The last measurement of the DHT on `pin`, `None` before the first report.
    ///
    /// A failed measurement is kept as [`DhtValue::Error`].
    pub fn dht_read(&self, pin: u8) -> Result<Option<DhtValue>, Error> {
        let instance = self.connection.io.digital_pin(pin)?;
        match instance.mode {
            PinModeId::DHT => Ok(match instance.value {
                PinValue::Dht(value) => Some(value),
                PinValue::Scalar(_) => None,
            }),
            _ => Err(IncompatibleMode {
                pin,
                mode: PinModeId::DHT,
                context: "try to read a DHT",
            }
            .into()),
        }
    }
}

/// Decodes the 4 data bytes of a measurement: `[d2, d3, d4, d5]`.
fn decode_measurement(sensor: u8, bytes: &[u8]) -> DhtValue {
    let [d2, d3, d4, d5] = [bytes[0], bytes[1], bytes[2], bytes[3]].map(f32::from);
    match sensor {
        22 => DhtValue::Reading {
            humidity: (d2 * 256.0 + d3) * 0.1,
            temperature: ((bytes[2] & 0x7F) as f32 * 256.0 + d5) * 0.1,
        },
        11 => DhtValue::Reading {
            humidity: d2 + d3 * 0.1,
            temperature: d4 + d5 * 0.1,
        },
        _ => DhtValue::Error(DhtError::Configuration),
    }
}

/// Tells whether `new` is worth a callback, compared to the stored value.
fn exceeds_differential(previous: &PinValue, new: &DhtValue, differential: f32) -> bool {
    match (previous, new) {
        (
            PinValue::Dht(DhtValue::Reading {
                humidity: h0,
                temperature: t0,
            }),
            DhtValue::Reading {
                humidity: h1,
                temperature: t1,
            },
        ) => (h1 - h0).abs() >= differential || (t1 - t0).abs() >= differential,
        (PinValue::Dht(previous), new) => previous != new,
        (PinValue::Scalar(_), _) => true,
    }
}

/// DHT_DATA: `[pin, sensor type, d2, d3, d4, d5, status]`
///
/// Status 1 is a timeout, 2 a checksum error. Failures are stored like readings so
/// [`FirmataClient::dht_read`] reports them.
pub fn dht_data(io: &IoData, data: &[u8]) -> Result<(), Error> {
    if data.len() != 7 {
        Err(ProtocolError::UnexpectedData {
            operation: "dht_data",
            info: format!("7 bytes expected, {} received", data.len()),
        })?
    }
    let pin = data[0];
    let value = match data[6] {
        0 => decode_measurement(data[1], &data[2..6]),
        1 => DhtValue::Error(DhtError::Timeout),
        2 => DhtValue::Error(DhtError::Checksum),
        _ => DhtValue::Error(DhtError::Configuration),
    };
    trace!("DHT {}: {:?}", pin, value);

    let report = io.update_digital_pin(pin, |instance| {
        if instance.mode != PinModeId::DHT {
            return Err(IncompatibleMode {
                pin,
                mode: PinModeId::DHT,
                context: "DHT data received",
            });
        }
        let changed = exceeds_differential(&instance.value, &value, instance.differential);
        instance.value = PinValue::Dht(value);
        Ok(match changed {
            true => instance.report(),
            false => None,
        })
    })??;
    notify(report.into_iter().collect());
    Ok(())
}
