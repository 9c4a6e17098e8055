//! Vendor extension frames (VENDOR_MESSAGE sysex): infrared, DS18B20 and neopixel strips.
//!
//! Multi-byte values of these frames go most significant group first, except the inbound
//! infrared codes.

use std::time::SystemTime;

use log::{debug, trace};

use crate::errors::HardwareError::IncompatibleMode;
use crate::errors::{Error, ProtocolError};
use crate::io::constants::*;
use crate::io::encoding::{decode_7bit, encode_7bit_msb_first};
use crate::io::handlers::ensure_length;
use crate::io::{FirmataClient, IoData, IrCallback, IrCode, IrReceiver, PinModeId};

/// DS18B20 power-on value: no conversion has been performed yet.
const DS18B20_POWER_ON_VALUE: f32 = 85.0;

impl FirmataClient {
    fn send_vendor(&self, device: u8, data: &[u8]) -> Result<(), Error> {
        let mut body = Vec::with_capacity(data.len() + 1);
        body.push(device);
        body.extend_from_slice(data);
        self.send_sysex(VENDOR_MESSAGE, &body)
    }

    // ########################################
    // Infrared

    /// Starts decoding the infrared codes received on `pin`.
    ///
    /// Without a callback, codes are queued until read with [`FirmataClient::ir_read`].
    pub fn set_pin_mode_ir_recv(&self, pin: u8, callback: Option<IrCallback>) -> Result<(), Error> {
        self.connection.io.digital_pin(pin)?;
        self.connection.io.ir_receivers.write().insert(
            pin,
            IrReceiver {
                codes: Default::default(),
                callback,
            },
        );
        self.send_vendor(VENDOR_IR, &[IR_RECEIVE, pin])
    }

    /// Pops the oldest queued code of the receiver on `pin`.
    pub fn ir_read(&self, pin: u8) -> Result<Option<IrCode>, Error> {
        match self.connection.io.ir_receivers.write().get_mut(&pin) {
            Some(receiver) => Ok(receiver.codes.pop_front()),
            None => Err(IncompatibleMode {
                pin,
                mode: PinModeId::INPUT,
                context: "no infrared receiver on this pin",
            }
            .into()),
        }
    }

    /// Emits the infrared `code` on `pin`.
    pub fn ir_send(&self, pin: u8, code: u32) -> Result<(), Error> {
        let mut data = vec![IR_SEND, pin];
        data.extend(encode_7bit_msb_first(code, 5));
        self.send_vendor(VENDOR_IR, &data)
    }

    // ########################################
    // DS18B20

    /// Declares a DS18B20 temperature sensor on `pin`. Nothing is sent to the board.
    pub fn set_pin_mode_ds18b20(&self, pin: u8) -> Result<(), Error> {
        self.connection.io.digital_pin(pin)?;
        self.connection.io.ds18b20_sensors.write().insert(pin, None);
        Ok(())
    }

    /// Triggers a conversion on `pin` and waits for the temperature (°C).
    ///
    /// # Returns
    /// `None` on timeout, or when the sensor returned its power-on value.
    pub fn ds18b20_read(&self, pin: u8) -> Result<Option<f32>, Error> {
        if !self.connection.io.ds18b20_sensors.read().contains_key(&pin) {
            Err(IncompatibleMode {
                pin,
                mode: PinModeId::ONEWIRE,
                context: "no DS18B20 declared on this pin",
            })?
        }
        let request = [
            START_SYSEX,
            VENDOR_MESSAGE,
            VENDOR_DS18B20,
            DS18B20_READ,
            pin,
            END_SYSEX,
        ];
        let temperature = self.query(
            &request,
            |slots| {
                slots.ds18b20.remove(&pin);
            },
            |slots| slots.ds18b20.remove(&pin),
        )?;
        Ok(temperature.filter(|value| *value != DS18B20_POWER_ON_VALUE))
    }

    // ########################################
    // Neopixel

    /// Declares a strip of `count` pixels on `pin`.
    pub fn neopixel_config(&self, pin: u8, count: u16) -> Result<(), Error> {
        let mut data = vec![NEOPIXEL_CONFIG, pin];
        data.extend(encode_7bit_msb_first(count as u32, 2));
        self.send_vendor(VENDOR_NEOPIXEL, &data)
    }

    /// Sets the pixel `index` to `color` (0xRRGGBB).
    pub fn neopixel_write(&self, pin: u8, index: u16, color: u32) -> Result<(), Error> {
        self.neopixel_set_range_color(pin, index, index, color)
    }

    /// Sets the pixels `start..=end` to `color` (0xRRGGBB).
    pub fn neopixel_set_range_color(
        &self,
        pin: u8,
        start: u16,
        end: u16,
        color: u32,
    ) -> Result<(), Error> {
        let mut data = vec![NEOPIXEL_SET_RANGE, pin];
        data.extend(encode_7bit_msb_first(start as u32, 2));
        data.extend(encode_7bit_msb_first(end as u32, 2));
        data.extend(encode_7bit_msb_first(color, 4));
        self.send_vendor(VENDOR_NEOPIXEL, &data)
    }

    /// Spreads the hues `hsv_start..hsv_end` over the pixels `start..=end`.
    pub fn neopixel_set_rainbow(
        &self,
        pin: u8,
        start: u16,
        end: u16,
        hsv_start: u32,
        hsv_end: u32,
    ) -> Result<(), Error> {
        let mut data = vec![NEOPIXEL_RAINBOW, pin];
        data.extend(encode_7bit_msb_first(start as u32, 2));
        data.extend(encode_7bit_msb_first(end as u32, 2));
        data.extend(encode_7bit_msb_first(hsv_start, 4));
        data.extend(encode_7bit_msb_first(hsv_end, 4));
        self.send_vendor(VENDOR_NEOPIXEL, &data)
    }

    /// Shifts the strip content by `count` pixels, the freed pixels are turned off.
    pub fn neopixel_shift(&self, pin: u8, count: u8) -> Result<(), Error> {
        self.send_vendor(VENDOR_NEOPIXEL, &[NEOPIXEL_SHIFT, pin, count & 0x7F])
    }

    /// Rotates the strip content by `count` pixels.
    pub fn neopixel_rotate(&self, pin: u8, count: u8) -> Result<(), Error> {
        self.send_vendor(VENDOR_NEOPIXEL, &[NEOPIXEL_ROTATE, pin, count & 0x7F])
    }

    /// Lights the `numerator / denominator` fraction of the pixels `start..=end`.
    pub fn neopixel_bar_graph(
        &self,
        pin: u8,
        start: u16,
        end: u16,
        numerator: u8,
        denominator: u8,
    ) -> Result<(), Error> {
        let mut data = vec![NEOPIXEL_BAR_GRAPH, pin];
        data.extend(encode_7bit_msb_first(start as u32, 2));
        data.extend(encode_7bit_msb_first(end as u32, 2));
        data.extend([numerator & 0x7F, denominator & 0x7F]);
        self.send_vendor(VENDOR_NEOPIXEL, &data)
    }
}

/// VENDOR_MESSAGE: `[device, pin, payload...]`
///
/// * infrared: the code as 5 groups, least significant first.
/// * DS18B20: `[lsb, msb]` of the raw reading, in 1/16 °C.
pub fn vendor_message(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("vendor_message", data, 2)?;
    let pin = data[1];
    match data[0] {
        VENDOR_IR => {
            ensure_length("vendor_message", data, 7)?;
            let code = IrCode {
                pin,
                code: decode_7bit(&data[2..7]),
                timestamp: SystemTime::now(),
            };
            trace!("IR code on pin {}: {:#X}", pin, code.code);
            let callback = {
                let mut receivers = io.ir_receivers.write();
                let receiver = receivers
                    .get_mut(&pin)
                    .ok_or(ProtocolError::UnexpectedData {
                        operation: "vendor_message",
                        info: format!("no infrared receiver on pin {}", pin),
                    })?;
                if receiver.callback.is_none() {
                    receiver.codes.push_back(code);
                }
                receiver.callback.clone()
            };
            if let Some(callback) = callback {
                callback(code);
            }
        }
        VENDOR_DS18B20 => {
            ensure_length("vendor_message", data, 4)?;
            let raw = ((data[3] as u16) << 8) | data[2] as u16;
            let temperature = raw as f32 / 16.0;
            trace!("DS18B20 on pin {}: {}°C", pin, temperature);
            {
                let mut sensors = io.ds18b20_sensors.write();
                let sensor = sensors.get_mut(&pin).ok_or(ProtocolError::UnexpectedData {
                    operation: "vendor_message",
                    info: format!("no DS18B20 declared on pin {}", pin),
                })?;
                *sensor = Some(temperature);
            }
            io.replies.publish(|slots| {
                slots.ds18b20.insert(pin, temperature);
            });
        }
        device => debug!("Vendor message for unhandled device 0x{:02X}", device),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::create_test_client;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_ir_receive_queue() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_ir_recv(2, None).unwrap();
        assert_eq!(transport.written(), vec![0xF0, 0x0D, 0x00, 0x01, 0x02, 0xF7]);
        assert_eq!(client.ir_read(2).unwrap(), None);

        // 0xFFA25D then 0x10
        transport.feed(&[0xF0, 0x0D, 0x00, 0x02, 0x5D, 0x44, 0x7E, 0x07, 0x00, 0xF7]);
        transport.feed(&[0xF0, 0x0D, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00, 0x00, 0xF7]);
        let deadline = Instant::now() + Duration::from_secs(2);
        while client.io().ir_receivers.read()[&2].codes.len() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(client.ir_read(2).unwrap().unwrap().code, 0xFFA25D);
        assert_eq!(client.ir_read(2).unwrap().unwrap().code, 0x10);
        assert_eq!(client.ir_read(2).unwrap(), None);
        assert!(client.ir_read(3).is_err());
    }

    #[test]
    fn test_ir_receive_callback() {
        let io = IoData::with_pins(20, 6);
        let codes = Arc::new(Mutex::new(vec![]));
        let callback: IrCallback = {
            let codes = codes.clone();
            Arc::new(move |code: IrCode| codes.lock().push(code.code))
        };
        io.ir_receivers.write().insert(
            4,
            IrReceiver {
                codes: Default::default(),
                callback: Some(callback),
            },
        );
        vendor_message(&io, &[0x00, 0x04, 0x01, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(*codes.lock(), vec![0x81]);
        assert!(io.ir_receivers.read()[&4].codes.is_empty());

        assert!(vendor_message(&io, &[0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00]).is_err());
        assert!(vendor_message(&io, &[0x00, 0x04, 0x01]).is_err());
    }

    #[test]
    fn test_ir_send() {
        let (client, transport) = create_test_client();
        client.ir_send(3, 0xFFA25D).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x0D, 0x00, 0x00, 0x03, 0x00, 0x07, 0x7E, 0x44, 0x5D, 0xF7]
        );
    }

    #[test]
    fn test_ds18b20_read() {
        let (client, transport) = create_test_client();
        assert!(client.ds18b20_read(7).is_err(), "Not declared");
        client.set_pin_mode_ds18b20(7).unwrap();
        assert!(transport.written().is_empty());

        // 0x0111 / 16 = 17.0625
        let _ = transport.clone().reply_to(
            &[0xF0, 0x0D, 0x02, 0x01, 0x07, 0xF7],
            &[0xF0, 0x0D, 0x02, 0x07, 0x11, 0x01, 0xF7],
        );
        assert_eq!(client.ds18b20_read(7).unwrap(), Some(17.0625));
        assert_eq!(client.io().ds18b20_sensors.read()[&7], Some(17.0625));
    }

    #[test]
    fn test_ds18b20_power_on_value() {
        let io = IoData::with_pins(20, 6);
        io.ds18b20_sensors.write().insert(7, None);
        // 85 * 16 = 0x0550
        vendor_message(&io, &[0x02, 0x07, 0x50, 0x05]).unwrap();
        let value = io
            .replies
            .wait(Duration::ZERO, |slots| slots.ds18b20.remove(&7));
        assert_eq!(value, Some(DS18B20_POWER_ON_VALUE));
        assert!(vendor_message(&io, &[0x02, 0x08, 0x50, 0x05]).is_err());
        assert!(vendor_message(&io, &[0x7E, 0x08]).is_ok(), "Unhandled device");
    }

    #[test]
    fn test_ds18b20_timeout() {
        let (client, _) = create_test_client();
        client.set_pin_mode_ds18b20(7).unwrap();
        assert_eq!(client.ds18b20_read(7).unwrap(), None);
    }

    #[test]
    fn test_neopixel() {
        let (client, transport) = create_test_client();
        client.neopixel_config(6, 200).unwrap();
        client.neopixel_write(6, 3, 0xFF0000).unwrap();
        client.neopixel_set_range_color(6, 0, 130, 0x00FF00).unwrap();
        assert_eq!(
            transport.written(),
            vec![
                0xF0, 0x0D, 0x01, 0x00, 0x06, 0x01, 0x48, 0xF7, // 200 pixels
                0xF0, 0x0D, 0x01, 0x01, 0x06, 0x00, 0x03, 0x00, 0x03, 0x07, 0x7C, 0x00, 0x00,
                0xF7, // pixel 3 red
                0xF0, 0x0D, 0x01, 0x01, 0x06, 0x00, 0x00, 0x01, 0x02, 0x00, 0x03, 0x7E, 0x00,
                0xF7, // 0..=130 green
            ]
        );
    }

    #[test]
    fn test_neopixel_effects() {
        let (client, transport) = create_test_client();
        client.neopixel_set_rainbow(6, 0, 7, 0, 0xFFFF).unwrap();
        client.neopixel_shift(6, 2).unwrap();
        client.neopixel_rotate(6, 1).unwrap();
        client.neopixel_bar_graph(6, 0, 9, 3, 4).unwrap();
        assert_eq!(
            transport.written(),
            vec![
                0xF0, 0x0D, 0x01, 0x03, 0x06, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x03, 0x7F, 0x7F, 0xF7, // rainbow
                0xF0, 0x0D, 0x01, 0x04, 0x06, 0x02, 0xF7, // shift
                0xF0, 0x0D, 0x01, 0x05, 0x06, 0x01, 0xF7, // rotate
                0xF0, 0x0D, 0x01, 0x06, 0x06, 0x00, 0x00, 0x00, 0x09, 0x03, 0x04, 0xF7, // bar graph
            ]
        );
    }
}
