//! I2C over sysex: configuration, write and read requests, and the decoding of I2C_REPLY.

use log::trace;

use crate::errors::HardwareError::UnknownI2cDevice;
use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::{decode_pairs, encode_pairs, encode_u14};
use crate::io::handlers::ensure_length;
use crate::io::{FirmataClient, I2cCallback, I2cReply, IoData};

impl FirmataClient {
    /// Enables I2C on the board's default I2C pins. Must be called before any other I2C request.
    ///
    /// # Parameters
    /// * `read_delay`: delay (µs) between writing the register and reading the data, for slow
    ///   devices.
    pub fn set_pin_mode_i2c(&self, read_delay: u16) -> Result<(), Error> {
        self.send_sysex(I2C_CONFIG, &encode_u14(read_delay))
    }

    /// Writes `data` to the device at `address`.
    pub fn i2c_write(&self, address: u8, data: &[u8]) -> Result<(), Error> {
        let mut body = vec![address, I2C_WRITE];
        body.extend(encode_pairs(data));
        self.send_sysex(I2C_REQUEST, &body)
    }

    /// Reads `count` bytes from `register` once.
    ///
    /// # Returns
    /// With a callback, `None` right away: the reply goes to the callback. Without, the call
    /// blocks for the reply and returns `None` when none came within the query timeout.
    pub fn i2c_read(
        &self,
        address: u8,
        register: u16,
        count: u16,
        callback: Option<I2cCallback>,
    ) -> Result<Option<I2cReply>, Error> {
        self.i2c_read_request(address, register, count, I2C_READ, callback)
    }

    /// Asks the board to read `count` bytes from `register` at every sampling interval, until
    /// [`FirmataClient::i2c_stop_reading`]. Blocks for the first reply when no callback is given.
    pub fn i2c_read_continuous(
        &self,
        address: u8,
        register: u16,
        count: u16,
        callback: Option<I2cCallback>,
    ) -> Result<Option<I2cReply>, Error> {
        self.i2c_read_request(address, register, count, I2C_READ_CONTINUOUSLY, callback)
    }

    /// One shot read ending the transmission with a stop: required by some devices
    /// (MMA8452Q accelerometer).
    pub fn i2c_read_restart_transmission(
        &self,
        address: u8,
        register: u16,
        count: u16,
        callback: Option<I2cCallback>,
    ) -> Result<Option<I2cReply>, Error> {
        self.i2c_read_request(
            address,
            register,
            count,
            I2C_READ | I2C_END_TX_MASK,
            callback,
        )
    }

    /// Stops the continuous reading of the device at `address`.
    pub fn i2c_stop_reading(&self, address: u8) -> Result<(), Error> {
        self.send_sysex(I2C_REQUEST, &[address, I2C_STOP_READING])
    }

    /// The last reply received from the device at `address`.
    pub fn i2c_read_saved_data(&self, address: u8) -> Option<I2cReply> {
        self.connection
            .io
            .i2c_devices
            .read()
            .get(&address)
            .and_then(|device| device.last_reply.clone())
    }

    fn i2c_read_request(
        &self,
        address: u8,
        register: u16,
        count: u16,
        read_type: u8,
        callback: Option<I2cCallback>,
    ) -> Result<Option<I2cReply>, Error> {
        let blocking = callback.is_none();
        {
            let mut devices = self.connection.io.i2c_devices.write();
            // A read without callback takes the device back from any previous callback.
            devices.entry(address).or_default().callback = callback;
        }

        let mut body = vec![START_SYSEX, I2C_REQUEST, address, read_type];
        body.extend(encode_u14(register));
        body.extend(encode_u14(count));
        body.push(END_SYSEX);

        match blocking {
            true => self.query(
                &body,
                |slots| {
                    slots.i2c.remove(&address);
                },
                |slots| slots.i2c.remove(&address),
            ),
            false => {
                self.connection.send(&body)?;
                Ok(None)
            }
        }
    }
}

/// I2C_REPLY: `[address, register, data...]`, each as an `[lsb, msb]` pair.
///
/// Replies of unregistered devices are rejected. Without a callback, the reply is handed to the
/// pending blocking read.
pub fn i2c_reply(io: &IoData, data: &[u8]) -> Result<(), Error> {
    ensure_length("i2c_reply", data, 4)?;
    let values = decode_pairs(data);
    let reply = I2cReply {
        address: values[0] as u8,
        register: values[1],
        data: values[2..].to_vec(),
    };
    trace!("I2C reply: {:?}", reply);

    let callback = {
        let mut devices = io.i2c_devices.write();
        let device = devices
            .get_mut(&reply.address)
            .ok_or(UnknownI2cDevice {
                address: reply.address,
            })?;
        device.last_reply = Some(reply.clone());
        device.callback.clone()
    };

    match callback {
        Some(callback) => callback(reply),
        None => io.replies.publish(|slots| {
            slots.i2c.insert(reply.address, reply);
        }),
    }
    Ok(())
}
