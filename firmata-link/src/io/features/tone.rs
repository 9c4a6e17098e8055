use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::encode_u14;
use crate::io::{FirmataClient, PinModeId};

impl FirmataClient {
    /// Sets `pin` to drive a piezo buzzer.
    pub fn set_pin_mode_tone(&self, pin: u8) -> Result<(), Error> {
        self.configure_pin(pin, PinModeId::TONE, 1.0, None)
    }

    /// Plays `frequency` (Hz) for `duration` (ms).
    ///
    /// Both travel as 14-bit values: anything above 16383 is clamped.
    pub fn play_tone(&self, pin: u8, frequency: u16, duration: u16) -> Result<(), Error> {
        let mut body = vec![TONE_TONE, pin];
        body.extend(encode_u14(frequency.min(0x3FFF)));
        body.extend(encode_u14(duration.min(0x3FFF)));
        self.send_sysex(TONE_DATA, &body)
    }

    /// Plays `frequency` (Hz) until [`FirmataClient::play_tone_off`].
    pub fn play_tone_continuously(&self, pin: u8, frequency: u16) -> Result<(), Error> {
        self.play_tone(pin, frequency, 0)
    }

    pub fn play_tone_off(&self, pin: u8) -> Result<(), Error> {
        self.send_sysex(TONE_DATA, &[TONE_NO_TONE, pin])
    }
}

#[cfg(test)]
mod tests {
    use crate::mocks::create_test_client;

    #[test]
    fn test_tone() {
        let (client, transport) = create_test_client();
        client.set_pin_mode_tone(3).unwrap();
        client.play_tone(3, 1000, 500).unwrap();
        client.play_tone_continuously(3, 440).unwrap();
        client.play_tone_off(3).unwrap();
        assert_eq!(
            transport.written(),
            vec![
                0xF4, 0x03, 0x0D, // pin mode
                0xF0, 0x5F, 0x00, 0x03, 0x68, 0x07, 0x74, 0x03, 0xF7, // 1000Hz, 500ms
                0xF0, 0x5F, 0x00, 0x03, 0x38, 0x03, 0x00, 0x00, 0xF7, // 440Hz
                0xF0, 0x5F, 0x01, 0x03, 0xF7, // off
            ]
        );
    }

    #[test]
    fn test_tone_clamped() {
        let (client, transport) = create_test_client();
        client.play_tone(3, 20000, u16::MAX).unwrap();
        assert_eq!(
            transport.written(),
            vec![0xF0, 0x5F, 0x00, 0x03, 0x7F, 0x7F, 0x7F, 0x7F, 0xF7]
        );
    }
}
