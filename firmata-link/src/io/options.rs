use std::time::Duration;

use crate::io::constants::DEFAULT_SAMPLING_INTERVAL;

/// How the client reaches the board.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TransportOptions {
    /// Probe every USB serial port and keep the board answering with the expected instance id.
    #[default]
    Auto,
    /// A given serial port.
    Serial { port: String },
    /// A board behind a TCP bridge (Wi-Fi / Ethernet).
    Network { host: String, port: u16 },
}

/// What the reporter thread does with command bytes it has no handler for.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownCommandPolicy {
    /// Skip and count them.
    #[default]
    Permissive,
    /// Count them and close the connection: the stream is considered corrupted.
    Strict,
}

/// Connection settings of a [`FirmataClient`](crate::io::FirmataClient).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use firmata_link::io::Options;
///
/// let options = Options::serial("/dev/ttyACM0")
///     .instance_id(Some(2))
///     .reset_wait(Duration::from_secs(2));
/// assert_eq!(options.baud_rate, 115_200);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub transport: TransportOptions,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Identifier the board must answer to ARE_YOU_THERE with. `None` skips the identification
    /// on an explicit serial port, and accepts any board during auto-discovery.
    pub instance_id: Option<u8>,
    /// Time left to the board to reboot once the serial port has been opened.
    pub reset_wait: Duration,
    /// Maximum wait of a synchronous query.
    pub query_timeout: Duration,
    /// Sampling interval (ms) sent to the board once connected.
    pub sampling_interval: u16,
    pub unknown_commands: UnknownCommandPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            transport: TransportOptions::Auto,
            baud_rate: 115_200,
            instance_id: Some(1),
            reset_wait: Duration::from_secs(4),
            query_timeout: Duration::from_secs(4),
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            unknown_commands: UnknownCommandPolicy::Permissive,
        }
    }
}

impl Options {
    /// Serial auto-discovery.
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn serial<P: Into<String>>(port: P) -> Self {
        Self {
            transport: TransportOptions::Serial { port: port.into() },
            ..Self::default()
        }
    }

    pub fn network<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            transport: TransportOptions::Network {
                host: host.into(),
                port,
            },
            ..Self::default()
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn instance_id(mut self, instance_id: Option<u8>) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn reset_wait(mut self, reset_wait: Duration) -> Self {
        self.reset_wait = reset_wait;
        self
    }

    pub fn query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn sampling_interval(mut self, sampling_interval: u16) -> Self {
        self.sampling_interval = sampling_interval;
        self
    }

    pub fn unknown_commands(mut self, policy: UnknownCommandPolicy) -> Self {
        self.unknown_commands = policy;
        self
    }

    /// Loads options from a JSON document. Missing fields keep their default value.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, crate::errors::Error> {
        serde_json::from_str(json).map_err(|err| crate::errors::Error::Unknown {
            info: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert_eq!(options.transport, TransportOptions::Auto);
        assert_eq!(options.baud_rate, 115_200);
        assert_eq!(options.instance_id, Some(1));
        assert_eq!(options.reset_wait, Duration::from_secs(4));
        assert_eq!(options.query_timeout, Duration::from_secs(4));
        assert_eq!(options.sampling_interval, 19);
        assert_eq!(options.unknown_commands, UnknownCommandPolicy::Permissive);
    }

    #[test]
    fn test_builders() {
        let options = Options::network("192.168.1.20", 3030)
            .baud_rate(57_600)
            .instance_id(None)
            .query_timeout(Duration::from_millis(500))
            .sampling_interval(50)
            .unknown_commands(UnknownCommandPolicy::Strict);
        assert_eq!(
            options.transport,
            TransportOptions::Network {
                host: String::from("192.168.1.20"),
                port: 3030
            }
        );
        assert_eq!(options.baud_rate, 57_600);
        assert_eq!(options.instance_id, None);
        assert_eq!(options.query_timeout, Duration::from_millis(500));
        assert_eq!(options.sampling_interval, 50);
        assert_eq!(options.unknown_commands, UnknownCommandPolicy::Strict);

        let options = Options::serial("COM4");
        assert_eq!(
            options.transport,
            TransportOptions::Serial {
                port: String::from("COM4")
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json() {
        let options = Options::from_json(
            r#"{ "transport": { "Serial": { "port": "/dev/ttyUSB0" } }, "instance_id": 3 }"#,
        )
        .unwrap();
        assert_eq!(options.transport, Options::serial("/dev/ttyUSB0").transport);
        assert_eq!(options.instance_id, Some(3));
        assert_eq!(options.baud_rate, 115_200);

        assert!(Options::from_json("{ \"baud_rate\": \"fast\" }").is_err());
    }
}
