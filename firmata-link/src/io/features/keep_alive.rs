use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::errors::Error;
use crate::io::constants::*;
use crate::io::encoding::encode_u14;
use crate::io::FirmataClient;
use crate::utils::RunSignal;

impl FirmataClient {
    /// Periodically sends KEEP_ALIVE: a FirmataExpress board resets itself when it misses one.
    ///
    /// # Parameters
    /// * `period`: seconds the board waits for the next keep-alive (0-10). 0 stops sending.
    /// * `margin`: seconds (0.1-0.9) the keep-alive is sent ahead of the period expiration.
    pub fn keep_alive(&self, period: u8, margin: f32) -> Result<(), Error> {
        self.stop_keep_alive();
        let period = period.min(10);
        if period == 0 {
            return Ok(());
        }
        let margin = margin.clamp(0.1, 0.9);
        let interval = Duration::from_secs_f32(period as f32 - margin);

        let signal = Arc::new(RunSignal::default());
        let handle = {
            let signal = signal.clone();
            let connection = self.connection.clone();
            let mut payload = vec![START_SYSEX, KEEP_ALIVE];
            payload.extend(encode_u14(period as u16));
            payload.push(END_SYSEX);
            thread::Builder::new()
                .name(String::from("firmata-keep-alive"))
                .spawn(move || {
                    debug!("Keep-alive started: every {:?}", interval);
                    while signal.is_running() {
                        if let Err(err) = connection.send(&payload) {
                            warn!("Keep-alive stopped: {}", err);
                            break;
                        }
                        signal.sleep(interval);
                    }
                })?
        };
        *self.keep_alive.lock() = Some((signal, handle));
        Ok(())
    }

    /// Stops the keep-alive thread, if any.
    pub(crate) fn stop_keep_alive(&self) {
        if let Some((signal, handle)) = self.keep_alive.lock().take() {
            signal.stop();
            if handle.join().is_err() {
                warn!("The keep-alive thread panicked");
            }
        }
    }
}
