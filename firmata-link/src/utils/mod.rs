//! Miscellaneous helpers shared across the crate.

mod signal;

pub use signal::RunSignal;

/// Formats a byte slice as `0xF0, 0x79, 0xF7` (used to trace the wire traffic).
pub fn format_as_hex(slice: &[u8]) -> String {
    slice
        .iter()
        .map(|byte| format!("0x{:02X}", byte))
        .collect::<Vec<String>>()
        .join(", ")
}

#[macro_export]
macro_rules! pause_sync {
    ($ms:expr) => {
        std::thread::sleep(std::time::Duration::from_millis($ms as u64))
    };
}
