#![deny(rust_2018_idioms)]

pub mod cmts_config;
mod config;
pub mod logging;
pub mod policy;

pub use config::{parse_direction, Config};

use crossbeam_channel::{bounded, Receiver};
use log::error;

/// Fires once on Ctrl-C. If the handler cannot be installed the receiver disconnects
/// immediately, so waiting on it returns straight away.
pub fn shutdown_hook() -> Receiver<()> {
    let (tx, rx) = bounded(1);

    let set_handler_result = ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    });

    if let Err(error) = set_handler_result {
        error!("Failed to set shutdown hook: {error}");
    }

    rx
}
