//! Policy server emulator: connects to a CMTS, commits one gate, queries it and deletes it.

use common::constants::PCMM_CLIENT_TYPE;
use io::{Connection, ShutdownSignal};
use log::{error, info};
use peer::{pdp_handler::PdpHandler, session::PdpSession};
use server::{logging, policy::GateScript, shutdown_hook, Config};
use std::thread;

fn main() {
    let config = match Config::get_or_try_init() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to initialize config: {error}");
            return;
        }
    };

    if let Err(error) = logging::init_logger("policy_server") {
        eprintln!("Failed to initialize logger: {error}");
        return;
    }

    run(config);

    logging::cleanup();
}

fn run(config: &'static Config) {
    let subscriber = match config.pdp_subscriber {
        Some(subscriber) => subscriber,
        None => {
            error!("PDP_SUBSCRIBER must name the cable modem to open a gate for");
            return;
        }
    };
    let script = match GateScript::new(
        subscriber,
        &config.pdp_service_class,
        config.pdp_direction,
    ) {
        Ok(script) => script,
        Err(error) => {
            error!("Invalid gate: {error}");
            return;
        }
    };

    info!("Connecting to CMTS at {}...", config.cmts_address);
    let connection = match Connection::connect(config.cmts_address.as_str(), config.read_timeout)
    {
        Ok(connection) => connection,
        Err(error) => {
            error!("Failed to connect to {}: {error}", config.cmts_address);
            return;
        }
    };

    // Ctrl-C ends the session cooperatively
    let shutdown = ShutdownSignal::new();
    let hook = shutdown_hook();
    let _ = thread::Builder::new().name("shutdown-hook".into()).spawn({
        let shutdown = shutdown.clone();
        move || {
            if hook.recv().is_ok() {
                shutdown.trigger();
            }
        }
    });

    let handler = PdpHandler::new(PCMM_CLIENT_TYPE, config.ka_timer, config.acct_timer);
    let (end, script) = PdpSession::new(connection, handler, script, shutdown).run();

    info!("Session ended: {:?}, last step {:?}", end, script.step());
    for response in script.responses() {
        match response.error {
            Some(error) => info!(
                "{:?}: {} (subcode {:#06x})",
                response.command(),
                error.code.description(),
                error.subcode
            ),
            None => info!("{:?}: gate {:?}", response.command(), response.gate_id),
        }
    }
}
