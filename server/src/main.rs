//! CMTS emulator: answers PCMM gate requests from policy servers.

use common::{constants::PCMM_CLIENT_TYPE, messages::cops::Handle};
use io::{Connection, CopsServer, ShutdownSignal, WorkerPool};
use log::{error, info};
use peer::{
    cmts::{CmtsConfig, CmtsProcessor},
    pep_handler::PepHandler,
    session::PepSession,
};
use server::{cmts_config::CmtsFile, logging, shutdown_hook, Config};
use std::{net::TcpStream, sync::Arc};

fn main() {
    let config = match Config::get_or_try_init() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to initialize config: {error}");
            return;
        }
    };

    if let Err(error) = logging::init_logger("server") {
        eprintln!("Failed to initialize logger: {error}");
        return;
    }

    run(config);

    logging::cleanup();
    println!();
}

fn run(config: &'static Config) {
    let file = match CmtsFile::load(&config.cmts_config) {
        Ok(file) => file,
        Err(error) => {
            error!("Failed to load gate tables: {error:#}");
            return;
        }
    };
    let port = match file.port {
        0 => config.cops_port,
        port => port,
    };
    let cmts = Arc::new(file.to_config());
    info!(
        "{} upstream and {} downstream service classes, {} cable modems",
        cmts.upstream_service_classes.len(),
        cmts.downstream_service_classes.len(),
        cmts.cm_status.len()
    );

    let pool = match WorkerPool::new(config.worker_pool_size) {
        Ok(pool) => pool,
        Err(error) => {
            error!("Failed to start worker pool: {error}");
            return;
        }
    };

    info!("Starting CMTS...");
    let mut server = match CopsServer::bind(("0.0.0.0", port), pool, move |stream, shutdown| {
        run_session(stream, shutdown, &cmts)
    }) {
        Ok(server) => server,
        Err(error) => {
            error!("Failed to listen on port {port}: {error}");
            return;
        }
    };

    let _ = shutdown_hook().recv();

    info!("Shutting down...");
    server.stop();
    info!("CMTS stopped.");
}

fn run_session(stream: TcpStream, shutdown: ShutdownSignal, cmts: &Arc<CmtsConfig>) {
    let connection = match Connection::new(stream, Config::get().read_timeout) {
        Ok(connection) => connection,
        Err(error) => {
            error!("Failed to set up connection: {error}");
            return;
        }
    };

    let peer = connection.peer_addr();
    let pep_id = match connection.local_addr() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => "CMTS".to_owned(),
    };
    let handler = PepHandler::new(
        PCMM_CLIENT_TYPE,
        pep_id.as_str(),
        CmtsProcessor::new(Arc::clone(cmts)),
    );
    let handle = Handle::new(format!("{peer}").as_str());

    info!("policy server {} connected", peer);
    let end = PepSession::new(connection, handler, shutdown, handle).run();
    info!("policy server {} done: {:?}", peer, end);
}
