//! add_two_ints_server — service node entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (validates the log directives)
//!   3. Init logger at the configured level
//!   4. Start the service process (duplicate services abort startup)
//!   5. Attach transport adapters and spin until Ctrl-C or input closes
//!   6. Stop the process, draining in-flight calls, and exit

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use svcnode::process::bus::ServiceBus;
use svcnode::{AppError, ServiceProcess, config, logger, process};

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    };
    // The stdin reader sits on a blocking thread that cannot be cancelled;
    // dropping the runtime would wait on it until input closes.
    std::process::exit(code);
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    logger::init(&config.log_level)?;

    info!(
        node = %config.node_name,
        log_level = %config.log_level,
        queue_size = config.dispatch.queue_size,
        "config loaded"
    );

    let node = Arc::new(ServiceProcess::from_config(&config));
    node.start()?;

    let bus = ServiceBus::new(config.dispatch.queue_size);
    let shutdown = CancellationToken::new();

    #[cfg(feature = "adapter-stdio")]
    let _stdio = process::adapters::stdio::start(bus.handle(), shutdown.clone());

    // Without an adapter, keep the bus open until Ctrl-C.
    #[cfg(not(feature = "adapter-stdio"))]
    let _idle = bus.handle();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received");
            ctrl_c.cancel();
        }
    });

    process::run(Arc::clone(&node), bus, shutdown, config.dispatch.timeout).await;

    info!(node = %node.node(), state = %node.state(), "node exited");
    Ok(())
}
