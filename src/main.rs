use rollcall::{Application, utils::config::{Config, NodeConfig}};
use tokio::signal;
use tracing::{info, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn init_logging(node: &NodeConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&node.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    match &node.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rollcall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder.with_writer(writer).with_ansi(false).init();
            Some(guard)
        }
        None => {
            builder.init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&config.node);

    info!("Starting Rollcall v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Start the API server
    let server = app.start().map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;
    let handle = server.handle();

    info!("Application started successfully");

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("API server stopped with error: {}", e);
            }
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal"),
                Err(err) => error!("Failed to listen for shutdown signal: {}", err),
            }
            handle.stop(true).await;
        }
    }

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    info!("Application shutdown complete");
    Ok(())
}
