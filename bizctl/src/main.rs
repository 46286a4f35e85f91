use anyhow::Context;
use bizctl::{Application, Config, config::Args, telemetry};
use clap::Parser;
use tokio::signal;

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable, only Ctrl+C will stop the server: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Ctrl+C handler failed: {e}");
            }
            "Ctrl+C"
        },
        _ = terminate => "SIGTERM",
    };
    tracing::info!("Received {signal_name}, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // sqlx and the OTLP exporter both reach for the process-wide rustls provider
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("a rustls crypto provider was already installed"))?;

    let args = Args::parse();
    let config = Config::load(&args).with_context(|| format!("invalid configuration in {}", args.config))?;

    if args.validate {
        println!(
            "{}: ok, would listen on {}:{} with models from {}",
            args.config,
            config.host,
            config.port,
            config.inference.models_dir.display()
        );
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::info!(config = %args.config, "Starting bizctl on {}:{}", config.host, config.port);

    let app = Application::new(config).await?;
    app.serve(shutdown_signal()).await
}
