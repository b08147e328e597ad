use clap::Parser;
use radius_auth::{
    Config, ConfigError, GatewayState, Orchestrator, ProxyType, RadiusClient, SessionStore, router,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// RADIUS forward-auth backend for nginx, Traefik and Caddy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-auth")]
struct Cli {
    /// JSON configuration file; replaces all other options when given
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// RADIUS server host name or IP address
    #[arg(long, env = "RADIUS_SERVER", default_value = "radius")]
    radius_server: String,

    /// RADIUS authentication port
    #[arg(long, env = "RADIUS_PORT", default_value_t = 1812)]
    radius_port: u16,

    /// Shared secret with the RADIUS server
    #[arg(long, env = "RADIUS_SECRET", default_value = "", hide_env_values = true, hide_default_value = true)]
    radius_secret: String,

    /// NAS-Identifier sent with every Access-Request
    #[arg(long, env = "RADIUS_NAS_IDENTIFIER", default_value = "auth-backend")]
    radius_nas_identifier: String,

    /// Hard deadline for one RADIUS exchange, in seconds
    #[arg(long, env = "RADIUS_TIMEOUT", default_value_t = 10)]
    radius_timeout: u64,

    /// Wait before resending an unanswered Access-Request, in seconds
    #[arg(long, env = "RADIUS_RETRY_INTERVAL", default_value_t = 3)]
    radius_retry_interval: u64,

    /// Number of times one Access-Request may be sent
    #[arg(long, env = "RADIUS_MAX_ATTEMPTS", default_value_t = 3)]
    radius_max_attempts: u8,

    /// Replies with a foreign identifier tolerated per exchange
    #[arg(long, env = "RADIUS_MAX_DISCARDED_REPLIES", default_value_t = 32)]
    radius_max_discarded_replies: usize,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TIMEOUT", default_value_t = 3600)]
    session_timeout: u64,

    /// Interval between expired-session sweeps, in seconds
    #[arg(long, env = "SESSION_SWEEP_INTERVAL", default_value_t = 300)]
    session_sweep_interval: u64,

    /// Reverse proxy in front of this service
    #[arg(long, env = "PROXY_TYPE", value_enum, default_value_t = ProxyType::Generic)]
    proxy_type: ProxyType,

    /// Name shown on the login page
    #[arg(long, env = "PROXY_NAME", default_value = "Auth")]
    proxy_name: String,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8999)]
    port: u16,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Validate configuration and exit (doesn't start the server)
    #[arg(long)]
    validate: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config, ConfigError> {
        if let Some(path) = &self.config {
            return Config::from_file(path);
        }

        let config = Config {
            radius_server: self.radius_server.clone(),
            radius_port: self.radius_port,
            radius_secret: self.radius_secret.clone(),
            radius_nas_identifier: self.radius_nas_identifier.clone(),
            radius_timeout: self.radius_timeout,
            radius_retry_interval: self.radius_retry_interval,
            radius_max_attempts: self.radius_max_attempts,
            radius_max_discarded_replies: self.radius_max_discarded_replies,
            session_timeout: self.session_timeout,
            session_sweep_interval: self.session_sweep_interval,
            proxy_type: self.proxy_type,
            proxy_name: self.proxy_name.clone(),
            port: self.port,
            log_level: Some(self.log_level.clone()),
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully");
        println!("  RADIUS server: {}:{}", config.radius_server, config.radius_port);
        println!("  NAS identifier: {}", config.radius_nas_identifier);
        println!("  Session timeout: {}s", config.session_timeout);
        println!("  Proxy: {} ({})", config.proxy_name, config.proxy_type);
        println!("  Listen: {}:{}", config.listen_address, config.port);
        process::exit(0);
    }

    let log_level = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        proxy_name = %config.proxy_name,
        proxy_type = %config.proxy_type,
        "Starting RADIUS auth backend"
    );
    info!(
        server = %config.radius_server,
        port = config.radius_port,
        nas_identifier = %config.radius_nas_identifier,
        timeout_secs = config.radius_timeout,
        "RADIUS backend configured"
    );

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();

    let sessions = Arc::new(SessionStore::new(config.session_timeout()));
    let sweeper = sessions.spawn_sweeper(config.sweep_interval(), shutdown.clone());

    let client = RadiusClient::new(config.client_config());
    let orchestrator = Orchestrator::new(Arc::new(client), Arc::clone(&sessions));
    let app = router(GatewayState::new(
        orchestrator,
        config.proxy_type,
        &config.proxy_name,
    ));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_discarded_replies_flag() {
        let cli = Cli::try_parse_from([
            "radius-auth",
            "--radius-secret",
            "testing123",
            "--radius-max-discarded-replies",
            "5",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.radius_max_discarded_replies, 5);
        assert_eq!(config.client_config().max_discarded_replies, 5);
    }
}
