use anyhow::bail;
use clap::Parser;

use crate::config::{AppConfig, StoreBackend};

#[derive(Parser, Debug)]
#[command(name = "enhancement-tracker")]
#[command(about = "Enhancement request tracker API server")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Port to listen on (overrides configuration)")]
    pub port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides configuration)")]
    pub bind: Option<String>,

    #[arg(long, help = "Apply database migrations and exit")]
    pub migrate: bool,
}

impl Cli {
    /// Command-line flags win over environment and preset values
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
    }

    /// Reject flag combinations the selected store cannot honor
    pub fn check(&self, config: &AppConfig) -> anyhow::Result<()> {
        if self.migrate && config.store_backend == StoreBackend::Memory {
            bail!("--migrate requires STORE_BACKEND=postgres");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["enhancement-tracker", "--port", "8080", "--bind", "127.0.0.1"]);
        let mut config = AppConfig::from_env();
        cli.apply(&mut config);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert!(!cli.migrate);
    }

    #[test]
    fn migrate_needs_the_postgres_backend() {
        let cli = Cli::parse_from(["enhancement-tracker", "--migrate"]);
        let mut config = AppConfig::from_env();

        config.store_backend = StoreBackend::Memory;
        let err = cli.check(&config).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND=postgres"));

        config.store_backend = StoreBackend::Postgres;
        assert!(cli.check(&config).is_ok());
        assert!(Cli::parse_from(["enhancement-tracker"]).check(&config).is_ok());
    }
}
