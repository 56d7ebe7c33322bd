#![warn(missing_docs)]

//! navguard
//!
//! Strips navigation-redirect assignments from untrusted JavaScript, either
//! as an HTTP service (default) or once over a file or stdin.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use navguard_config::{NavguardConfig, SanitizerOverrides, ServerOverrides};
use navguard_sanitizer::{
    FailSafePolicy, LocationPropertyPolicy, Outcome, Sanitizer, SanitizerConfig,
};
use navguard_server::{SanitizeService, ServiceConfig, DEFAULT_BIND};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Build SanitizerConfig from config overrides.
fn build_sanitizer_config(overrides: &SanitizerOverrides) -> SanitizerConfig {
    let mut config = SanitizerConfig::default();
    if let Some(ref policy) = overrides.fail_safe {
        config.fail_safe = match policy.as_str() {
            "passthrough" => FailSafePolicy::Passthrough,
            _ => FailSafePolicy::Reject,
        };
    }
    if let Some(ref policy) = overrides.location_properties {
        config.location_properties = match policy.as_str() {
            "href_only" => LocationPropertyPolicy::HrefOnly,
            _ => LocationPropertyPolicy::AnyProperty,
        };
    }
    if let Some(ref globals) = overrides.navigation_globals {
        config.navigation_globals = globals.clone();
    }
    if let Some(depth) = overrides.max_nesting_depth {
        config.max_nesting_depth = depth;
    }
    if let Some(depth) = overrides.max_syntax_depth {
        config.max_syntax_depth = depth;
    }
    config
}

/// Build ServiceConfig from config overrides.
fn build_service_config(overrides: &ServerOverrides) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    if let Some(max) = overrides.max_body_bytes {
        config.max_body_bytes = max;
    }
    if let Some(expose) = overrides.expose_metrics {
        config.expose_metrics = expose;
    }
    config
}

/// Resolve the listen address, falling back to the default port.
fn bind_addr(overrides: &ServerOverrides) -> Result<SocketAddr> {
    match overrides.bind_addr()? {
        Some(addr) => Ok(addr),
        None => DEFAULT_BIND
            .parse()
            .with_context(|| format!("invalid default bind address {DEFAULT_BIND}")),
    }
}

/// Find the config file.
///
/// Search order:
/// 1. `NAVGUARD_CONFIG` environment variable
/// 2. `./navguard.toml` in the current directory
/// 3. None (defaults apply)
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("NAVGUARD_CONFIG") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    let cwd = PathBuf::from("navguard.toml");
    if cwd.exists() {
        return Some(cwd);
    }

    None
}

fn load_config() -> Result<NavguardConfig> {
    match find_config_file() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            NavguardConfig::from_file_with_env(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => {
            tracing::info!("no config file found, using defaults");
            Ok(NavguardConfig::from_toml("")?)
        }
    }
}

/// navguard: strip navigation redirects from untrusted JavaScript.
///
/// Config is read from `$NAVGUARD_CONFIG` or `./navguard.toml`.
#[derive(Parser, Debug)]
#[command(name = "navguard")]
#[command(version)]
#[command(about = "Strip navigation redirects from untrusted JavaScript", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run the HTTP service (default)
    Serve,
    /// Sanitize one file, or stdin when FILE is omitted or `-`
    Sanitize {
        /// JavaScript file to read
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

impl Cli {
    fn into_command(self) -> Commands {
        match self.command {
            Some(Commands::Sanitize { input }) if input.as_deref() == Some(Path::new("-")) => {
                Commands::Sanitize { input: None }
            }
            Some(command) => command,
            None => Commands::Serve,
        }
    }
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("failed to read stdin")?;
            Ok(code)
        }
    }
}

async fn run_sanitize(config: &NavguardConfig, input: Option<&Path>) -> Result<()> {
    let code = read_input(input).await?;
    let sanitizer = Sanitizer::new(build_sanitizer_config(&config.sanitizer));
    let result = sanitizer.sanitize(&code);

    println!("{}", result.code);

    match result.outcome {
        Outcome::Rejected(err) => bail!("input rejected: {err}"),
        Outcome::Stripped { removed } => {
            tracing::info!(removed, "navigation redirects removed");
            Ok(())
        }
        Outcome::Clean => Ok(()),
    }
}

async fn run_server(config: &NavguardConfig) -> Result<()> {
    let addr = bind_addr(&config.server)?;
    let sanitizer = Sanitizer::new(build_sanitizer_config(&config.sanitizer));
    let service = SanitizeService::new(sanitizer, build_service_config(&config.server));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("received shutdown signal, stopping gracefully");
    };

    let (local_addr, serving) = service
        .bind(addr, shutdown)
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        addr = %local_addr,
        fail_safe = ?config.sanitizer.fail_safe,
        "navguard ready"
    );

    serving.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = Cli::parse().into_command();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;

    match command {
        Commands::Serve => run_server(&config).await,
        Commands::Sanitize { input } => run_sanitize(&config, input.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Result<Commands, clap::Error> {
        let argv = std::iter::once("navguard").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(Cli::into_command)
    }

    #[test]
    fn build_sanitizer_config_defaults() {
        let config = build_sanitizer_config(&SanitizerOverrides::default());
        assert_eq!(config.fail_safe, FailSafePolicy::Reject);
        assert_eq!(config.location_properties, LocationPropertyPolicy::AnyProperty);
        assert_eq!(config.navigation_globals, vec!["window".to_string()]);
        assert_eq!(
            config.max_nesting_depth,
            navguard_sanitizer::DEFAULT_MAX_NESTING_DEPTH
        );
        assert_eq!(
            config.max_syntax_depth,
            navguard_sanitizer::DEFAULT_MAX_SYNTAX_DEPTH
        );
    }

    #[test]
    fn build_sanitizer_config_applies_overrides() {
        let config = NavguardConfig::from_toml(
            r#"
            [sanitizer]
            fail_safe = "passthrough"
            location_properties = "href_only"
            navigation_globals = ["window", "self"]
            max_nesting_depth = 64
            max_syntax_depth = 512
            "#,
        )
        .unwrap();
        let sanitizer = build_sanitizer_config(&config.sanitizer);
        assert_eq!(sanitizer.fail_safe, FailSafePolicy::Passthrough);
        assert_eq!(sanitizer.location_properties, LocationPropertyPolicy::HrefOnly);
        assert_eq!(sanitizer.navigation_globals, vec!["window", "self"]);
        assert_eq!(sanitizer.max_nesting_depth, 64);
        assert_eq!(sanitizer.max_syntax_depth, 512);
    }

    #[test]
    fn build_service_config_applies_overrides() {
        let config = NavguardConfig::from_toml(
            r#"
            [server]
            max_body_bytes = 4096
            expose_metrics = true
            "#,
        )
        .unwrap();
        let service = build_service_config(&config.server);
        assert_eq!(service.max_body_bytes, 4096);
        assert!(service.expose_metrics);
    }

    #[test]
    fn bind_addr_defaults_to_port_3000() {
        let addr = bind_addr(&ServerOverrides::default()).unwrap();
        assert_eq!(addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());

        let overrides = ServerOverrides {
            bind: Some("0.0.0.0:8080".into()),
            ..ServerOverrides::default()
        };
        assert_eq!(bind_addr(&overrides).unwrap().port(), 8080);
    }

    #[test]
    fn cli_command_variants() {
        assert_eq!(command(&[]).unwrap(), Commands::Serve);
        assert_eq!(command(&["serve"]).unwrap(), Commands::Serve);
        assert_eq!(
            command(&["sanitize"]).unwrap(),
            Commands::Sanitize { input: None }
        );
        assert_eq!(
            command(&["sanitize", "-"]).unwrap(),
            Commands::Sanitize { input: None }
        );
        assert_eq!(
            command(&["sanitize", "page.js"]).unwrap(),
            Commands::Sanitize {
                input: Some(PathBuf::from("page.js"))
            }
        );
        assert!(command(&["sanitize", "a.js", "b.js"]).is_err());
        assert!(command(&["deploy"]).is_err());
    }

    #[test]
    fn cli_version_flag() {
        let err = command(&["--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        let err = command(&["-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn ver_cargo_pkg_version_matches_workspace() {
        assert_eq!(env!("CARGO_PKG_VERSION"), "0.1.0");
    }
}
