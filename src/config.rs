//! Server Configuration
//!
//! The listen address comes from three layers, later ones winning:
//! built-in defaults, the `TIDEKV_HOST`/`TIDEKV_PORT` environment
//! variables, and command-line flags.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;

/// Environment variable overriding the bind address.
pub const ENV_HOST: &str = "TIDEKV_HOST";

/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "TIDEKV_PORT";

pub const HELP: &str = r#"
TideKV - An In-Memory Key-Value Store

USAGE:
    tidekv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 0.0.0.0, env: TIDEKV_HOST)
    -p, --port <PORT>    Port to listen on (default: 6379, env: TIDEKV_PORT)
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    tidekv                         # Start on 0.0.0.0:6379
    tidekv --port 6380             # Start on port 6380
    TIDEKV_HOST=127.0.0.1 tidekv   # Only accept local clients
"#;

/// Errors produced while assembling a [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port number '{0}'")]
    InvalidPort(String),

    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Config),
    Help,
    Version,
}

/// Listen address for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var(ENV_HOST).ok().as_deref(),
            std::env::var(ENV_PORT).ok().as_deref(),
        )
    }

    /// Defaults overlaid with explicit variable values. Unset or blank
    /// values keep the default.
    pub fn from_vars(host: Option<&str>, port: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let host = non_blank(host).map(str::to_string).unwrap_or(defaults.host);
        let port = match non_blank(port) {
            Some(raw) => parse_port(raw)?,
            None => defaults.port,
        };

        Ok(Self { host, port })
    }

    /// Applies command-line flags (without the program name) on top of `self`.
    ///
    /// `--help` and `--version` short-circuit; anything after them is
    /// ignored.
    pub fn apply_args<I>(mut self, args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    self.host = args.next().ok_or(ConfigError::MissingValue(arg))?;
                }
                "--port" | "-p" => {
                    let raw = args.next().ok_or(ConfigError::MissingValue(arg))?;
                    self.port = parse_port(&raw)?;
                }
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(Invocation::Run(self))
    }

    /// Returns the bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 6379);
        assert_eq!(config.bind_address(), "0.0.0.0:6379");
    }

    #[test]
    fn test_from_vars_unset() {
        assert_eq!(Config::from_vars(None, None), Ok(Config::default()));
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = Config::from_vars(Some("127.0.0.1"), Some("7000")).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:7000");
    }

    #[test]
    fn test_from_vars_blank_keeps_default() {
        let config = Config::from_vars(Some(""), Some("  ")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_vars_bad_port() {
        assert_eq!(
            Config::from_vars(None, Some("seventy")),
            Err(ConfigError::InvalidPort("seventy".to_string()))
        );
        assert_eq!(
            Config::from_vars(None, Some("70000")),
            Err(ConfigError::InvalidPort("70000".to_string()))
        );
    }

    #[test]
    fn test_args_override() {
        let invocation = Config::default()
            .apply_args(args(&["--host", "localhost", "-p", "6380"]))
            .unwrap();

        assert_eq!(
            invocation,
            Invocation::Run(Config {
                host: "localhost".to_string(),
                port: 6380,
            })
        );
    }

    #[test]
    fn test_args_win_over_env() {
        let env = Config::from_vars(Some("10.0.0.1"), Some("7000")).unwrap();
        let invocation = env.apply_args(args(&["-p", "7001"])).unwrap();

        assert_eq!(
            invocation,
            Invocation::Run(Config {
                host: "10.0.0.1".to_string(),
                port: 7001,
            })
        );
    }

    #[test]
    fn test_no_args() {
        assert_eq!(
            Config::default().apply_args(Vec::new()),
            Ok(Invocation::Run(Config::default()))
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(
            Config::default().apply_args(args(&["--help", "--bogus"])),
            Ok(Invocation::Help)
        );
        assert_eq!(
            Config::default().apply_args(args(&["-v"])),
            Ok(Invocation::Version)
        );
    }

    #[test]
    fn test_arg_errors() {
        assert_eq!(
            Config::default().apply_args(args(&["--port"])),
            Err(ConfigError::MissingValue("--port".to_string()))
        );
        assert_eq!(
            Config::default().apply_args(args(&["-p", "abc"])),
            Err(ConfigError::InvalidPort("abc".to_string()))
        );
        assert_eq!(
            Config::default().apply_args(args(&["--verbose"])),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::MissingValue("--host".to_string()).to_string(),
            "--host requires a value"
        );
        assert_eq!(
            ConfigError::InvalidPort("x".to_string()).to_string(),
            "invalid port number 'x'"
        );
    }
}
