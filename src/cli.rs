//! Command-line interface parsing for the cachify binary
//!
//! Exposes the engine operations over a disk-backed store: read-through
//! fetches of URLs plus direct get, set and remove of cached values.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::fetch::FetchRequest;
use crate::models::{CachifyOptions, GetOptions, SetOptions};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--header` value was not of the form `name:value`
    #[error("Invalid header: '{0}'. Expected NAME:VALUE")]
    InvalidHeader(String),
}

/// Cachify - cache HTTP responses on disk with expiration and encryption
#[derive(Parser, Debug)]
#[command(name = "cachify")]
#[command(about = "Client-side HTTP response cache")]
#[command(version)]
pub struct Cli {
    /// Directory of the cache store (overrides CACHIFY_STORE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the response of a URL, serving it from the cache when possible
    Fetch {
        /// URL to GET
        url: String,

        #[command(flatten)]
        key: KeyArgs,

        /// Request header, repeatable
        ///
        /// Example: --header "accept: application/json"
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Fetch even if a cached value exists
        #[arg(long)]
        pre_sync: bool,
    },
    /// Print the cached value of a key
    Get {
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Store a JSON value (plain strings are stored as strings)
    Set {
        #[command(flatten)]
        key: KeyArgs,

        /// Value to store
        value: String,
    },
    /// Delete a cached value
    Remove {
        /// Cache key
        key: String,
    },
}

/// Key, lifetime and encryption shared by the value subcommands.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Cache key
    #[arg(long, short)]
    pub key: String,

    /// Lifetime such as 30s, 15m, 2d or plain milliseconds
    #[arg(long, short)]
    pub lifetime: Option<String>,

    /// Encrypt the value at rest with this secret
    #[arg(long, env = "CACHIFY_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

impl KeyArgs {
    pub fn cachify_options(&self, pre_sync: bool) -> CachifyOptions {
        let mut options = CachifyOptions::new(&self.key).pre_sync(pre_sync);
        if let Some(lifetime) = &self.lifetime {
            options = options.lifetime(lifetime.as_str());
        }
        if let Some(secret) = &self.secret {
            options = options.encrypted(secret);
        }
        options
    }

    pub fn get_options(&self) -> GetOptions {
        let mut options = GetOptions::new(&self.key);
        if let Some(lifetime) = &self.lifetime {
            options = options.lifetime(lifetime.as_str());
        }
        if let Some(secret) = &self.secret {
            options = options.encrypted(secret);
        }
        options
    }

    pub fn set_options(&self) -> SetOptions {
        let mut options = SetOptions::new(&self.key);
        if let Some(lifetime) = &self.lifetime {
            options = options.lifetime(lifetime.as_str());
        }
        if let Some(secret) = &self.secret {
            options = options.encrypted(secret);
        }
        options
    }
}

/// Builds a GET request from a URL and `name:value` header arguments.
pub fn build_request(url: &str, headers: &[String]) -> Result<FetchRequest, CliError> {
    headers.iter().try_fold(FetchRequest::get(url), |request, raw| {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| CliError::InvalidHeader(raw.clone()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::InvalidHeader(raw.clone()));
        }
        Ok(request.header(name, value.trim()))
    })
}

/// Parses a value argument as JSON, falling back to a plain string.
pub fn parse_value_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::Lifetime;
    use serde_json::json;

    #[test]
    fn test_cli_parse_fetch() {
        let cli = Cli::parse_from([
            "cachify",
            "fetch",
            "https://example.com/users",
            "--key",
            "users",
            "--lifetime",
            "1h",
            "-H",
            "accept: application/json",
            "--pre-sync",
        ]);

        match cli.command {
            Command::Fetch {
                url,
                key,
                headers,
                pre_sync,
            } => {
                assert_eq!(url, "https://example.com/users");
                assert_eq!(key.key, "users");
                assert_eq!(key.lifetime.as_deref(), Some("1h"));
                assert_eq!(headers, vec!["accept: application/json".to_string()]);
                assert!(pre_sync);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_global_store_dir() {
        let cli = Cli::parse_from(["cachify", "remove", "users", "--store-dir", "/tmp/c"]);
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/c")));
        assert!(matches!(cli.command, Command::Remove { ref key } if key == "users"));
    }

    #[test]
    fn test_cli_requires_key() {
        let result = Cli::try_parse_from(["cachify", "get"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_key_args_to_options() {
        let args = KeyArgs {
            key: "k".to_string(),
            lifetime: Some("2d".to_string()),
            secret: Some("pw".to_string()),
        };

        let cachify = args.cachify_options(true);
        assert_eq!(cachify.key, "k");
        assert!(cachify.pre_sync);
        assert_eq!(cachify.lifetime, Some(Lifetime::from("2d")));
        assert!(cachify.encryption.is_some());

        let get = args.get_options();
        assert_eq!(get.lifetime, Some(Lifetime::from("2d")));
        assert!(args.set_options().encryption.is_some());
    }

    #[test]
    fn test_build_request_headers() {
        let request = build_request(
            "https://example.com",
            &["accept: application/json".to_string(), "x-id:7".to_string()],
        )
        .unwrap();

        assert_eq!(
            request.headers,
            vec![
                ("accept".to_string(), "application/json".to_string()),
                ("x-id".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_request_invalid_header() {
        let err = build_request("https://example.com", &["no-colon".to_string()]).unwrap_err();
        assert!(err.to_string().contains("no-colon"));
        assert!(build_request("https://example.com", &[":v".to_string()]).is_err());
    }

    #[test]
    fn test_parse_value_arg() {
        assert_eq!(parse_value_arg(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_value_arg("42"), json!(42));
        assert_eq!(parse_value_arg("hello world"), json!("hello world"));
    }
}
