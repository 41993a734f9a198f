use crate::clone::CloneError;
use crate::config::{AuthType, ConfigError};
use chromactl_client::client::ChromaHttpClientOptionsError;
use chromactl_client::ChromaHttpClientError;
use chromactl_types::{InvalidDistanceFunction, MetadataTokenError};
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtilsError {
    #[error("Invalid host '{0}': expected a hostname, FQDN or IPv4 address without a port")]
    InvalidHost(String),
    #[error("Failed to get user input")]
    UserInputFailed,
    #[error("Failed to start async runtime")]
    RuntimeError,
    #[error("Auth type '{0}' requires --credential")]
    MissingCredential(AuthType),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Client(#[from] ChromaHttpClientError),
    #[error("{0}")]
    ClientOptions(#[from] ChromaHttpClientOptionsError),
    #[error("{0}")]
    Clone(#[from] CloneError),
    #[error("{0}")]
    Metadata(#[from] MetadataTokenError),
    #[error("{0}")]
    Space(#[from] InvalidDistanceFunction),
    #[error("{0}")]
    Utils(#[from] UtilsError),
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

static HOST_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid host label regex")
});

/// Accepts an IPv4 address or a hostname/FQDN. Ports, empty labels and hostnames whose
/// first label starts with a digit or whose TLD is numeric are rejected.
pub fn validate_host(host: &str) -> Result<(), UtilsError> {
    if host.parse::<Ipv4Addr>().is_ok() {
        return Ok(());
    }

    let invalid = || UtilsError::InvalidHost(host.to_string());
    if host.is_empty() || host.len() > 253 {
        return Err(invalid());
    }

    let labels: Vec<&str> = host.split('.').collect();
    if !labels.iter().all(|label| HOST_LABEL.is_match(label)) {
        return Err(invalid());
    }

    let starts_with_letter = labels[0]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    let numeric_tld = labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()));
    if !starts_with_letter || numeric_tld {
        return Err(invalid());
    }

    Ok(())
}

/// Runs a future to completion on a single-threaded runtime.
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|_| UtilsError::RuntimeError)?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_host() {
        for valid in ["localhost", "api.trychroma.com", "10.10.10.10", "my-host.internal"] {
            assert!(validate_host(valid).is_ok(), "{valid} should be valid");
        }
        for invalid in [
            "",
            "localhost:8080",
            "api.trychroma.com:8080",
            "10.10.10.256",
            "1231.com",
            "-bad.example.com",
            "double..dot",
            "http://localhost",
        ] {
            assert!(
                matches!(validate_host(invalid), Err(UtilsError::InvalidHost(_))),
                "{invalid} should be invalid"
            );
        }
    }
}
