use std::error::Error as StdError;
use std::io::ErrorKind;

use super::AdapterError;

fn error_chain_matches(err: &(dyn StdError + 'static), kind: ErrorKind, needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        let kind_matches = source
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io_err| io_err.kind() == kind);
        if kind_matches || source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Converts a transport failure into an actionable message naming the
/// variable that controls the endpoint.
pub(crate) fn transport_error(
    err: reqwest::Error,
    api_url: &str,
    base_url_var: &str,
    timeout_secs: u64,
) -> AdapterError {
    let message = if err.is_timeout() || error_chain_has_timeout(&err) {
        format!(
            "Model request timed out after {}s while calling '{}'. \
             Increase MODEL_TIMEOUT_SECS or check model responsiveness.",
            timeout_secs, api_url
        )
    } else if err.is_connect() && error_chain_has_connection_refused(&err) {
        format!(
            "Connection refused by model API at '{}'. \
             Ensure the service is running and {} is correct.",
            api_url, base_url_var
        )
    } else if err.is_connect() {
        format!(
            "Failed to connect to model API at '{}'. \
             Check {} and network connectivity.",
            api_url, base_url_var
        )
    } else {
        format!("Failed to call model API at '{}': {}", api_url, err)
    };

    AdapterError::Transport(message)
}
