//! Defines the environment variables to use.

use crate::error::{FetchError, Result};

/// The environment variable holding the number of runs to fetch.
pub const RUN_COUNT: &str = "RUN_COUNT";

/// The environment variables holding a GitHub token, in lookup order.
pub const GITHUB_TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Parses an environment variable from [`String`] to something else, wrapping any error in [`anyhow::Error`].
#[macro_export]
macro_rules! parse_env {
    ($key:expr => |$var:ident| $expr:expr) => {
        std::env::var($key)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|$var| $expr)
    };
    ($key:expr => |$var:ident| $expr:expr; anyhow) => {
        parse_env!($key => |$var| $expr.map_err(|e| anyhow::anyhow!(e)))
    };
}

pub use parse_env;

/// Reads the GitHub token from the first non-empty variable of [`GITHUB_TOKEN_VARS`].
///
/// # Errors
///
/// Returns [`FetchError::Authentication`] if none of the variables holds a token.
pub fn github_token() -> Result<String> {
    GITHUB_TOKEN_VARS
        .iter()
        .find_map(|key| non_empty(key).ok())
        .ok_or_else(|| {
            FetchError::authentication(format!(
                "no token found, set {} or {}",
                GITHUB_TOKEN_VARS[0], GITHUB_TOKEN_VARS[1]
            ))
        })
}

fn non_empty(key: &str) -> anyhow::Result<String> {
    parse_env!(key => |s| {
        let token = s.trim();
        if token.is_empty() {
            Err(anyhow::anyhow!("{key} is empty"))
        } else {
            Ok(token.to_owned())
        }
    })
}

#[cfg(test)]
mod tests {
    #[test]
    fn parse_env_reports_missing_variables() {
        let parsed = parse_env!("RUN_FETCHER_SURELY_UNSET_VARIABLE" => |s| s.parse::<u8>(); anyhow);
        assert!(parsed.is_err());
    }
}
