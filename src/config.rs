use anyhow::Context;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite:bookshelf.db";
const DEFAULT_SERVER_PORT: u16 = 8000;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
}

impl Config {
    /// Reads `DATABASE_URL` and `SERVER_PORT`, falling back to local dev
    /// defaults when a variable is unset. A set-but-unparseable value is
    /// still an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = load_env_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?;
        let server_port = load_env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?;
        Ok(Self {
            database_url,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

fn load_env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    parse_env(key, std::env::var(key).ok(), default)
}

fn parse_env<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(val) => val
            .parse::<T>()
            .with_context(|| format!("Failed to parse environment variable {key}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        let port = parse_env("SERVER_PORT", None, DEFAULT_SERVER_PORT).unwrap();
        assert_eq!(port, 8000);

        let url = parse_env("DATABASE_URL", None, DEFAULT_DATABASE_URL.to_string()).unwrap();
        assert_eq!(url, "sqlite:bookshelf.db");
    }

    #[test]
    fn set_variable_overrides_default() {
        let port = parse_env("SERVER_PORT", Some("9090".to_string()), DEFAULT_SERVER_PORT);
        assert_eq!(port.unwrap(), 9090);
    }

    #[test]
    fn unparseable_variable_is_an_error_not_a_fallback() {
        let port: anyhow::Result<u16> =
            parse_env("SERVER_PORT", Some("not-a-port".to_string()), DEFAULT_SERVER_PORT);
        assert!(port.is_err());
    }
}
