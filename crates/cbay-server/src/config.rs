use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Reads `CBAY_DB_PATH`, `CBAY_HOST` and `CBAY_PORT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("CBAY_DB_PATH").unwrap_or_else(|| "cbay.db".into());
        let host = lookup("CBAY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("CBAY_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CBAY_PORT must be a port number, got {:?}", raw))?,
            None => 3000,
        };

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.db_path, PathBuf::from("cbay.db"));
        assert_eq!(config.addr().unwrap(), "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn bad_port_is_an_error() {
        let result = Config::from_lookup(|key| (key == "CBAY_PORT").then(|| "http".to_string()));
        assert!(result.is_err());
    }
}
