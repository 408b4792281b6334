use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

use reporta_db::DEFAULT_READER_POOL_SIZE;

/// Process configuration, read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub reader_pool_size: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("REPORTA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("REPORTA_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("REPORTA_PORT must be a port number")?;
        let db_path: PathBuf = lookup("REPORTA_DB_PATH")
            .unwrap_or_else(|| "reporta.db".into())
            .into();
        let reader_pool_size: usize = match lookup("REPORTA_READER_POOL_SIZE") {
            Some(v) => v
                .parse()
                .context("REPORTA_READER_POOL_SIZE must be a positive integer")?,
            None => DEFAULT_READER_POOL_SIZE,
        };
        ensure!(reader_pool_size > 0, "REPORTA_READER_POOL_SIZE must be at least 1");

        Ok(Self {
            host,
            port,
            db_path,
            reader_pool_size,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("reporta.db"));
        assert_eq!(cfg.reader_pool_size, DEFAULT_READER_POOL_SIZE);
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("REPORTA_HOST", "127.0.0.1"),
            ("REPORTA_PORT", "8080"),
            ("REPORTA_DB_PATH", "/var/lib/reporta/data.db"),
            ("REPORTA_READER_POOL_SIZE", "2"),
        ])
        .unwrap();
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/reporta/data.db"));
        assert_eq!(cfg.reader_pool_size, 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("REPORTA_PORT", "http")]).is_err());
        assert!(config(&[("REPORTA_READER_POOL_SIZE", "0")]).is_err());
        assert!(config(&[("REPORTA_HOST", "not a host")]).unwrap().listen_addr().is_err());
    }
}
