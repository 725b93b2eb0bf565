//! TOML configuration for packing and serving
//!
//! ```toml
//! [pack]
//! compression = "zstd"
//! follow_links = false
//!
//! [pack.mime_types]
//! go = "text/x-golang"
//!
//! [server]
//! listen = "0.0.0.0:8080"
//! prefix = "/static"
//! not_found = "404.html"
//! ```
//!
//! Every key is optional.

use crate::core::packer::PackOptions;
use crate::error::Result;
use crate::server::ServerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pack: PackOptions,
    pub server: ServerOptions,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.share_mime_types();
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Let the server type live files with the pack's table unless it has its own
    fn share_mime_types(&mut self) {
        if self.server.mime_types == Default::default() {
            self.server.mime_types = self.pack.mime_types.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compression::CompressionMethod;
    use crate::error::ImbedError;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pack.compression, CompressionMethod::Gzip);
        assert!(config.pack.follow_links);
        assert_eq!(config.server.prefix, "/");
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [pack]
            compression = "zstd"
            follow_links = false

            [pack.mime_types]
            ".go" = "text/x-golang"

            [server]
            listen = "0.0.0.0:9000"
            prefix = "/static"
            not_found = "404.html"
            overlay = "public"
            "#,
        )
        .unwrap();

        assert_eq!(config.pack.compression, CompressionMethod::Zstd);
        assert!(!config.pack.follow_links);
        assert_eq!(config.pack.mime_types.lookup("main.go"), "text/x-golang");
        assert_eq!(config.server.mime_types.lookup("main.go"), "text/x-golang");
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.not_found.as_deref(), Some("404.html"));
        assert_eq!(config.server.overlay.as_deref(), Some(Path::new("public")));
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_toml_str("[pack]\ncompression = \"lz77\"").unwrap_err();
        assert!(matches!(err, ImbedError::Config(_)));
        assert!(Config::from_toml_str("[unknown]\nx = 1").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/imbed.toml").unwrap_err();
        assert!(err.is_not_found());
    }
}
