//! Configuration management for jagad

use crate::cli::Cli;
use figment::{Figment, providers::{Format, Yaml, Env}};
use jaga_connector_gemini::GeminiConfig;
use jaga_core::errors::CoreError;
use jaga_core::OrchestratorConfig;
use jaga_http_api::HttpApiConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Model backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Reference reports, no external calls
    #[default]
    Fixed,
    /// Google Gemini multimodal model
    Gemini,
}

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JagaConfig {
    pub server: ServerSection,
    pub model: ModelSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: IpAddr,
    pub port: u16,
    pub enable_cors: bool,
    /// Seconds before an in-flight request is abandoned
    pub request_timeout: u64,
    pub max_upload_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            enable_cors: true,
            request_timeout: 60,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Model backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub backend: Backend,
    /// Upper bound for one model call, in seconds; below `server.request_timeout`
    pub timeout_secs: u64,
    pub gemini: GeminiConfig,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            backend: Backend::Fixed,
            timeout_secs: 50,
            gemini: GeminiConfig::default(),
        }
    }
}

impl JagaConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: &Option<PathBuf>) -> Result<Self, CoreError> {
        let mut figment = Figment::new();

        // Load from default config file if it exists
        let default_config_paths = [
            "jaga.yaml",
            "jaga.yml",
            ".jaga.yaml",
        ];

        for path in &default_config_paths {
            if Path::new(path).exists() {
                figment = figment.merge(Yaml::file(path));
                break;
            }
        }

        // Load from specified config file
        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Yaml::file(path));
            } else {
                return Err(CoreError::Configuration(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
        }

        // JAGA_SERVER__PORT=9000 sets server.port
        figment = figment.merge(Env::prefixed("JAGA_").split("__"));

        // The conventional Gemini key variable
        figment = figment.merge(
            Env::raw()
                .only(&["GEMINI_API_KEY"])
                .map(|_| "model.gemini.api_key".into()),
        );

        figment.extract()
            .map_err(|e| CoreError::Configuration(format!("Failed to parse configuration: {}", e)))
    }

    /// Apply CLI argument overrides to the configuration
    pub fn with_overrides(mut self, args: &Cli) -> Self {
        if let Some(host) = args.host {
            self.server.host = host;
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(backend) = args.backend {
            self.model.backend = backend;
        }

        self
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.port == 0 {
            return Err(CoreError::Configuration("server.port must be non-zero".to_string()));
        }

        if self.server.request_timeout == 0 || self.model.timeout_secs == 0 {
            return Err(CoreError::Configuration(
                "timeouts must be at least one second".to_string(),
            ));
        }

        if self.model.timeout_secs >= self.server.request_timeout {
            return Err(CoreError::Configuration(format!(
                "model.timeout_secs ({}) must be below server.request_timeout ({})",
                self.model.timeout_secs, self.server.request_timeout
            )));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(CoreError::Configuration(
                "server.max_upload_bytes must be non-zero".to_string(),
            ));
        }

        if self.model.backend == Backend::Gemini {
            if !self.model.gemini.has_api_key() {
                return Err(CoreError::Configuration(
                    "Gemini backend selected but no API key set. \
                     Use GEMINI_API_KEY or model.gemini.api_key"
                        .to_string(),
                ));
            }

            let budget = self.model.gemini.worst_case_duration();
            if budget > Duration::from_secs(self.model.timeout_secs) {
                return Err(CoreError::Configuration(format!(
                    "Gemini retries can take {:?}, longer than model.timeout_secs ({})",
                    budget, self.model.timeout_secs
                )));
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn http_config(&self) -> HttpApiConfig {
        HttpApiConfig {
            bind_address: self.bind_address(),
            enable_cors: self.server.enable_cors,
            request_timeout: self.server.request_timeout,
            max_upload_bytes: self.server.max_upload_bytes,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            model_timeout: Duration::from_secs(self.model.timeout_secs),
            max_frame_bytes: self.server.max_upload_bytes,
        }
    }
}
