// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Museum Lens

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Inference proxy connection
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Analysis request settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Web API settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key, if the proxy
    /// needs one. The key itself never lives in the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AnalysisConfig {
    /// Replaces the default task prompt when set and non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_override: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

// Default value functions
fn default_proxy_url() -> String { "http://127.0.0.1:8787/".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: default_proxy_url(),
            timeout_secs: default_timeout(),
            api_key_env: None,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ProxyConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> crate::Result<Option<String>> {
        match &self.api_key_env {
            None => Ok(None),
            Some(var) => std::env::var(var).map(Some).map_err(|_| {
                crate::LensError::Config(format!(
                    "API key environment variable '{}' is not set",
                    var
                ))
            }),
        }
    }
}

impl AnalysisConfig {
    /// The prompt override, ignoring blank values
    pub fn effective_prompt_override(&self) -> Option<&str> {
        self.prompt_override
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::LensError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
