use crate::core::errors::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub proxy_url: Option<String>,
    pub strict_ssl: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            proxy_url: None,
            strict_ssl: true,
        }
    }
}

/// Resolves transport settings for a workspace-scoped settings key such as `http`.
pub trait ProxyResolver {
    fn resolve(&self, settings_key: &str) -> ProxySettings;
}

/// Flat settings object, e.g. `{ "http.proxy": "...", "http.proxyStrictSSL": false }`.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSettings {
    values: Map<String, Value>,
    use_environment: bool,
}

impl WorkspaceSettings {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            use_environment: true,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(values) => Ok(Self::new(values)),
            other => Err(Error::Config(format!(
                "settings file {} must contain an object, found {}",
                path.display(),
                kind(&other)
            ))),
        }
    }

    /// Stops falling back to `https_proxy` / `http_proxy`.
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    fn environment_proxy() -> Option<String> {
        ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }
}

impl ProxyResolver for WorkspaceSettings {
    fn resolve(&self, settings_key: &str) -> ProxySettings {
        let proxy_url = self
            .values
            .get(&format!("{settings_key}.proxy"))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| {
                if self.use_environment {
                    Self::environment_proxy()
                } else {
                    None
                }
            });
        let strict_ssl = self
            .values
            .get(&format!("{settings_key}.proxyStrictSSL"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        ProxySettings {
            proxy_url,
            strict_ssl,
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
