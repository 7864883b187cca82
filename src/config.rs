//! Startup configuration
//!
//! Everything is read from the process environment, with an optional `.env` file as a
//! fallback. The service-account fields are all required; the server refuses to start
//! when one is missing.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const AUTH_PROVIDER_CERT_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to read {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// Google service-account key, field for field as in the downloaded JSON key file
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub account_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: String,
    pub client_x509_cert_url: String,
}

// Keep the private key out of logs.
impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub cors_origin: String,
    pub sheets_api_base: String,
    pub credentials: ServiceAccountCredentials,
}

impl Config {
    /// Build the configuration from the process environment, falling back to a dotenv file
    ///
    /// The file is optional. Variables already present in the process environment win
    /// over the file's entries, and the process environment is never modified.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_vars = read_env_file(path.as_ref())?;
        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        })
    }

    /// Build the configuration from an arbitrary variable lookup
    ///
    /// Empty values count as missing, matching how the credential fields are checked.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::MissingVar(name));

        let credentials = ServiceAccountCredentials {
            account_type: required("GOOGLE_TYPE")?,
            project_id: required("GOOGLE_PROJECT_ID")?,
            private_key_id: required("GOOGLE_PRIVATE_KEY_ID")?,
            private_key: required("GOOGLE_PRIVATE_KEY")?.replace("\\n", "\n"),
            client_email: required("GOOGLE_CLIENT_EMAIL")?,
            client_id: required("GOOGLE_CLIENT_ID")?,
            auth_uri: AUTH_URI.to_string(),
            token_uri: TOKEN_URI.to_string(),
            auth_provider_x509_cert_url: AUTH_PROVIDER_CERT_URL.to_string(),
            client_x509_cert_url: required("GOOGLE_CLIENT_X509_CERT_URL")?,
        };

        let port = match optional("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    value: raw.clone(),
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            port,
            bind_address: optional("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            cors_origin: optional("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            sheets_api_base: optional("SHEETS_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            credentials,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let env_file_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
        let (key, value) = item.map_err(env_file_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}
