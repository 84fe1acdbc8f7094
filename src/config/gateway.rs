//! Payment gateway configuration.
//!
//! Credentials are kept per environment (sandbox and production each have their own
//! base URLs, shortcode and passkey). Values come from the `[payments]` section of
//! config.toml and can be overridden with `MPESA_*` environment variables, which apply
//! to whichever environment is active.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Duration};

const SANDBOX_TOKEN_URL: &str =
    "https://sandbox.safaricom.co.ke/oauth/v1/generate?grant_type=client_credentials";
const SANDBOX_STK_URL: &str = "https://sandbox.safaricom.co.ke/mpesa/stkpush/v1/processrequest";
const PRODUCTION_TOKEN_URL: &str =
    "https://api.safaricom.co.ke/oauth/v1/generate?grant_type=client_credentials";
const PRODUCTION_STK_URL: &str = "https://api.safaricom.co.ke/mpesa/stkpush/v1/processrequest";

/// Placeholder values shipped in sample configs; never treated as real credentials.
const PLACEHOLDERS: [&str; 3] = ["test_key", "test_secret", "test_passkey"];

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which gateway deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    /// Public test deployment
    #[default]
    Sandbox,
    /// Live money
    Production,
}

impl FromStr for GatewayEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(Error::Config {
                message: format!("Unknown gateway environment '{other}'"),
            }),
        }
    }
}

impl fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => f.write_str("sandbox"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Credentials and endpoints for one gateway environment
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayCredentials {
    /// OAuth consumer key
    pub consumer_key: String,
    /// OAuth consumer secret
    pub consumer_secret: String,
    /// Business shortcode receiving the money
    pub shortcode: String,
    /// Passkey used to sign push requests
    pub passkey: String,
    /// Public URL the gateway posts results to
    pub callback_url: String,
    /// Token endpoint, including the `grant_type` query string
    pub api_url: String,
    /// Push-payment endpoint
    pub stk_url: String,
}

impl GatewayCredentials {
    /// Sandbox endpoints with placeholder credentials.
    #[must_use]
    pub fn sandbox_defaults() -> Self {
        Self {
            consumer_key: "test_key".to_string(),
            consumer_secret: "test_secret".to_string(),
            shortcode: "174379".to_string(),
            passkey: "test_passkey".to_string(),
            callback_url: String::new(),
            api_url: SANDBOX_TOKEN_URL.to_string(),
            stk_url: SANDBOX_STK_URL.to_string(),
        }
    }

    /// Production endpoints with no credentials.
    #[must_use]
    pub fn production_defaults() -> Self {
        Self {
            api_url: PRODUCTION_TOKEN_URL.to_string(),
            stk_url: PRODUCTION_STK_URL.to_string(),
            ..Self::default()
        }
    }

    /// Fills blank fields from the environment's defaults, so a config file only has
    /// to carry the values that differ.
    #[must_use]
    pub fn with_defaults_for(self, environment: GatewayEnvironment) -> Self {
        let defaults = match environment {
            GatewayEnvironment::Sandbox => Self::sandbox_defaults(),
            GatewayEnvironment::Production => Self::production_defaults(),
        };
        let pick = |value: String, fallback: String| {
            if value.trim().is_empty() { fallback } else { value }
        };
        Self {
            consumer_key: pick(self.consumer_key, defaults.consumer_key),
            consumer_secret: pick(self.consumer_secret, defaults.consumer_secret),
            shortcode: pick(self.shortcode, defaults.shortcode),
            passkey: pick(self.passkey, defaults.passkey),
            callback_url: pick(self.callback_url, defaults.callback_url),
            api_url: pick(self.api_url, defaults.api_url),
            stk_url: pick(self.stk_url, defaults.stk_url),
        }
    }

    /// True when every value needed for a live push request is present and none of
    /// the secrets is a placeholder.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let required = [
            &self.consumer_key,
            &self.consumer_secret,
            &self.shortcode,
            &self.passkey,
            &self.api_url,
            &self.stk_url,
        ];
        required.iter().all(|value| !value.trim().is_empty())
            && [&self.consumer_key, &self.consumer_secret, &self.passkey]
                .iter()
                .all(|value| !PLACEHOLDERS.contains(&value.as_str()))
    }
}

// Secrets stay out of logs.
impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("api_url", &self.api_url)
            .field("stk_url", &self.stk_url)
            .finish()
    }
}

/// The `[payments]` section of config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Active environment
    pub environment: GatewayEnvironment,
    /// Timeout applied to every gateway HTTP call
    pub timeout_secs: u64,
    /// Sandbox credentials
    pub sandbox: GatewayCredentials,
    /// Production credentials
    pub production: GatewayCredentials,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            environment: GatewayEnvironment::Sandbox,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sandbox: GatewayCredentials::sandbox_defaults(),
            production: GatewayCredentials::production_defaults(),
        }
    }
}

/// Resolved settings for the active environment, ready to hand to a provider
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Environment the credentials belong to
    pub environment: GatewayEnvironment,
    /// Credentials and endpoints
    pub credentials: GatewayCredentials,
    /// Per-request timeout
    pub timeout: Duration,
}

impl PaymentsConfig {
    /// Settings for the active environment, with blank fields filled from that
    /// environment's defaults.
    #[must_use]
    pub fn active(&self) -> GatewaySettings {
        let credentials = match self.environment {
            GatewayEnvironment::Sandbox => self.sandbox.clone(),
            GatewayEnvironment::Production => self.production.clone(),
        }
        .with_defaults_for(self.environment);
        GatewaySettings {
            environment: self.environment,
            credentials,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }

    /// Applies `MPESA_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup. `MPESA_ENVIRONMENT` is applied
    /// first so the remaining keys land on the selected environment.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("MPESA_ENVIRONMENT") {
            self.environment = environment.parse()?;
        }

        let credentials = match self.environment {
            GatewayEnvironment::Sandbox => &mut self.sandbox,
            GatewayEnvironment::Production => &mut self.production,
        };

        let fields: [(&str, &mut String); 7] = [
            ("MPESA_CONSUMER_KEY", &mut credentials.consumer_key),
            ("MPESA_CONSUMER_SECRET", &mut credentials.consumer_secret),
            ("MPESA_SHORTCODE", &mut credentials.shortcode),
            ("MPESA_PASSKEY", &mut credentials.passkey),
            ("MPESA_CALLBACK_URL", &mut credentials.callback_url),
            ("MPESA_API_URL", &mut credentials.api_url),
            ("MPESA_STK_URL", &mut credentials.stk_url),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }

        Ok(self)
    }
}
