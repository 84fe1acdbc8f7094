//! Mobile-money push gateway.
//!
//! A [`PaymentProvider`] asks the payer's phone to approve a payment. The live
//! provider talks to the Daraja STK-push API and only learns the outcome later through
//! the callback; the simulated provider settles the payment immediately and is used
//! whenever real credentials are missing or the gateway cannot be reached.

pub mod live;
pub mod simulated;

pub use live::LiveProvider;
pub use simulated::SimulatedProvider;

use crate::{config::gateway::GatewaySettings, errors::Result};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::warn;

/// What to charge and where to send the approval prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    /// Booking being paid for
    pub booking_id: i64,
    /// Normalised payer phone (`2547XXXXXXXX`)
    pub phone: String,
    /// Amount owed, in shillings with cents
    pub amount: f64,
}

/// Outcome of a push request, shaped as `{success, message, ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateResult {
    /// Whether the request was accepted (or, when simulated, settled)
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Gateway correlation id, present when a live push was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_request_id: Option<String>,
    /// Receipt number, present when a simulated payment was settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// Whether the simulated provider produced this result
    pub simulated: bool,
}

impl InitiateResult {
    /// Live push accepted; settlement arrives via the callback.
    #[must_use]
    pub fn accepted(checkout_request_id: String) -> Self {
        Self {
            success: true,
            message: "STK push sent successfully".to_string(),
            checkout_request_id: Some(checkout_request_id),
            receipt: None,
            simulated: false,
        }
    }

    /// The gateway refused the request.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            checkout_request_id: None,
            receipt: None,
            simulated: false,
        }
    }
}

/// Something that can ask a payer to approve a payment.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Sends the approval prompt for `request`.
    ///
    /// A pending payment row for the booking must already exist; the simulated
    /// provider settles the most recent one.
    async fn initiate(
        &self,
        db: &DatabaseConnection,
        request: &PushRequest,
    ) -> Result<InitiateResult>;
}

/// Picks the live provider when the active credentials are usable, otherwise the
/// simulated one.
#[must_use]
pub fn select_provider(settings: GatewaySettings) -> Box<dyn PaymentProvider> {
    if !settings.credentials.is_usable() {
        warn!(
            "No usable {} gateway credentials, payments will be simulated",
            settings.environment
        );
        return Box::new(SimulatedProvider);
    }

    match LiveProvider::new(settings) {
        Ok(provider) => Box::new(provider),
        Err(e) => {
            warn!("Failed to build gateway client, payments will be simulated: {e}");
            Box::new(SimulatedProvider)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::gateway::{GatewayCredentials, GatewayEnvironment};
    use std::time::Duration;

    fn settings(credentials: GatewayCredentials) -> GatewaySettings {
        GatewaySettings {
            environment: GatewayEnvironment::Sandbox,
            credentials,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_placeholder_credentials_select_simulation() {
        let provider = select_provider(settings(GatewayCredentials::sandbox_defaults()));
        assert_eq!(provider.name(), "simulated");
    }

    #[test]
    fn test_real_credentials_select_live() {
        let credentials = GatewayCredentials {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            passkey: "passkey".to_string(),
            callback_url: "https://example.test/callback".to_string(),
            ..GatewayCredentials::sandbox_defaults()
        };
        let provider = select_provider(settings(credentials));
        assert_eq!(provider.name(), "live");
    }

    #[test]
    fn test_initiate_result_wire_shape() {
        let json = serde_json::to_value(InitiateResult::rejected("Failed to initiate payment"))
            .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Failed to initiate payment");
        assert!(json.get("checkout_request_id").is_none());
        assert!(json.get("receipt").is_none());
    }
}
