//! Gateway callback reconciliation.
//!
//! The gateway posts the outcome of every push request to the callback URL:
//!
//! ```json
//! {"Body": {"stkCallback": {
//!     "CheckoutRequestID": "ws_CO_...",
//!     "ResultCode": 0,
//!     "CallbackMetadata": {"Item": [
//!         {"Name": "Amount", "Value": 1.0},
//!         {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
//!         {"Name": "PhoneNumber", "Value": 254708374149}
//!     ]}
//! }}}
//! ```
//!
//! A success for a known `CheckoutRequestID` settles the payment through
//! [`settle_payment`]. Every other payload is acknowledged with `success: false` and
//! changes nothing. Handling never returns an error to the transport layer.

use crate::{
    core::payment::{Settlement, find_by_correlation_id, settle_payment},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

/// Top-level callback document.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    /// `Body`
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

/// `Body` of a callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    /// `stkCallback`
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// Result of one push request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    /// Gateway's merchant-side id
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    /// Correlation id returned when the push was accepted
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// 0 on success
    pub result_code: i64,
    /// Human-readable result
    #[serde(default)]
    pub result_desc: Option<String>,
    /// Present on success
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

/// Name/value list attached to a successful callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackMetadata {
    /// Metadata entries
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

/// One metadata entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataItem {
    /// Entry name
    #[serde(rename = "Name")]
    pub name: String,
    /// Entry value; absent for some entries
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl CallbackMetadata {
    fn value(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `MpesaReceiptNumber`
    #[must_use]
    pub fn receipt_number(&self) -> Option<String> {
        self.text("MpesaReceiptNumber")
    }

    /// `PhoneNumber`, which the gateway sends as a number
    #[must_use]
    pub fn phone_number(&self) -> Option<String> {
        self.text("PhoneNumber")
    }

    /// `Amount`
    #[must_use]
    pub fn amount(&self) -> Option<f64> {
        match self.value("Amount")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackAck {
    /// Whether the callback settled (or had already settled) a payment
    pub success: bool,
    /// Outcome description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackAck {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Reconciles one callback payload. Malformed payloads and storage failures become a
/// failure acknowledgement.
#[instrument(skip_all)]
pub async fn handle_callback(db: &DatabaseConnection, payload: &Value) -> CallbackAck {
    let envelope = match CallbackEnvelope::deserialize(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Malformed gateway callback: {e}");
            return CallbackAck::failed(format!("Malformed callback: {e}"));
        }
    };

    match reconcile(db, &envelope.body.stk_callback).await {
        Ok(ack) => ack,
        Err(e) => {
            error!(
                "Failed to reconcile callback {}: {e}",
                envelope.body.stk_callback.checkout_request_id
            );
            CallbackAck::failed(e.to_string())
        }
    }
}

/// Parses a raw callback body and reconciles it.
pub async fn handle_callback_str(db: &DatabaseConnection, raw: &str) -> CallbackAck {
    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => handle_callback(db, &payload).await,
        Err(e) => {
            warn!("Gateway callback is not JSON: {e}");
            CallbackAck::failed(format!("Malformed callback: {e}"))
        }
    }
}

async fn reconcile(db: &DatabaseConnection, callback: &StkCallback) -> Result<CallbackAck> {
    let checkout_request_id = callback.checkout_request_id.as_str();

    if callback.result_code != 0 {
        info!(
            "Callback {checkout_request_id} reports failure {}: {}",
            callback.result_code,
            callback.result_desc.as_deref().unwrap_or_default()
        );
        return Ok(CallbackAck::failed("Payment failed"));
    }

    let Some(payment) = find_by_correlation_id(db, checkout_request_id).await? else {
        warn!("Callback for unknown CheckoutRequestID {checkout_request_id}");
        return Ok(CallbackAck::failed("Payment failed"));
    };

    let metadata = callback.callback_metadata.clone().unwrap_or_default();
    if let Some(amount) = metadata
        .amount()
        .filter(|amount| (amount - payment.amount).abs() >= 1.0)
    {
        warn!(
            "Callback {checkout_request_id} amount {amount} differs from payment {} amount {}",
            payment.id, payment.amount
        );
    }

    match settle_payment(db, payment.id, metadata.receipt_number()).await? {
        Settlement::Applied { payment, .. } => info!(
            "Callback {checkout_request_id} settled payment {} from {}",
            payment.id,
            metadata.phone_number().unwrap_or_default()
        ),
        Settlement::AlreadySettled { payment } => info!(
            "Callback {checkout_request_id} repeated for settled payment {}",
            payment.id
        ),
    }
    Ok(CallbackAck::ok())
}
