//! Live provider - Daraja STK push over HTTPS.
//!
//! Two calls per payment: an OAuth token request with Basic credentials, then the push
//! request signed with `base64(shortcode + passkey + timestamp)`. The timestamp is
//! East Africa Time. If the token cannot be obtained, or the push request fails in
//! transport, the payment falls back to simulation; an explicit refusal from the
//! gateway does not.

use super::{InitiateResult, PaymentProvider, PushRequest, SimulatedProvider};
use crate::{
    config::gateway::GatewaySettings,
    errors::{Error, Result},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, StatusCode};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

const EAT_OFFSET_HOURS: i64 = 3;
const FAILED_TO_INITIATE: &str = "Failed to initiate payment";

/// Push timestamp, `YYYYMMDDHHMMSS` in East Africa Time.
#[must_use]
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    (now.naive_utc() + TimeDelta::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// Push password, `base64(shortcode + passkey + timestamp)`.
#[must_use]
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Whole-shilling amount sent to the gateway, rounded up so the deposit is covered.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn stk_amount(amount: f64) -> i64 {
    amount.ceil() as i64
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: &'a str,
    transaction_type: &'static str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    call_back_url: &'a str,
    account_reference: String,
    transaction_desc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushResponse {
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    response_code: Option<String>,
    response_description: Option<String>,
}

/// Provider backed by the real gateway.
#[derive(Debug)]
pub struct LiveProvider {
    client: Client,
    settings: GatewaySettings,
    fallback: SimulatedProvider,
}

impl LiveProvider {
    /// Builds the HTTP client with the configured timeout.
    ///
    /// # Errors
    /// Returns [`Error::Http`] if the client cannot be constructed.
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            fallback: SimulatedProvider,
        })
    }

    async fn access_token(&self) -> Result<String> {
        let credentials = &self.settings.credentials;
        let response = self
            .client
            .get(&credentials.api_url)
            .basic_auth(&credentials.consumer_key, Some(&credentials.consumer_secret))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Gateway {
                message: format!("Token request returned {status}"),
            });
        }

        let body: TokenResponse = response.json().await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Gateway {
                message: "Token response has no access_token".to_string(),
            })
    }
}

#[async_trait]
impl PaymentProvider for LiveProvider {
    fn name(&self) -> &'static str {
        "live"
    }

    #[instrument(skip(self, db, request), fields(booking_id = request.booking_id))]
    async fn initiate(
        &self,
        db: &DatabaseConnection,
        request: &PushRequest,
    ) -> Result<InitiateResult> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to get gateway access token, simulating instead: {e}");
                return self.fallback.initiate(db, request).await;
            }
        };

        let credentials = &self.settings.credentials;
        let timestamp = stk_timestamp(Utc::now());
        let body = StkPushBody {
            business_short_code: &credentials.shortcode,
            password: stk_password(&credentials.shortcode, &credentials.passkey, &timestamp),
            timestamp: &timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: stk_amount(request.amount),
            party_a: &request.phone,
            party_b: &credentials.shortcode,
            phone_number: &request.phone,
            call_back_url: &credentials.callback_url,
            account_reference: format!("Booking-{}", request.booking_id),
            transaction_desc: format!("Deposit for booking #{}", request.booking_id),
        };

        let response = match self
            .client
            .post(&credentials.stk_url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Push request failed in transport, simulating instead: {e}");
                return self.fallback.initiate(db, request).await;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            error!("Push request returned {status}: {text}");
            return Ok(InitiateResult::rejected(FAILED_TO_INITIATE));
        }

        let parsed: StkPushResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Unreadable push response: {e}");
                return Ok(InitiateResult::rejected(FAILED_TO_INITIATE));
            }
        };

        match (parsed.response_code.as_deref(), parsed.checkout_request_id) {
            (Some("0"), Some(checkout_request_id)) => {
                info!("Push accepted, CheckoutRequestID {checkout_request_id}");
                Ok(InitiateResult::accepted(checkout_request_id))
            }
            (code, _) => {
                warn!(
                    "Push refused with code {:?}: {}",
                    code,
                    parsed.response_description.unwrap_or_default()
                );
                Ok(InitiateResult::rejected(FAILED_TO_INITIATE))
            }
        }
    }
}
