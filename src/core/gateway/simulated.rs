//! Simulated provider - settles the payment on the spot.

use super::{InitiateResult, PaymentProvider, PushRequest};
use crate::{
    core::payment::{self, Settlement},
    errors::Result,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

/// Marks the booking's most recent pending payment successful with a `SIM<timestamp>`
/// receipt, through the same completion path the callback uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedProvider;

/// Receipt number for a simulated payment.
#[must_use]
pub fn simulated_receipt(at: chrono::DateTime<Utc>) -> String {
    format!("SIM{}", at.format("%Y%m%d%H%M%S"))
}

#[async_trait]
impl PaymentProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn initiate(
        &self,
        db: &DatabaseConnection,
        request: &PushRequest,
    ) -> Result<InitiateResult> {
        info!(
            "Simulating payment of KES {:.2} from {} for booking {}",
            request.amount, request.phone, request.booking_id
        );

        let Some(pending) = payment::latest_pending_payment(db, request.booking_id).await? else {
            warn!(
                "Simulation found no pending payment for booking {}",
                request.booking_id
            );
            return Ok(InitiateResult {
                simulated: true,
                ..InitiateResult::rejected("Payment record not found")
            });
        };

        let receipt = simulated_receipt(Utc::now());
        let settled = match payment::settle_payment(db, pending.id, Some(receipt)).await? {
            Settlement::Applied { payment, .. } | Settlement::AlreadySettled { payment } => payment,
        };

        Ok(InitiateResult {
            success: true,
            message: "Payment simulated successfully".to_string(),
            checkout_request_id: None,
            receipt: settled.mpesa_receipt_number,
            simulated: true,
        })
    }
}
