//! Payment entity - One attempt to collect money for a booking.
//!
//! `transaction_id` holds the gateway's correlation id (`CheckoutRequestID`) so the
//! asynchronous callback can find the row it settles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome state of a payment attempt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Push request sent, waiting for the payer
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Money received
    #[sea_orm(string_value = "success")]
    Success,
    /// Rejected by the gateway or abandoned
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Booking being paid for
    pub booking_id: i64,
    /// Payer's phone number in international format
    pub phone_number: String,
    /// Amount requested
    pub amount: f64,
    /// Current state
    pub status: PaymentStatus,
    /// Receipt issued by the gateway (or `SIM...` in simulation)
    pub mpesa_receipt_number: Option<String>,
    /// Gateway correlation id
    #[sea_orm(unique)]
    pub transaction_id: Option<String>,
    /// When the attempt was started
    pub created_at: DateTimeUtc,
    /// When the attempt succeeded
    pub completed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one booking
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
