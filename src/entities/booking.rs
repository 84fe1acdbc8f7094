//! Booking entity - Links one event to one chef.
//!
//! A booking starts `pending` and becomes `confirmed` once a deposit payment succeeds.
//! Editing the event upwards in cost sends it back to `pending` until the additional
//! deposit is paid.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Waiting for (additional) deposit
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Deposit paid
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
}

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event being catered; at most one booking per event
    #[sea_orm(unique)]
    pub event_id: i64,
    /// Chef catering the event
    pub chef_id: i64,
    /// Deposit required to hold the booking
    pub deposit_amount: f64,
    /// Current lifecycle state
    pub status: BookingStatus,
    /// Customer rating, 1-5
    pub rating_value: Option<i32>,
    /// Optional rating comment
    pub rating_comment: Option<String>,
    /// When the rating was submitted
    pub rating_submitted_at: Option<DateTimeUtc>,
    /// When the booking was created
    pub created_at: DateTimeUtc,
    /// When the booking last became confirmed
    pub confirmed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking belongs to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    /// Each booking belongs to one chef
    #[sea_orm(
        belongs_to = "super::chef::Entity",
        from = "Column::ChefId",
        to = "super::chef::Column::Id"
    )]
    Chef,
    /// One booking has many payment attempts
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::chef::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chef.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
