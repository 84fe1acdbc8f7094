//! Event entity - A customer's catered occasion.
//!
//! `dish_selection` stores the chosen dishes as an ordered, comma-separated list of
//! catalog-tagged references (`std:3,custom:7`). `total_cost` is recomputed whenever
//! the selection or guest counts change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer who owns the event
    pub customer_id: i64,
    /// County of the venue
    pub county: String,
    /// Sub-county of the venue
    pub sub_county: String,
    /// Town of the venue
    pub town: String,
    /// Number of adult guests
    pub adult_guests: i32,
    /// Number of child guests
    pub child_guests: i32,
    /// Date of the event
    pub event_date: Date,
    /// Ordered dish references, comma separated
    pub dish_selection: String,
    /// Sum of the selling prices of all selected dishes for the guest count
    pub total_cost: f64,
    /// When the event was created
    pub created_at: DateTimeUtc,
    /// When the event was last edited
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Total number of guests the dishes are priced for.
    #[must_use]
    pub fn guest_count(&self) -> i64 {
        i64::from(self.adult_guests) + i64::from(self.child_guests)
    }
}

/// Defines relationships between Event and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An event has at most one booking
    #[sea_orm(has_one = "super::booking::Entity")]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
