//! Chef entity - A caterer who can be booked for events.
//!
//! Only the fields the booking flow needs are modelled here: location for matching,
//! the verification/approval flags that gate booking, and the running rating totals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chef database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chefs")]
pub struct Model {
    /// Unique identifier for the chef
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// County the chef operates in
    pub county: String,
    /// Sub-county the chef operates in
    pub sub_county: String,
    /// Town the chef operates in
    pub town: String,
    /// Contact details verified by code
    pub is_verified: bool,
    /// Approved by the operator
    pub is_approved: bool,
    /// Sum of all submitted rating values
    pub rating_total: i64,
    /// Number of submitted ratings
    pub rating_count: i64,
    /// When the chef registered
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Average rating, or `None` when the chef has not been rated yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_rating(&self) -> Option<f64> {
        (self.rating_count > 0).then(|| self.rating_total as f64 / self.rating_count as f64)
    }

    /// Whether customers may book this chef.
    #[must_use]
    pub const fn is_bookable(&self) -> bool {
        self.is_verified && self.is_approved
    }
}

/// Defines relationships between Chef and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One chef has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
