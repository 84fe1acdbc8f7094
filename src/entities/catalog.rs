//! Catalog tag shared by dishes and ingredients.
//!
//! The marketplace keeps two logically separate menus with identical shape: the
//! curated "standard" menu and the searchable "custom" menu. Both live in the same
//! tables and are partitioned by this column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which catalog a dish or ingredient belongs to, stored as a lowercase string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// Curated menu offered on event creation
    #[sea_orm(string_value = "standard")]
    Standard,
    /// Searchable menu of customer-requested dishes
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl Catalog {
    /// Prefix used when a dish from this catalog is referenced in an event selection.
    #[must_use]
    pub const fn reference_prefix(self) -> &'static str {
        match self {
            Self::Standard => "std",
            Self::Custom => "custom",
        }
    }
}
