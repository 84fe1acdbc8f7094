//! Ingredient entity - A priced unit of raw material.
//!
//! Ingredients are shared by reference between dishes of the same catalog.

use super::catalog::Catalog;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    /// Unique identifier for the ingredient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog partition
    pub catalog: Catalog,
    /// Ingredient name (e.g., "Rice")
    pub name: String,
    /// Unit of measure (kg, g, L, ml, pcs)
    pub unit: String,
    /// Price of one unit
    pub unit_price: f64,
    /// When the ingredient was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Ingredient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One ingredient is used by many dish lines
    #[sea_orm(has_many = "super::dish_ingredient::Entity")]
    DishIngredients,
}

impl Related<super::dish_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DishIngredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
