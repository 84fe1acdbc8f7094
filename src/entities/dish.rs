//! Dish entity - A menu item priced from its ingredient list.
//!
//! Quantities on the ingredient lines are expressed for `base_servings` guests and
//! are scaled linearly to the event's guest count at pricing time.

use super::catalog::Catalog;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    /// Unique identifier for the dish
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog partition
    pub catalog: Catalog,
    /// Dish name (e.g., "Pilau")
    pub name: String,
    /// Number of guests the ingredient quantities are written for
    pub base_servings: i32,
    /// Markup percentage applied on top of ingredient cost
    pub markup: f64,
    /// Optional free-text description
    pub description: Option<String>,
    /// When the dish was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Dish and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One dish has many ingredient lines
    #[sea_orm(has_many = "super::dish_ingredient::Entity")]
    DishIngredients,
}

impl Related<super::dish_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DishIngredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
