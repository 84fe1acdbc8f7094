//! Dish ingredient entity - Junction between dishes and ingredients.
//!
//! Each row states how much of one ingredient the dish needs for its base servings.
//! `position` keeps the recipe lines in the order they were entered.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dish_ingredients")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dish this line belongs to
    pub dish_id: i64,
    /// Ingredient used
    pub ingredient_id: i64,
    /// Quantity of the ingredient for `dish.base_servings` guests
    pub quantity_for_base_servings: f64,
    /// Ordering of the line within the dish
    pub position: i32,
}

/// Defines relationships between `DishIngredient` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one dish
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id",
        on_delete = "Cascade"
    )]
    Dish,
    /// Each line references one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dish.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
