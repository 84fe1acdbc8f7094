//! Catalog seed configuration loaded from config.toml
//!
//! The `[catalog]` section lists the ingredients and dishes that are inserted on
//! first start. Seeding is idempotent: dishes already present (by name, within their
//! catalog) are left alone.

use crate::entities::Catalog;
use serde::Deserialize;

const fn default_catalog() -> Catalog {
    Catalog::Standard
}

/// The `[catalog]` section of config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CatalogSeed {
    /// Ingredients to create
    #[serde(default)]
    pub ingredients: Vec<IngredientSeed>,
    /// Dishes to create, referring to ingredients by name
    #[serde(default)]
    pub dishes: Vec<DishSeed>,
}

/// One `[[catalog.ingredients]]` entry
#[derive(Debug, Deserialize, Clone)]
pub struct IngredientSeed {
    /// Catalog the ingredient belongs to (defaults to `standard`)
    #[serde(default = "default_catalog")]
    pub catalog: Catalog,
    /// Ingredient name
    pub name: String,
    /// Unit of measure
    pub unit: String,
    /// Price per unit
    pub unit_price: f64,
}

/// One `[[catalog.dishes]]` entry
#[derive(Debug, Deserialize, Clone)]
pub struct DishSeed {
    /// Catalog the dish belongs to (defaults to `standard`)
    #[serde(default = "default_catalog")]
    pub catalog: Catalog,
    /// Dish name
    pub name: String,
    /// Servings the quantities are written for
    pub base_servings: i32,
    /// Markup percentage
    pub markup: f64,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Ingredient lines in recipe order
    #[serde(default)]
    pub ingredients: Vec<DishLineSeed>,
}

/// One ingredient line of a seeded dish
#[derive(Debug, Deserialize, Clone)]
pub struct DishLineSeed {
    /// Ingredient name, resolved within the dish's catalog
    pub name: String,
    /// Quantity for the dish's base servings
    pub quantity: f64,
}
