//! Dish pricing - Scales a recipe to a guest count and applies markup.
//!
//! Everything in this module is pure: it takes a [`Recipe`] that has already been
//! loaded from storage and returns a [`DishPrice`]. Internal accumulation keeps full
//! floating precision; callers round with [`round_money`] (or [`DishPrice::rounded`])
//! only when presenting or persisting an amount.

use crate::{
    entities::Catalog,
    errors::{Error, Result},
};
use serde::Serialize;

/// One ingredient line of a recipe, with the ingredient's price resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeLine {
    /// Ingredient id
    pub ingredient_id: i64,
    /// Ingredient name
    pub ingredient: String,
    /// Unit of measure
    pub unit: String,
    /// Price per unit
    pub unit_price: f64,
    /// Quantity for the dish's base servings
    pub base_quantity: f64,
}

/// A dish together with its ordered ingredient lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    /// Dish id
    pub dish_id: i64,
    /// Catalog the dish belongs to
    pub catalog: Catalog,
    /// Dish name
    pub name: String,
    /// Servings the base quantities are written for
    pub base_servings: i32,
    /// Markup percentage
    pub markup: f64,
    /// Ingredient lines in recipe order
    pub lines: Vec<RecipeLine>,
}

/// Cost of one ingredient after scaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientCost {
    /// Ingredient name
    pub ingredient: String,
    /// Unit of measure
    pub unit: String,
    /// Quantity needed for the requested guest count
    pub scaled_quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// `scaled_quantity * unit_price`
    pub cost: f64,
}

/// Price of a dish for a given guest count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishPrice {
    /// Guests the dish was priced for
    pub guest_count: i64,
    /// Sum of ingredient costs
    pub total_cost: f64,
    /// `total_cost * markup / 100`
    pub markup_amount: f64,
    /// `total_cost + markup_amount`
    pub selling_price: f64,
    /// Per-ingredient costs in recipe order
    pub breakdown: Vec<IngredientCost>,
}

impl DishPrice {
    /// Copy with every monetary field rounded to cents, for display.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            guest_count: self.guest_count,
            total_cost: round_money(self.total_cost),
            markup_amount: round_money(self.markup_amount),
            selling_price: round_money(self.selling_price),
            breakdown: self
                .breakdown
                .iter()
                .map(|line| IngredientCost {
                    cost: round_money(line.cost),
                    ..line.clone()
                })
                .collect(),
        }
    }
}

/// Rounds a monetary amount to 2 decimal places.
#[must_use]
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn invalid(recipe: &Recipe, reason: impl Into<String>) -> Error {
    Error::InvalidDish {
        dish: recipe.name.clone(),
        reason: reason.into(),
    }
}

/// Prices `recipe` for `guest_count` guests.
///
/// Each line is scaled by `base_quantity / base_servings * guest_count` and costed at
/// the ingredient's unit price; the markup percentage is applied to the sum.
///
/// # Errors
/// Returns [`Error::InvalidDish`] when `base_servings` is not positive, the guest
/// count is negative, or the markup, a quantity or a unit price is negative or not
/// finite.
pub fn price_dish(recipe: &Recipe, guest_count: i64) -> Result<DishPrice> {
    if recipe.base_servings <= 0 {
        return Err(invalid(recipe, "base servings must be greater than zero"));
    }
    if guest_count < 0 {
        return Err(invalid(
            recipe,
            format!("guest count cannot be negative ({guest_count})"),
        ));
    }
    if !recipe.markup.is_finite() || recipe.markup < 0.0 {
        return Err(invalid(recipe, format!("invalid markup {}", recipe.markup)));
    }

    let base_servings = f64::from(recipe.base_servings);
    #[allow(clippy::cast_precision_loss)]
    let guests = guest_count as f64;

    let mut breakdown = Vec::with_capacity(recipe.lines.len());
    for line in &recipe.lines {
        if !line.base_quantity.is_finite() || line.base_quantity < 0.0 {
            return Err(invalid(
                recipe,
                format!("invalid quantity for {}", line.ingredient),
            ));
        }
        if !line.unit_price.is_finite() || line.unit_price < 0.0 {
            return Err(invalid(
                recipe,
                format!("invalid unit price for {}", line.ingredient),
            ));
        }

        let scaled_quantity = line.base_quantity / base_servings * guests;
        breakdown.push(IngredientCost {
            ingredient: line.ingredient.clone(),
            unit: line.unit.clone(),
            scaled_quantity,
            unit_price: line.unit_price,
            cost: scaled_quantity * line.unit_price,
        });
    }

    let total_cost: f64 = breakdown.iter().map(|line| line.cost).sum();
    let markup_amount = total_cost * recipe.markup / 100.0;

    Ok(DishPrice {
        guest_count,
        total_cost,
        markup_amount,
        selling_price: total_cost + markup_amount,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn line(id: i64, name: &str, unit_price: f64, base_quantity: f64) -> RecipeLine {
        RecipeLine {
            ingredient_id: id,
            ingredient: name.to_string(),
            unit: "kg".to_string(),
            unit_price,
            base_quantity,
        }
    }

    fn pilau() -> Recipe {
        Recipe {
            dish_id: 1,
            catalog: Catalog::Custom,
            name: "Pilau".to_string(),
            base_servings: 20,
            markup: 55.0,
            lines: vec![line(1, "Rice", 120.0, 4.0), line(2, "Beef", 600.0, 3.0)],
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_price_pilau_for_ten_guests() {
        let price = price_dish(&pilau(), 10).unwrap();

        assert_close(price.breakdown[0].cost, 240.0);
        assert_close(price.breakdown[1].cost, 900.0);
        assert_close(price.total_cost, 1140.0);
        assert_close(price.markup_amount, 627.0);
        assert_close(price.selling_price, 1767.0);
        assert_close(price.breakdown[1].scaled_quantity, 1.5);
    }

    #[test]
    fn test_base_servings_scale_factor_is_one() {
        let recipe = pilau();
        let price = price_dish(&recipe, i64::from(recipe.base_servings)).unwrap();

        let unscaled: f64 = recipe
            .lines
            .iter()
            .map(|l| l.base_quantity * l.unit_price)
            .sum();
        assert_close(price.total_cost, unscaled);
    }

    #[test]
    fn test_selling_price_applies_markup() {
        let recipe = Recipe {
            markup: 37.5,
            lines: vec![line(1, "Chicken", 350.0, 1.2), line(2, "Oil", 200.0, 0.1)],
            ..pilau()
        };

        for guests in [0, 1, 7, 33, 250] {
            let price = price_dish(&recipe, guests).unwrap();
            assert_eq!(
                round_money(price.selling_price),
                round_money(price.total_cost * (1.0 + recipe.markup / 100.0))
            );
        }
    }

    #[test]
    fn test_zero_guests_costs_nothing() {
        let price = price_dish(&pilau(), 0).unwrap();
        assert_eq!(price.total_cost, 0.0);
        assert_eq!(price.selling_price, 0.0);
        assert_eq!(price.breakdown.len(), 2);
    }

    #[test]
    fn test_zero_base_servings_is_invalid() {
        let recipe = Recipe {
            base_servings: 0,
            ..pilau()
        };
        assert!(matches!(
            price_dish(&recipe, 10),
            Err(Error::InvalidDish { .. })
        ));
    }

    #[test]
    fn test_negative_guest_count_is_invalid() {
        assert!(matches!(
            price_dish(&pilau(), -1),
            Err(Error::InvalidDish { .. })
        ));
    }

    #[test]
    fn test_negative_quantity_is_invalid() {
        let recipe = Recipe {
            lines: vec![line(1, "Rice", 120.0, -4.0)],
            ..pilau()
        };
        let err = price_dish(&recipe, 10).unwrap_err();
        assert!(err.to_string().contains("Rice"));
    }

    #[test]
    fn test_rounded_only_touches_money() {
        let recipe = Recipe {
            base_servings: 3,
            markup: 10.0,
            lines: vec![line(1, "Spices", 300.0, 0.1)],
            ..pilau()
        };
        let price = price_dish(&recipe, 7).unwrap();
        let rounded = price.rounded();

        assert_eq!(rounded.total_cost, 70.0);
        assert_eq!(rounded.markup_amount, 7.0);
        assert_eq!(rounded.selling_price, 77.0);
        assert_eq!(rounded.breakdown[0].scaled_quantity, price.breakdown[0].scaled_quantity);
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(1766.999_999), 1767.0);
        assert_eq!(round_money(10.005_1), 10.01);
        assert_eq!(round_money(0.0), 0.0);
    }
}
