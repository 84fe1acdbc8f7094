//! Catalog business logic - Dishes, ingredients and recipe loading.
//!
//! Both menus (standard and custom) share one set of tables partitioned by
//! [`Catalog`]. Event selections refer to dishes with a tagged [`DishRef`] so a
//! mixed list can be resolved without ambiguity. Ingredient lookups never cross
//! catalogs.

use crate::{
    config::catalog::CatalogSeed,
    core::pricing::{self, DishPrice, Recipe, RecipeLine},
    entities::{Catalog, Dish, DishIngredient, Ingredient, dish, dish_ingredient, ingredient},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::{collections::HashMap, fmt, str::FromStr};
use tracing::{debug, info, instrument, warn};

/// A catalog-tagged dish reference, written `std:<id>` or `custom:<id>`.
///
/// A bare integer parses as a standard-catalog id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DishRef {
    /// Catalog the id belongs to
    pub catalog: Catalog,
    /// Dish id within the shared dishes table
    pub id: i64,
}

impl DishRef {
    /// Reference to a standard-catalog dish.
    #[must_use]
    pub const fn standard(id: i64) -> Self {
        Self {
            catalog: Catalog::Standard,
            id,
        }
    }

    /// Reference to a custom-catalog dish.
    #[must_use]
    pub const fn custom(id: i64) -> Self {
        Self {
            catalog: Catalog::Custom,
            id,
        }
    }
}

impl fmt::Display for DishRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.catalog.reference_prefix(), self.id)
    }
}

impl FromStr for DishRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let not_found = || Error::DishNotFound {
            reference: trimmed.to_string(),
        };

        let (catalog, raw_id) = match trimmed.split_once(':') {
            Some(("std" | "standard", id)) => (Catalog::Standard, id),
            Some(("custom", id)) => (Catalog::Custom, id),
            Some(_) => return Err(not_found()),
            None => (Catalog::Standard, trimmed),
        };
        let id = raw_id.trim().parse::<i64>().map_err(|_| not_found())?;
        Ok(Self { catalog, id })
    }
}

/// Parses a stored, comma-separated selection into references, keeping order.
pub fn parse_selection(selection: &str) -> Result<Vec<DishRef>> {
    selection
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Serializes references for storage on an event.
#[must_use]
pub fn format_selection(refs: &[DishRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Creates an ingredient in `catalog`.
pub async fn create_ingredient<C>(
    db: &C,
    catalog: Catalog,
    name: &str,
    unit: &str,
    unit_price: f64,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Ingredient name cannot be empty".to_string(),
        });
    }
    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(Error::InvalidAmount { amount: unit_price });
    }

    ingredient::ActiveModel {
        catalog: Set(catalog),
        name: Set(name.trim().to_string()),
        unit: Set(unit.trim().to_string()),
        unit_price: Set(unit_price),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Input for [`create_dish`].
#[derive(Debug, Clone)]
pub struct NewDish {
    /// Catalog to add the dish to
    pub catalog: Catalog,
    /// Dish name
    pub name: String,
    /// Servings the quantities are written for
    pub base_servings: i32,
    /// Markup percentage
    pub markup: f64,
    /// Optional description
    pub description: Option<String>,
    /// `(ingredient_id, quantity_for_base_servings)` in recipe order
    pub lines: Vec<(i64, f64)>,
}

/// Creates a dish and its ingredient lines atomically.
///
/// # Errors
/// Returns an error if the dish would be unpriceable (non-positive servings, negative
/// markup or quantity) or an ingredient does not exist in the dish's catalog.
pub async fn create_dish(db: &DatabaseConnection, new_dish: NewDish) -> Result<dish::Model> {
    let invalid = |reason: String| Error::InvalidDish {
        dish: new_dish.name.clone(),
        reason,
    };

    if new_dish.name.trim().is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }
    if new_dish.base_servings <= 0 {
        return Err(invalid("base servings must be greater than zero".to_string()));
    }
    if !new_dish.markup.is_finite() || new_dish.markup < 0.0 {
        return Err(invalid(format!("invalid markup {}", new_dish.markup)));
    }
    if let Some((id, qty)) = new_dish
        .lines
        .iter()
        .find(|(_, qty)| !qty.is_finite() || *qty < 0.0)
    {
        return Err(invalid(format!("invalid quantity {qty} for ingredient {id}")));
    }

    let txn = db.begin().await?;

    for (ingredient_id, _) in &new_dish.lines {
        let found = Ingredient::find_by_id(*ingredient_id)
            .filter(ingredient::Column::Catalog.eq(new_dish.catalog))
            .one(&txn)
            .await?;
        if found.is_none() {
            return Err(invalid(format!(
                "ingredient {ingredient_id} not in {:?} catalog",
                new_dish.catalog
            )));
        }
    }

    let dish = dish::ActiveModel {
        catalog: Set(new_dish.catalog),
        name: Set(new_dish.name.trim().to_string()),
        base_servings: Set(new_dish.base_servings),
        markup: Set(new_dish.markup),
        description: Set(new_dish.description.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (position, (ingredient_id, quantity)) in new_dish.lines.iter().enumerate() {
        dish_ingredient::ActiveModel {
            dish_id: Set(dish.id),
            ingredient_id: Set(*ingredient_id),
            quantity_for_base_servings: Set(*quantity),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok(dish)
}

/// Finds a dish by reference; a dish in the other catalog does not match.
pub async fn get_dish<C>(db: &C, dish_ref: DishRef) -> Result<Option<dish::Model>>
where
    C: ConnectionTrait,
{
    Dish::find_by_id(dish_ref.id)
        .filter(dish::Column::Catalog.eq(dish_ref.catalog))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Searches one catalog for dishes whose name contains `query`, alphabetically.
pub async fn search_dishes(
    db: &DatabaseConnection,
    catalog: Catalog,
    query: &str,
) -> Result<Vec<dish::Model>> {
    Dish::find()
        .filter(dish::Column::Catalog.eq(catalog))
        .filter(dish::Column::Name.contains(query.trim()))
        .order_by_asc(dish::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a dish with its ingredient lines in recipe order.
///
/// Returns `Ok(None)` when the reference does not resolve.
pub async fn load_recipe<C>(db: &C, dish_ref: DishRef) -> Result<Option<Recipe>>
where
    C: ConnectionTrait,
{
    let Some(dish) = get_dish(db, dish_ref).await? else {
        return Ok(None);
    };

    let rows = DishIngredient::find()
        .filter(dish_ingredient::Column::DishId.eq(dish.id))
        .order_by_asc(dish_ingredient::Column::Position)
        .order_by_asc(dish_ingredient::Column::Id)
        .find_also_related(Ingredient)
        .all(db)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    for (row, ingredient) in rows {
        let ingredient = ingredient.ok_or_else(|| Error::InvalidDish {
            dish: dish.name.clone(),
            reason: format!("ingredient {} is missing", row.ingredient_id),
        })?;
        lines.push(RecipeLine {
            ingredient_id: ingredient.id,
            ingredient: ingredient.name,
            unit: ingredient.unit,
            unit_price: ingredient.unit_price,
            base_quantity: row.quantity_for_base_servings,
        });
    }

    Ok(Some(Recipe {
        dish_id: dish.id,
        catalog: dish.catalog,
        name: dish.name,
        base_servings: dish.base_servings,
        markup: dish.markup,
        lines,
    }))
}

/// Loads every referenced recipe, failing on the first reference that does not resolve.
pub async fn load_recipes<C>(db: &C, refs: &[DishRef]) -> Result<Vec<Recipe>>
where
    C: ConnectionTrait,
{
    let mut recipes = Vec::with_capacity(refs.len());
    for dish_ref in refs {
        let recipe = load_recipe(db, *dish_ref).await?.ok_or_else(|| {
            warn!("Dish reference {dish_ref} did not resolve");
            Error::DishNotFound {
                reference: dish_ref.to_string(),
            }
        })?;
        recipes.push(recipe);
    }
    Ok(recipes)
}

/// Prices a single dish for display, rounded to cents.
pub async fn quote_dish(
    db: &DatabaseConnection,
    dish_ref: DishRef,
    guest_count: i64,
) -> Result<DishPrice> {
    let recipe = load_recipe(db, dish_ref)
        .await?
        .ok_or_else(|| Error::DishNotFound {
            reference: dish_ref.to_string(),
        })?;
    Ok(pricing::price_dish(&recipe, guest_count)?.rounded())
}

/// Counts of what [`seed_catalog`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Ingredients inserted
    pub ingredients_created: usize,
    /// Dishes inserted
    pub dishes_created: usize,
    /// Dishes already present and left untouched
    pub dishes_skipped: usize,
}

/// Inserts the configured catalog entries that are not already present.
///
/// Ingredients are matched by name within their catalog and reused; dishes are
/// matched by name within their catalog and skipped if present.
#[instrument(skip(db, seed))]
pub async fn seed_catalog(db: &DatabaseConnection, seed: &CatalogSeed) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let mut ingredient_ids: HashMap<(Catalog, String), i64> = HashMap::new();

    for entry in &seed.ingredients {
        let existing = Ingredient::find()
            .filter(ingredient::Column::Catalog.eq(entry.catalog))
            .filter(ingredient::Column::Name.eq(entry.name.trim()))
            .one(db)
            .await?;
        let id = if let Some(found) = existing {
            found.id
        } else {
            report.ingredients_created += 1;
            create_ingredient(db, entry.catalog, &entry.name, &entry.unit, entry.unit_price)
                .await?
                .id
        };
        ingredient_ids.insert((entry.catalog, entry.name.trim().to_string()), id);
    }

    for entry in &seed.dishes {
        let existing = Dish::find()
            .filter(dish::Column::Catalog.eq(entry.catalog))
            .filter(dish::Column::Name.eq(entry.name.trim()))
            .one(db)
            .await?;
        if existing.is_some() {
            debug!("Dish '{}' already seeded, skipping", entry.name);
            report.dishes_skipped += 1;
            continue;
        }

        let mut lines = Vec::with_capacity(entry.ingredients.len());
        for line in &entry.ingredients {
            let key = (entry.catalog, line.name.trim().to_string());
            let id = match ingredient_ids.get(&key) {
                Some(id) => *id,
                None => Ingredient::find()
                    .filter(ingredient::Column::Catalog.eq(entry.catalog))
                    .filter(ingredient::Column::Name.eq(line.name.trim()))
                    .one(db)
                    .await?
                    .map(|found| found.id)
                    .ok_or_else(|| Error::Config {
                        message: format!(
                            "Dish '{}' uses unknown ingredient '{}'",
                            entry.name, line.name
                        ),
                    })?,
            };
            lines.push((id, line.quantity));
        }

        create_dish(
            db,
            NewDish {
                catalog: entry.catalog,
                name: entry.name.clone(),
                base_servings: entry.base_servings,
                markup: entry.markup,
                description: entry.description.clone(),
                lines,
            },
        )
        .await?;
        report.dishes_created += 1;
    }

    info!(
        "Catalog seeded: {} ingredients created, {} dishes created, {} dishes skipped",
        report.ingredients_created, report.dishes_created, report.dishes_skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::catalog::{DishLineSeed, DishSeed, IngredientSeed};
    use crate::test_utils::*;

    #[test]
    fn test_dish_ref_parsing() {
        assert_eq!("std:3".parse::<DishRef>().unwrap(), DishRef::standard(3));
        assert_eq!("custom:7".parse::<DishRef>().unwrap(), DishRef::custom(7));
        assert_eq!(" 12 ".parse::<DishRef>().unwrap(), DishRef::standard(12));
        assert!(matches!(
            "special:1".parse::<DishRef>(),
            Err(Error::DishNotFound { .. })
        ));
        assert!("custom:abc".parse::<DishRef>().is_err());
    }

    #[test]
    fn test_selection_round_trip_keeps_order() {
        let refs = vec![DishRef::custom(2), DishRef::standard(1), DishRef::custom(9)];
        let stored = format_selection(&refs);
        assert_eq!(stored, "custom:2,std:1,custom:9");
        assert_eq!(parse_selection(&stored).unwrap(), refs);
        assert!(parse_selection("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_recipe_keeps_line_order() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;

        let recipe = load_recipe(&db, DishRef::custom(pilau.id)).await?.unwrap();
        assert_eq!(recipe.name, "Pilau");
        assert_eq!(recipe.lines.len(), 2);
        assert_eq!(recipe.lines[0].ingredient, "Rice");
        assert_eq!(recipe.lines[1].ingredient, "Beef");
        assert_eq!(recipe.lines[1].base_quantity, 3.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_dish_not_visible_from_other_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;

        assert!(load_recipe(&db, DishRef::standard(pilau.id)).await?.is_none());
        let result = load_recipes(&db, &[DishRef::standard(pilau.id)]).await;
        assert!(matches!(result, Err(Error::DishNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_dish_rejects_foreign_ingredient() -> Result<()> {
        let db = setup_test_db().await?;
        let rice = create_ingredient(&db, Catalog::Standard, "Rice", "kg", 120.0).await?;

        let result = create_dish(
            &db,
            NewDish {
                catalog: Catalog::Custom,
                name: "Pilau".to_string(),
                base_servings: 20,
                markup: 55.0,
                description: None,
                lines: vec![(rice.id, 4.0)],
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidDish { .. })));
        assert!(search_dishes(&db, Catalog::Custom, "pil").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_dish_rejects_zero_servings() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_dish(
            &db,
            NewDish {
                catalog: Catalog::Standard,
                name: "Ghost".to_string(),
                base_servings: 0,
                markup: 10.0,
                description: None,
                lines: vec![],
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidDish { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_is_partitioned_by_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        create_pilau(&db, Catalog::Custom).await?;
        create_pilau(&db, Catalog::Standard).await?;

        let custom = search_dishes(&db, Catalog::Custom, "pil").await?;
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].catalog, Catalog::Custom);

        assert!(search_dishes(&db, Catalog::Custom, "curry").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_quote_dish_is_rounded() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;

        let quote = quote_dish(&db, DishRef::custom(pilau.id), 10).await?;
        assert_eq!(quote.total_cost, 1140.0);
        assert_eq!(quote.markup_amount, 627.0);
        assert_eq!(quote.selling_price, 1767.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let seed = CatalogSeed {
            ingredients: vec![IngredientSeed {
                catalog: Catalog::Standard,
                name: "Maize Flour".to_string(),
                unit: "kg".to_string(),
                unit_price: 80.0,
            }],
            dishes: vec![DishSeed {
                catalog: Catalog::Standard,
                name: "Ugali".to_string(),
                base_servings: 4,
                markup: 30.0,
                description: None,
                ingredients: vec![DishLineSeed {
                    name: "Maize Flour".to_string(),
                    quantity: 1.0,
                }],
            }],
        };

        let first = seed_catalog(&db, &seed).await?;
        assert_eq!(first.ingredients_created, 1);
        assert_eq!(first.dishes_created, 1);

        let second = seed_catalog(&db, &seed).await?;
        assert_eq!(second.ingredients_created, 0);
        assert_eq!(second.dishes_created, 0);
        assert_eq!(second.dishes_skipped, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_unknown_ingredient() -> Result<()> {
        let db = setup_test_db().await?;
        let seed = CatalogSeed {
            ingredients: vec![],
            dishes: vec![DishSeed {
                catalog: Catalog::Custom,
                name: "Mystery".to_string(),
                base_servings: 4,
                markup: 30.0,
                description: None,
                ingredients: vec![DishLineSeed {
                    name: "Unobtainium".to_string(),
                    quantity: 1.0,
                }],
            }],
        };

        assert!(matches!(
            seed_catalog(&db, &seed).await,
            Err(Error::Config { .. })
        ));
        Ok(())
    }
}
