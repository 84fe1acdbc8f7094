//! Event business logic - Cost aggregation, creation and edits.
//!
//! An event's `total_cost` is the sum of the selling prices of every selected dish,
//! each priced for the full guest count (adults plus children, counted alike). The
//! stored total is rounded to cents; the per-dish figures are not.

use crate::{
    core::{
        booking::{self, BookingChange},
        catalog::{self, DishRef},
        pricing::{self, DishPrice, Recipe, round_money},
        settings::DepositPolicy,
    },
    entities::{Event, event},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Priced line of an event quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteLine {
    /// Dish the line prices
    pub dish: String,
    /// Reference as stored on the event
    pub reference: String,
    /// Dish price for the event's guest count
    pub price: DishPrice,
}

/// Aggregated cost of a dish selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventQuote {
    /// Guests priced for
    pub guest_count: i64,
    /// One line per selected dish, in selection order
    pub lines: Vec<QuoteLine>,
    /// Sum of the lines' selling prices
    pub total_cost: f64,
}

/// Prices every recipe for `guest_count` guests and sums the selling prices.
///
/// # Errors
/// Propagates [`Error::InvalidDish`] from the first recipe that cannot be priced.
pub fn aggregate(recipes: &[Recipe], guest_count: i64) -> Result<EventQuote> {
    let mut lines = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let price = pricing::price_dish(recipe, guest_count)?;
        lines.push(QuoteLine {
            dish: recipe.name.clone(),
            reference: DishRef {
                catalog: recipe.catalog,
                id: recipe.dish_id,
            }
            .to_string(),
            price,
        });
    }

    let total_cost = lines.iter().map(|line| line.price.selling_price).sum();
    Ok(EventQuote {
        guest_count,
        lines,
        total_cost,
    })
}

fn validate_guests(adult_guests: i32, child_guests: i32) -> Result<i64> {
    if adult_guests < 0 || child_guests < 0 {
        return Err(Error::InvalidGuestCount {
            adults: adult_guests,
            children: child_guests,
        });
    }
    Ok(i64::from(adult_guests) + i64::from(child_guests))
}

/// Quotes a dish selection without saving anything.
pub async fn quote_event<C>(
    db: &C,
    dishes: &[DishRef],
    adult_guests: i32,
    child_guests: i32,
) -> Result<EventQuote>
where
    C: ConnectionTrait,
{
    let guest_count = validate_guests(adult_guests, child_guests)?;
    let recipes = catalog::load_recipes(db, dishes).await?;
    aggregate(&recipes, guest_count)
}

/// Everything a customer chooses about an event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    /// County of the venue
    pub county: String,
    /// Sub-county of the venue
    pub sub_county: String,
    /// Town of the venue
    pub town: String,
    /// Adult guests
    pub adult_guests: i32,
    /// Child guests
    pub child_guests: i32,
    /// Date of the event
    pub event_date: NaiveDate,
    /// Selected dishes, in order
    pub dishes: Vec<DishRef>,
}

impl EventDetails {
    /// Current details of a stored event, as a starting point for an edit.
    ///
    /// # Errors
    /// Returns [`Error::DishNotFound`] if the stored selection is malformed.
    pub fn from_model(event: &event::Model) -> Result<Self> {
        Ok(Self {
            county: event.county.clone(),
            sub_county: event.sub_county.clone(),
            town: event.town.clone(),
            adult_guests: event.adult_guests,
            child_guests: event.child_guests,
            event_date: event.event_date,
            dishes: catalog::parse_selection(&event.dish_selection)?,
        })
    }
}

/// Creates an event for `customer_id`, pricing the selection.
///
/// # Errors
/// Returns an error if a guest count is negative, a dish reference does not resolve,
/// or a dish cannot be priced.
#[instrument(skip(db, details))]
pub async fn create_event(
    db: &DatabaseConnection,
    customer_id: i64,
    details: EventDetails,
) -> Result<event::Model> {
    let quote = quote_event(db, &details.dishes, details.adult_guests, details.child_guests)
        .await?;
    let now = Utc::now();

    let event = event::ActiveModel {
        customer_id: Set(customer_id),
        county: Set(details.county),
        sub_county: Set(details.sub_county),
        town: Set(details.town),
        adult_guests: Set(details.adult_guests),
        child_guests: Set(details.child_guests),
        event_date: Set(details.event_date),
        dish_selection: Set(catalog::format_selection(&details.dishes)),
        total_cost: Set(round_money(quote.total_cost)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Event {} created for customer {}: {} dishes, {} guests, total {:.2}",
        event.id,
        customer_id,
        details.dishes.len(),
        quote.guest_count,
        event.total_cost
    );
    Ok(event)
}

/// Finds an event by id.
pub async fn get_event_by_id<C>(db: &C, event_id: i64) -> Result<Option<event::Model>>
where
    C: ConnectionTrait,
{
    Event::find_by_id(event_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// A customer's events, soonest first.
pub async fn get_events_for_customer(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Vec<event::Model>> {
    Event::find()
        .filter(event::Column::CustomerId.eq(customer_id))
        .order_by_asc(event::Column::EventDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Result of [`edit_event`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventEdit {
    /// Event after the edit
    pub event: event::Model,
    /// Total before the edit
    pub previous_total: f64,
    /// What happened to the event's booking
    pub change: BookingChange,
}

/// Replaces an event's details, recomputes its total and re-derives its booking's
/// deposit, all in one transaction.
///
/// # Errors
/// Returns an error if the event does not exist or the new selection cannot be
/// priced. Nothing is written in that case.
#[instrument(skip(db, policy, details))]
pub async fn edit_event(
    db: &DatabaseConnection,
    policy: &DepositPolicy,
    event_id: i64,
    details: EventDetails,
) -> Result<EventEdit> {
    let txn = db.begin().await?;

    let existing = get_event_by_id(&txn, event_id)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;
    let quote = quote_event(
        &txn,
        &details.dishes,
        details.adult_guests,
        details.child_guests,
    )
    .await?;

    let previous_total = existing.total_cost;
    let new_total = round_money(quote.total_cost);

    let mut active_model: event::ActiveModel = existing.into();
    active_model.county = Set(details.county);
    active_model.sub_county = Set(details.sub_county);
    active_model.town = Set(details.town);
    active_model.adult_guests = Set(details.adult_guests);
    active_model.child_guests = Set(details.child_guests);
    active_model.event_date = Set(details.event_date);
    active_model.dish_selection = Set(catalog::format_selection(&details.dishes));
    active_model.total_cost = Set(new_total);
    active_model.updated_at = Set(Utc::now());
    let event = active_model.update(&txn).await?;

    let change =
        booking::apply_event_cost_change(&txn, policy, event_id, previous_total, new_total)
            .await?;

    txn.commit().await?;

    info!(
        "Event {} edited: total {:.2} -> {:.2}",
        event.id, previous_total, new_total
    );
    Ok(EventEdit {
        event,
        previous_total,
        change,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Catalog;
    use crate::test_utils::*;

    #[test]
    fn test_aggregate_empty_selection_is_zero() {
        let quote = aggregate(&[], 40).unwrap();
        assert!(quote.lines.is_empty());
        assert_eq!(quote.total_cost, 0.0);
    }

    #[tokio::test]
    async fn test_children_count_as_full_guests() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;
        let dishes = [DishRef::custom(pilau.id)];

        let adults_only = quote_event(&db, &dishes, 10, 0).await?;
        let mixed = quote_event(&db, &dishes, 6, 4).await?;
        assert_eq!(round_money(adults_only.total_cost), 1767.0);
        assert_eq!(adults_only.total_cost, mixed.total_cost);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_sums_mixed_catalogs() -> Result<()> {
        let db = setup_test_db().await?;
        let custom = create_pilau(&db, Catalog::Custom).await?;
        let standard = create_pilau(&db, Catalog::Standard).await?;

        let quote = quote_event(
            &db,
            &[DishRef::standard(standard.id), DishRef::custom(custom.id)],
            10,
            0,
        )
        .await?;
        assert_eq!(quote.lines.len(), 2);
        assert_eq!(quote.lines[0].reference, format!("std:{}", standard.id));
        assert_eq!(round_money(quote.total_cost), 3534.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_guests_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = quote_event(&db, &[], 5, -1).await;
        assert!(matches!(
            result,
            Err(Error::InvalidGuestCount {
                adults: 5,
                children: -1
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_event_stores_selection_and_total() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;

        let event = create_event_with_dishes(&db, vec![DishRef::custom(pilau.id)], 8, 2).await?;
        assert_eq!(event.total_cost, 1767.0);
        assert_eq!(event.dish_selection, format!("custom:{}", pilau.id));
        assert_eq!(event.guest_count(), 10);

        let details = EventDetails::from_model(&event)?;
        assert_eq!(details.dishes, vec![DishRef::custom(pilau.id)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_event_unknown_dish_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_event_with_dishes(&db, vec![DishRef::standard(404)], 10, 0).await;
        assert!(matches!(result, Err(Error::DishNotFound { .. })));
        assert!(get_events_for_customer(&db, 1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_event_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;
        let event = create_event_with_dishes(&db, vec![DishRef::custom(pilau.id)], 10, 0).await?;

        let details = EventDetails {
            dishes: vec![DishRef::custom(pilau.id), DishRef::custom(999)],
            ..EventDetails::from_model(&event)?
        };
        let result = edit_event(&db, &DepositPolicy::default(), event.id, details).await;
        assert!(matches!(result, Err(Error::DishNotFound { .. })));

        let stored = get_event_by_id(&db, event.id).await?.unwrap();
        assert_eq!(stored, event);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_without_booking() -> Result<()> {
        let db = setup_test_db().await?;
        let pilau = create_pilau(&db, Catalog::Custom).await?;
        let event = create_event_with_dishes(&db, vec![DishRef::custom(pilau.id)], 10, 0).await?;

        let details = EventDetails {
            child_guests: 10,
            ..EventDetails::from_model(&event)?
        };
        let edit = edit_event(&db, &DepositPolicy::default(), event.id, details).await?;
        assert_eq!(edit.previous_total, 1767.0);
        assert_eq!(edit.event.total_cost, 3534.0);
        assert_eq!(edit.change, BookingChange::NoBooking);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_missing_event() -> Result<()> {
        let db = setup_test_db().await?;
        let details = EventDetails {
            county: "Nairobi".to_string(),
            sub_county: "Westlands".to_string(),
            town: "Parklands".to_string(),
            adult_guests: 1,
            child_guests: 0,
            event_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            dishes: vec![],
        };
        let result = edit_event(&db, &DepositPolicy::default(), 77, details).await;
        assert!(matches!(result, Err(Error::EventNotFound { id: 77 })));
        Ok(())
    }
}
