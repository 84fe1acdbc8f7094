//! Shared test utilities.
//!
//! Helpers for an in-memory database and for creating catalog entries, chefs, events
//! and bookings with sensible defaults.

use crate::{
    core::{
        booking,
        catalog::{self, DishRef, NewDish},
        chef::{self, NewChef},
        event::{self, EventDetails},
        settings::DepositPolicy,
    },
    entities::{self, Catalog},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness so it shows up only for failing
/// tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Date used for test events.
pub fn test_event_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).unwrap_or_default()
}

/// Creates the Pilau dish in `catalog`.
///
/// # Recipe
/// * 20 base servings, 55% markup
/// * Rice: 4 kg at 120/kg
/// * Beef: 3 kg at 600/kg
///
/// Priced for 10 guests: cost 1140, markup 627, selling price 1767.
pub async fn create_pilau(
    db: &DatabaseConnection,
    catalog: Catalog,
) -> Result<entities::dish::Model> {
    let rice = catalog::create_ingredient(db, catalog, "Rice", "kg", 120.0).await?;
    let beef = catalog::create_ingredient(db, catalog, "Beef", "kg", 600.0).await?;
    catalog::create_dish(
        db,
        NewDish {
            catalog,
            name: "Pilau".to_string(),
            base_servings: 20,
            markup: 55.0,
            description: Some("Spiced rice with beef".to_string()),
            lines: vec![(rice.id, 4.0), (beef.id, 3.0)],
        },
    )
    .await
}

/// Registration details for a chef at the given location.
pub fn chef_in(name: &str, county: &str, sub_county: &str, town: &str) -> NewChef {
    NewChef {
        name: name.to_string(),
        phone: "254700000000".to_string(),
        county: county.to_string(),
        sub_county: sub_county.to_string(),
        town: town.to_string(),
    }
}

/// Creates a chef and marks them verified and approved.
pub async fn create_bookable_chef(
    db: &DatabaseConnection,
    new_chef: NewChef,
) -> Result<entities::chef::Model> {
    let created = chef::create_chef(db, new_chef).await?;
    chef::mark_verified(db, created.id).await?;
    chef::set_approval(db, created.id, true).await
}

/// Creates a bookable chef in Nairobi / Westlands / Parklands.
pub async fn create_test_chef(db: &DatabaseConnection) -> Result<entities::chef::Model> {
    create_bookable_chef(db, chef_in("Test Chef", "Nairobi", "Westlands", "Parklands")).await
}

/// Creates an event for customer 1 with the given dishes and guests, in Parklands.
pub async fn create_event_with_dishes(
    db: &DatabaseConnection,
    dishes: Vec<DishRef>,
    adult_guests: i32,
    child_guests: i32,
) -> Result<entities::event::Model> {
    event::create_event(
        db,
        1,
        EventDetails {
            county: "Nairobi".to_string(),
            sub_county: "Westlands".to_string(),
            town: "Parklands".to_string(),
            adult_guests,
            child_guests,
            event_date: test_event_date(),
            dishes,
        },
    )
    .await
}

/// Creates an event with no dishes at the given location.
pub async fn create_test_event_at(
    db: &DatabaseConnection,
    county: &str,
    sub_county: &str,
    town: &str,
) -> Result<entities::event::Model> {
    event::create_event(
        db,
        1,
        EventDetails {
            county: county.to_string(),
            sub_county: sub_county.to_string(),
            town: town.to_string(),
            adult_guests: 10,
            child_guests: 0,
            event_date: test_event_date(),
            dishes: vec![],
        },
    )
    .await
}

/// Creates an event whose stored total is `total_cost`, bypassing pricing.
pub async fn create_event_with_total(
    db: &DatabaseConnection,
    total_cost: f64,
) -> Result<entities::event::Model> {
    let created = create_test_event_at(db, "Nairobi", "Westlands", "Parklands").await?;
    let mut active_model: entities::event::ActiveModel = created.into();
    active_model.total_cost = Set(total_cost);
    active_model.updated_at = Set(Utc::now());
    active_model.update(db).await.map_err(Into::into)
}

/// Creates a bookable chef, an event costing `total_cost`, and a pending booking at
/// the default 30% deposit.
pub async fn setup_booking_with_total(
    db: &DatabaseConnection,
    total_cost: f64,
) -> Result<(entities::event::Model, entities::booking::Model)> {
    let chef = create_test_chef(db).await?;
    let event = create_event_with_total(db, total_cost).await?;
    let booking =
        booking::create_booking(db, &DepositPolicy::default(), event.id, chef.id).await?;
    Ok((event, booking))
}

/// Moves a booking to confirmed and returns it.
pub async fn set_booking_confirmed(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<entities::booking::Model> {
    booking::confirm_booking(db, booking_id, Utc::now()).await?;
    booking::get_booking_by_id(db, booking_id)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })
}
