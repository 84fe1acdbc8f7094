//! Chef business logic - Registration state and matching chefs to events.
//!
//! Matching narrows by location: chefs in the event's town first, then its
//! sub-county, then its county. Only verified and approved chefs are ever returned.

use crate::{
    entities::{Chef, chef, event},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Input for [`create_chef`].
#[derive(Debug, Clone)]
pub struct NewChef {
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// County
    pub county: String,
    /// Sub-county
    pub sub_county: String,
    /// Town
    pub town: String,
}

/// Registers a chef. New chefs are neither verified nor approved.
pub async fn create_chef(db: &DatabaseConnection, new_chef: NewChef) -> Result<chef::Model> {
    if new_chef.name.trim().is_empty() {
        return Err(Error::Config {
            message: "Chef name cannot be empty".to_string(),
        });
    }

    chef::ActiveModel {
        name: Set(new_chef.name.trim().to_string()),
        phone: Set(new_chef.phone),
        county: Set(new_chef.county),
        sub_county: Set(new_chef.sub_county),
        town: Set(new_chef.town),
        is_verified: Set(false),
        is_approved: Set(false),
        rating_total: Set(0),
        rating_count: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a chef by id.
pub async fn get_chef_by_id<C>(db: &C, chef_id: i64) -> Result<Option<chef::Model>>
where
    C: ConnectionTrait,
{
    Chef::find_by_id(chef_id).one(db).await.map_err(Into::into)
}

/// Marks a chef's contact details as verified.
pub async fn mark_verified(db: &DatabaseConnection, chef_id: i64) -> Result<chef::Model> {
    let chef = get_chef_by_id(db, chef_id)
        .await?
        .ok_or(Error::ChefNotFound { id: chef_id })?;
    let mut active_model: chef::ActiveModel = chef.into();
    active_model.is_verified = Set(true);
    active_model.update(db).await.map_err(Into::into)
}

/// Approves or withdraws approval for a chef.
pub async fn set_approval(
    db: &DatabaseConnection,
    chef_id: i64,
    approved: bool,
) -> Result<chef::Model> {
    let chef = get_chef_by_id(db, chef_id)
        .await?
        .ok_or(Error::ChefNotFound { id: chef_id })?;
    let mut active_model: chef::ActiveModel = chef.into();
    active_model.is_approved = Set(approved);
    active_model.update(db).await.map_err(Into::into)
}

/// Returns bookable chefs for an event, widening from town to sub-county to county.
pub async fn match_chefs_for_event(
    db: &DatabaseConnection,
    event: &event::Model,
) -> Result<Vec<chef::Model>> {
    let bookable = || {
        Chef::find()
            .filter(chef::Column::IsVerified.eq(true))
            .filter(chef::Column::IsApproved.eq(true))
            .filter(chef::Column::County.eq(event.county.as_str()))
            .order_by_asc(chef::Column::Name)
    };

    let in_town = bookable()
        .filter(chef::Column::SubCounty.eq(event.sub_county.as_str()))
        .filter(chef::Column::Town.eq(event.town.as_str()))
        .all(db)
        .await?;
    if !in_town.is_empty() {
        return Ok(in_town);
    }

    let in_sub_county = bookable()
        .filter(chef::Column::SubCounty.eq(event.sub_county.as_str()))
        .all(db)
        .await?;
    if !in_sub_county.is_empty() {
        return Ok(in_sub_county);
    }

    debug!(
        "No chefs in {}/{} for event {}, widening to county",
        event.sub_county, event.town, event.id
    );
    bookable().all(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_new_chef_is_not_bookable() -> Result<()> {
        let db = setup_test_db().await?;
        let chef = create_chef(&db, chef_in("Wanjiku", "Nairobi", "Westlands", "Parklands"))
            .await?;
        assert!(!chef.is_bookable());
        assert!(chef.average_rating().is_none());

        mark_verified(&db, chef.id).await?;
        let chef = set_approval(&db, chef.id, true).await?;
        assert!(chef.is_bookable());
        Ok(())
    }

    #[tokio::test]
    async fn test_match_prefers_town_then_widens() -> Result<()> {
        let db = setup_test_db().await?;
        let town = create_bookable_chef(&db, chef_in("A", "Nairobi", "Westlands", "Parklands"))
            .await?;
        let sub = create_bookable_chef(&db, chef_in("B", "Nairobi", "Westlands", "Kangemi"))
            .await?;
        let county = create_bookable_chef(&db, chef_in("C", "Nairobi", "Langata", "Karen"))
            .await?;
        // Unapproved chefs never match
        create_chef(&db, chef_in("D", "Nairobi", "Westlands", "Parklands")).await?;

        let event = create_test_event_at(&db, "Nairobi", "Westlands", "Parklands").await?;
        let matched = match_chefs_for_event(&db, &event).await?;
        assert_eq!(matched, vec![town.clone()]);

        let event = create_test_event_at(&db, "Nairobi", "Westlands", "Lavington").await?;
        let matched = match_chefs_for_event(&db, &event).await?;
        assert_eq!(matched, vec![town.clone(), sub.clone()]);

        let event = create_test_event_at(&db, "Nairobi", "Embakasi", "Utawala").await?;
        let matched = match_chefs_for_event(&db, &event).await?;
        assert_eq!(matched.len(), 3);
        assert!(matched.contains(&county));

        let event = create_test_event_at(&db, "Mombasa", "Nyali", "Nyali").await?;
        assert!(match_chefs_for_event(&db, &event).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_approval_of_missing_chef() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            set_approval(&db, 404, true).await,
            Err(Error::ChefNotFound { id: 404 })
        ));
        Ok(())
    }
}
