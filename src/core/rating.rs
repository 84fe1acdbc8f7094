//! Rating business logic - Customers rate the chef once the event is over.

use crate::{
    core::booking::get_booking_by_id,
    entities::{Booking, BookingStatus, Chef, Event, booking, chef},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Records a 1-5 rating on a confirmed booking whose event date has passed, and adds
/// it to the chef's running totals.
///
/// # Errors
/// Returns an error if:
/// - The value is outside 1-5
/// - The booking does not exist
/// - The booking is not confirmed, its event has not happened yet, or it was already
///   rated
pub async fn submit_rating(
    db: &DatabaseConnection,
    booking_id: i64,
    value: i32,
    comment: Option<String>,
) -> Result<booking::Model> {
    submit_rating_on(db, booking_id, value, comment, Utc::now().date_naive()).await
}

async fn submit_rating_on(
    db: &DatabaseConnection,
    booking_id: i64,
    value: i32,
    comment: Option<String>,
    today: NaiveDate,
) -> Result<booking::Model> {
    if !(1..=5).contains(&value) {
        return Err(Error::InvalidRating { value });
    }

    let txn = db.begin().await?;

    let existing = get_booking_by_id(&txn, booking_id)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })?;
    if existing.status != BookingStatus::Confirmed {
        return Err(Error::RatingNotAllowed {
            reason: format!("booking {booking_id} is not confirmed"),
        });
    }
    if existing.rating_value.is_some() {
        return Err(Error::RatingNotAllowed {
            reason: format!("booking {booking_id} was already rated"),
        });
    }

    let event = Event::find_by_id(existing.event_id)
        .one(&txn)
        .await?
        .ok_or(Error::EventNotFound {
            id: existing.event_id,
        })?;
    if event.event_date >= today {
        return Err(Error::RatingNotAllowed {
            reason: format!("event {} has not taken place yet", event.id),
        });
    }

    let chef_id = existing.chef_id;
    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    // Rate only if nobody rated it since the read above
    let rated = Booking::update_many()
        .set(booking::ActiveModel {
            rating_value: Set(Some(value)),
            rating_comment: Set(comment),
            rating_submitted_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::RatingValue.is_null())
        .exec(&txn)
        .await?;
    if rated.rows_affected == 0 {
        return Err(Error::RatingNotAllowed {
            reason: format!("booking {booking_id} was already rated"),
        });
    }

    let totals = Chef::update_many()
        .col_expr(
            chef::Column::RatingTotal,
            Expr::col(chef::Column::RatingTotal).add(i64::from(value)),
        )
        .col_expr(
            chef::Column::RatingCount,
            Expr::col(chef::Column::RatingCount).add(1_i64),
        )
        .filter(chef::Column::Id.eq(chef_id))
        .exec(&txn)
        .await?;
    if totals.rows_affected == 0 {
        return Err(Error::ChefNotFound { id: chef_id });
    }

    let rated = get_booking_by_id(&txn, booking_id)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })?;
    txn.commit().await?;

    info!("Booking {booking_id} rated {value} for chef {chef_id}");
    Ok(rated)
}

/// Ratings a chef has received, most recent first.
pub async fn ratings_for_chef(
    db: &DatabaseConnection,
    chef_id: i64,
) -> Result<Vec<booking::Model>> {
    Booking::find()
        .filter(booking::Column::ChefId.eq(chef_id))
        .filter(booking::Column::RatingValue.is_not_null())
        .order_by_desc(booking::Column::RatingSubmittedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::booking::create_booking;
    use crate::core::chef::get_chef_by_id;
    use crate::core::settings::DepositPolicy;
    use crate::test_utils::*;

    fn after_event() -> NaiveDate {
        test_event_date() + chrono::Days::new(1)
    }

    #[tokio::test]
    async fn test_rating_updates_chef_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, booking) = setup_booking_with_total(&db, 3000.0).await?;
        set_booking_confirmed(&db, booking.id).await?;

        let rated = submit_rating_on(
            &db,
            booking.id,
            4,
            Some("  Lovely pilau ".to_string()),
            after_event(),
        )
        .await?;
        assert_eq!(rated.rating_value, Some(4));
        assert_eq!(rated.rating_comment.as_deref(), Some("Lovely pilau"));

        let chef = get_chef_by_id(&db, booking.chef_id).await?.unwrap();
        assert_eq!(chef.rating_total, 4);
        assert_eq!(chef.rating_count, 1);
        assert_eq!(chef.average_rating(), Some(4.0));
        assert_eq!(ratings_for_chef(&db, chef.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_ratings_both_count() -> Result<()> {
        let db = setup_test_db().await?;
        let chef = create_test_chef(&db).await?;
        let mut booking_ids = Vec::new();
        for total in [3000.0, 4500.0] {
            let event = create_event_with_total(&db, total).await?;
            let booking =
                create_booking(&db, &DepositPolicy::default(), event.id, chef.id).await?;
            set_booking_confirmed(&db, booking.id).await?;
            booking_ids.push(booking.id);
        }

        let (first, second) = tokio::join!(
            submit_rating_on(&db, booking_ids[0], 5, None, after_event()),
            submit_rating_on(&db, booking_ids[1], 2, None, after_event()),
        );
        first?;
        second?;

        let chef = get_chef_by_id(&db, chef.id).await?.unwrap();
        assert_eq!(chef.rating_total, 7);
        assert_eq!(chef.rating_count, 2);
        assert_eq!(chef.average_rating(), Some(3.5));
        assert_eq!(ratings_for_chef(&db, chef.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_only_once() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, booking) = setup_booking_with_total(&db, 3000.0).await?;
        set_booking_confirmed(&db, booking.id).await?;

        submit_rating_on(&db, booking.id, 5, None, after_event()).await?;
        let second = submit_rating_on(&db, booking.id, 1, None, after_event()).await;
        assert!(matches!(second, Err(Error::RatingNotAllowed { .. })));

        let chef = get_chef_by_id(&db, booking.chef_id).await?.unwrap();
        assert_eq!(chef.rating_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_requires_confirmed_booking() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, booking) = setup_booking_with_total(&db, 3000.0).await?;

        let result = submit_rating_on(&db, booking.id, 5, None, after_event()).await;
        assert!(matches!(result, Err(Error::RatingNotAllowed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_requires_past_event() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, booking) = setup_booking_with_total(&db, 3000.0).await?;
        set_booking_confirmed(&db, booking.id).await?;

        let result = submit_rating_on(&db, booking.id, 5, None, test_event_date()).await;
        assert!(matches!(result, Err(Error::RatingNotAllowed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_value_range() -> Result<()> {
        let db = setup_test_db().await?;
        for value in [0, 6, -3] {
            assert!(matches!(
                submit_rating(&db, 1, value, None).await,
                Err(Error::InvalidRating { .. })
            ));
        }
        Ok(())
    }
}
