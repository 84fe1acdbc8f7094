//! Booking business logic - The booking lifecycle.
//!
//! A booking is created `pending` with a deposit derived from the event total and the
//! [`DepositPolicy`] in force. A successful payment moves it to `confirmed`. When the
//! event is edited afterwards the deposit is recomputed: a higher deposit sends the
//! booking back to `pending` until the difference is paid, a lower or equal one is
//! accepted as-is (no refunds are modelled).
//!
//! State changes are conditional updates (`... WHERE status = 'pending'`) so that two
//! completion paths racing on the same booking converge on the same row state.

use crate::{
    core::{chef::get_chef_by_id, payment, pricing::round_money, settings::DepositPolicy},
    entities::{Booking, BookingStatus, Event, booking},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Creates a pending booking linking `event_id` to `chef_id`.
///
/// The deposit is `event.total_cost * policy.percentage / 100`, rounded to cents.
///
/// # Errors
/// Returns an error if:
/// - The event does not exist
/// - The chef does not exist or is not verified and approved
/// - The event already has a booking
#[instrument(skip(db, policy))]
pub async fn create_booking(
    db: &DatabaseConnection,
    policy: &DepositPolicy,
    event_id: i64,
    chef_id: i64,
) -> Result<booking::Model> {
    let txn = db.begin().await?;

    let event = Event::find_by_id(event_id)
        .one(&txn)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;

    let chef = get_chef_by_id(&txn, chef_id)
        .await?
        .filter(crate::entities::chef::Model::is_bookable)
        .ok_or(Error::ChefNotFound { id: chef_id })?;

    if get_booking_for_event(&txn, event_id).await?.is_some() {
        return Err(Error::BookingAlreadyExists { event_id });
    }

    let booking = booking::ActiveModel {
        event_id: Set(event.id),
        chef_id: Set(chef.id),
        deposit_amount: Set(policy.deposit_for(event.total_cost)),
        status: Set(BookingStatus::Pending),
        rating_value: Set(None),
        rating_comment: Set(None),
        rating_submitted_at: Set(None),
        created_at: Set(Utc::now()),
        confirmed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        "Booking {} created for event {} with chef {}, deposit {:.2}",
        booking.id, event.id, chef.id, booking.deposit_amount
    );
    Ok(booking)
}

/// Finds a booking by id.
pub async fn get_booking_by_id<C>(db: &C, booking_id: i64) -> Result<Option<booking::Model>>
where
    C: ConnectionTrait,
{
    Booking::find_by_id(booking_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the booking attached to an event, if any.
pub async fn get_booking_for_event<C>(db: &C, event_id: i64) -> Result<Option<booking::Model>>
where
    C: ConnectionTrait,
{
    Booking::find()
        .filter(booking::Column::EventId.eq(event_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All bookings for a chef, newest first.
pub async fn get_bookings_for_chef(
    db: &DatabaseConnection,
    chef_id: i64,
) -> Result<Vec<booking::Model>> {
    Booking::find()
        .filter(booking::Column::ChefId.eq(chef_id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// What an event edit did to its booking.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingChange {
    /// The event has no booking; only its total changed
    NoBooking,
    /// The deposit went up; the booking is pending until the difference is paid
    DepositIncreased {
        /// Booking after the change
        booking: booking::Model,
        /// Deposit before the edit
        previous_deposit: f64,
        /// `new_deposit - previous_deposit`
        additional_deposit: f64,
    },
    /// The deposit stayed the same or went down; a confirmed booking stays confirmed
    DepositAdjusted {
        /// Booking after the change
        booking: booking::Model,
        /// Deposit before the edit
        previous_deposit: f64,
    },
}

impl BookingChange {
    /// Extra money the customer must pay because of the edit.
    #[must_use]
    pub const fn additional_deposit(&self) -> f64 {
        match self {
            Self::DepositIncreased {
                additional_deposit, ..
            } => *additional_deposit,
            Self::NoBooking | Self::DepositAdjusted { .. } => 0.0,
        }
    }

    /// Whether a new payment cycle is required.
    #[must_use]
    pub const fn requires_payment(&self) -> bool {
        matches!(self, Self::DepositIncreased { .. })
    }
}

/// Re-derives the booking deposit after an event's total changed from `old_total` to
/// `new_total`. Runs on the caller's connection so it joins the edit's transaction.
pub(crate) async fn apply_event_cost_change<C>(
    db: &C,
    policy: &DepositPolicy,
    event_id: i64,
    old_total: f64,
    new_total: f64,
) -> Result<BookingChange>
where
    C: ConnectionTrait,
{
    let Some(existing) = get_booking_for_event(db, event_id).await? else {
        return Ok(BookingChange::NoBooking);
    };

    let previous_deposit = existing.deposit_amount;
    let new_deposit = policy.deposit_for(new_total);
    let additional_deposit = round_money(new_deposit - previous_deposit);
    let cost_increased = new_total > old_total && additional_deposit > 0.0;

    let previous_status = existing.status;
    let mut active_model: booking::ActiveModel = existing.into();
    active_model.deposit_amount = Set(new_deposit);
    if cost_increased {
        active_model.status = Set(BookingStatus::Pending);
    }
    let booking = active_model.update(db).await?;

    if cost_increased {
        info!(
            "Booking {} deposit raised {:.2} -> {:.2} ({:?} -> pending), additional {:.2} due",
            booking.id, previous_deposit, new_deposit, previous_status, additional_deposit
        );
        Ok(BookingChange::DepositIncreased {
            booking,
            previous_deposit,
            additional_deposit,
        })
    } else {
        // A pending booking whose earlier payments already cover the lowered deposit
        // has nothing left to collect
        let paid = payment::amount_paid(db, booking.id).await?;
        let booking = if booking.status == BookingStatus::Pending
            && paid > 0.0
            && paid >= new_deposit
            && confirm_booking(db, booking.id, Utc::now()).await?
        {
            get_booking_by_id(db, booking.id)
                .await?
                .ok_or(Error::BookingNotFound { id: booking.id })?
        } else {
            booking
        };

        info!(
            "Booking {} deposit adjusted {:.2} -> {:.2}, status {:?}",
            booking.id, previous_deposit, new_deposit, booking.status
        );
        Ok(BookingChange::DepositAdjusted {
            booking,
            previous_deposit,
        })
    }
}

/// Moves a pending booking to confirmed. Returns `false` if it was not pending, in
/// which case nothing is written and `confirmed_at` keeps its earlier value.
pub(crate) async fn confirm_booking<C>(
    db: &C,
    booking_id: i64,
    confirmed_at: DateTime<Utc>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Booking::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Confirmed),
            confirmed_at: Set(Some(confirmed_at)),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Booking {booking_id} confirmed");
    }
    Ok(result.rows_affected > 0)
}
