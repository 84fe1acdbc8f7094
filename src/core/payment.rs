//! Payment business logic - Payment rows, settlement and the payment flow.
//!
//! Settlement is shared by the simulated provider and the gateway callback. It is a
//! conditional update (`status != 'success'`), followed by a conditional booking
//! confirmation in the same transaction when the deposit is covered. Delivering the
//! same success twice, or delivering it through both paths at once, leaves the rows
//! exactly as a single delivery would.

use crate::{
    core::{
        booking::{self, get_booking_by_id},
        gateway::{InitiateResult, PaymentProvider, PushRequest},
        pricing::round_money,
    },
    entities::{
        BookingStatus, Event, Payment, PaymentStatus, booking as booking_entity, event, payment,
    },
    errors::{Error, Result},
};
use chrono::{TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Normalises a Kenyan mobile number to `2547XXXXXXXX` / `2541XXXXXXXX`.
///
/// Accepts `07..`, `01..`, `+254..`, `254..` and the bare nine-digit form, with spaces
/// or dashes.
///
/// # Errors
/// Returns [`Error::InvalidPhoneNumber`] for anything else.
pub fn normalize_phone(input: &str) -> Result<String> {
    let invalid = || Error::InvalidPhoneNumber {
        phone: input.to_string(),
    };

    let trimmed = input.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if without_plus
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-'))
    {
        return Err(invalid());
    }
    let digits: String = without_plus.chars().filter(char::is_ascii_digit).collect();

    let subscriber = if let Some(rest) = digits.strip_prefix("254") {
        rest
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        digits.as_str()
    };

    if subscriber.len() != 9 || !(subscriber.starts_with('7') || subscriber.starts_with('1')) {
        return Err(invalid());
    }
    Ok(format!("254{subscriber}"))
}

/// Records a pending payment attempt.
pub async fn create_pending_payment<C>(
    db: &C,
    booking_id: i64,
    phone_number: &str,
    amount: f64,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    payment::ActiveModel {
        booking_id: Set(booking_id),
        phone_number: Set(phone_number.to_string()),
        amount: Set(round_money(amount)),
        status: Set(PaymentStatus::Pending),
        mpesa_receipt_number: Set(None),
        transaction_id: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a payment by id.
pub async fn get_payment_by_id<C>(db: &C, payment_id: i64) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find_by_id(payment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// The booking's most recent payment of any status.
pub async fn latest_payment_for_booking<C>(
    db: &C,
    booking_id: i64,
) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// The booking's most recent pending payment.
pub async fn latest_pending_payment<C>(
    db: &C,
    booking_id: i64,
) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the payment a gateway correlation id belongs to.
pub async fn find_by_correlation_id<C>(
    db: &C,
    checkout_request_id: &str,
) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::TransactionId.eq(checkout_request_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Stores the gateway correlation id on a payment.
pub async fn attach_correlation_id<C>(
    db: &C,
    payment_id: i64,
    checkout_request_id: &str,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let payment = get_payment_by_id(db, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;
    let mut active_model: payment::ActiveModel = payment.into();
    active_model.transaction_id = Set(Some(checkout_request_id.to_string()));
    active_model.update(db).await?;
    Ok(())
}

/// Marks a pending payment failed. Returns `false` if it was no longer pending.
pub async fn mark_failed<C>(db: &C, payment_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Payment::update_many()
        .set(payment::ActiveModel {
            status: Set(PaymentStatus::Failed),
            ..Default::default()
        })
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Sum of the booking's successful payments.
pub async fn amount_paid<C>(db: &C, booking_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let payments = Payment::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Success))
        .all(db)
        .await?;
    Ok(round_money(payments.iter().map(|p| p.amount).sum()))
}

/// Deposit still owed on a booking, never negative.
pub async fn outstanding_amount<C>(db: &C, booking: &booking_entity::Model) -> Result<f64>
where
    C: ConnectionTrait,
{
    let paid = amount_paid(db, booking.id).await?;
    Ok(round_money((booking.deposit_amount - paid).max(0.0)))
}

/// What [`settle_payment`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The payment moved to success now
    Applied {
        /// Payment after settlement
        payment: payment::Model,
        /// Whether this settlement moved the booking to confirmed
        booking_confirmed: bool,
    },
    /// The payment was already successful; nothing was written
    AlreadySettled {
        /// Payment as stored
        payment: payment::Model,
    },
}

/// Marks a payment successful and confirms its booking once the booking's successful
/// payments cover its deposit.
///
/// A failed payment (for example one expired by the reaper) can still be settled.
/// Settling an already successful payment is a no-op.
///
/// # Errors
/// Returns [`Error::PaymentNotFound`] if no payment has this id.
#[instrument(skip(db, receipt))]
pub async fn settle_payment(
    db: &DatabaseConnection,
    payment_id: i64,
    receipt: Option<String>,
) -> Result<Settlement> {
    let txn = db.begin().await?;
    let now = Utc::now();

    let updated = Payment::update_many()
        .set(payment::ActiveModel {
            status: Set(PaymentStatus::Success),
            mpesa_receipt_number: Set(receipt),
            completed_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.ne(PaymentStatus::Success))
        .exec(&txn)
        .await?;

    let payment = get_payment_by_id(&txn, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;

    if updated.rows_affected == 0 {
        txn.commit().await?;
        debug!("Payment {payment_id} already settled");
        return Ok(Settlement::AlreadySettled { payment });
    }

    let booking = get_booking_by_id(&txn, payment.booking_id)
        .await?
        .ok_or(Error::BookingNotFound {
            id: payment.booking_id,
        })?;
    let paid = amount_paid(&txn, booking.id).await?;
    let booking_confirmed = if paid >= booking.deposit_amount {
        booking::confirm_booking(&txn, booking.id, now).await?
    } else {
        warn!(
            "Booking {} stays {:?}: paid {:.2} of {:.2} deposit",
            booking.id, booking.status, paid, booking.deposit_amount
        );
        false
    };
    txn.commit().await?;

    info!(
        "Payment {} settled for booking {} (receipt {:?})",
        payment.id, payment.booking_id, payment.mpesa_receipt_number
    );
    Ok(Settlement::Applied {
        payment,
        booking_confirmed,
    })
}

/// Fails pending payments older than `max_age`. Returns how many were expired.
#[instrument(skip(db))]
pub async fn expire_stale_payments(db: &DatabaseConnection, max_age: TimeDelta) -> Result<u64> {
    let cutoff = Utc::now() - max_age;
    let result = Payment::update_many()
        .set(payment::ActiveModel {
            status: Set(PaymentStatus::Failed),
            ..Default::default()
        })
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .filter(payment::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!(
            "Expired {} pending payments older than {cutoff}",
            result.rows_affected
        );
    }
    Ok(result.rows_affected)
}

/// Result of [`start_payment`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentAttempt {
    /// Payment row as stored after the provider returned
    pub payment: payment::Model,
    /// What the provider reported
    pub result: InitiateResult,
}

/// Starts collecting the outstanding deposit on a booking.
///
/// Records a pending payment for the outstanding amount, asks `provider` to push the
/// approval prompt, then stores the gateway correlation id (accepted) or marks the
/// payment failed (refused).
///
/// # Errors
/// Returns an error if the booking does not exist, the phone number is invalid, or
/// nothing is owed.
#[instrument(skip(db, provider, phone))]
pub async fn start_payment(
    db: &DatabaseConnection,
    provider: &dyn PaymentProvider,
    booking_id: i64,
    phone: &str,
) -> Result<PaymentAttempt> {
    let booking = get_booking_by_id(db, booking_id)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })?;
    let phone = normalize_phone(phone)?;

    let outstanding = outstanding_amount(db, &booking).await?;
    if booking.status == BookingStatus::Confirmed || outstanding <= 0.0 {
        return Err(Error::NothingToPay { booking_id });
    }

    let pending = create_pending_payment(db, booking.id, &phone, outstanding).await?;
    info!(
        "Payment {} of {:.2} started for booking {} via {}",
        pending.id,
        outstanding,
        booking.id,
        provider.name()
    );

    let request = PushRequest {
        booking_id: booking.id,
        phone,
        amount: outstanding,
    };
    let result = match provider.initiate(db, &request).await {
        Ok(result) => result,
        Err(e) => {
            mark_failed(db, pending.id).await?;
            return Err(e);
        }
    };

    if result.success {
        if let Some(checkout_request_id) = &result.checkout_request_id {
            attach_correlation_id(db, pending.id, checkout_request_id).await?;
        }
    } else if mark_failed(db, pending.id).await? {
        warn!("Payment {} failed: {}", pending.id, result.message);
    }

    let payment = get_payment_by_id(db, pending.id)
        .await?
        .ok_or(Error::PaymentNotFound { id: pending.id })?;
    Ok(PaymentAttempt { payment, result })
}

/// Payment state of a booking, for status polling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatusView {
    /// Booking id
    pub booking_id: i64,
    /// Booking state
    pub booking_status: BookingStatus,
    /// Event the booking is for
    pub event: event::Model,
    /// Deposit required
    pub deposit_amount: f64,
    /// Sum of successful payments
    pub amount_paid: f64,
    /// Deposit still owed
    pub outstanding: f64,
    /// Most recent payment attempt
    pub latest_payment: Option<payment::Model>,
}

/// Builds the payment status of a booking.
pub async fn payment_status(db: &DatabaseConnection, booking_id: i64) -> Result<PaymentStatusView> {
    let booking = get_booking_by_id(db, booking_id)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })?;
    let event = Event::find_by_id(booking.event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound {
            id: booking.event_id,
        })?;
    let paid = amount_paid(db, booking.id).await?;

    Ok(PaymentStatusView {
        booking_id: booking.id,
        booking_status: booking.status,
        event,
        deposit_amount: booking.deposit_amount,
        amount_paid: paid,
        outstanding: round_money((booking.deposit_amount - paid).max(0.0)),
        latest_payment: latest_payment_for_booking(db, booking.id).await?,
    })
}
