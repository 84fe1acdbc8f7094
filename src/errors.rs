//! Unified error types for the booking and payment core.
//!
//! Every fallible operation in the crate returns [`Result<T>`]. Storage and
//! transport failures convert automatically through `#[from]`; domain
//! validation failures get their own variants so callers can show a precise
//! message without parsing strings.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// HTTP transport failure talking to the payment gateway
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The payment gateway rejected or could not process a request
    #[error("Payment gateway error: {message}")]
    Gateway {
        /// Description surfaced to the caller
        message: String,
    },

    /// I/O failure (config files, callback replay files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// A dish cannot be priced (zero servings, negative quantities, bad guest count)
    #[error("Invalid dish '{dish}': {reason}")]
    InvalidDish {
        /// Dish name
        dish: String,
        /// What is wrong with it
        reason: String,
    },

    /// Monetary amount is negative, zero where not allowed, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Guest counts must be non-negative
    #[error("Invalid guest count: {adults} adults, {children} children")]
    InvalidGuestCount {
        /// Adult guests requested
        adults: i32,
        /// Child guests requested
        children: i32,
    },

    /// Rating values must be between 1 and 5
    #[error("Invalid rating value: {value} (expected 1-5)")]
    InvalidRating {
        /// The rejected value
        value: i32,
    },

    /// Phone number is not a valid mobile-money subscriber number
    #[error("Invalid phone number: {phone}")]
    InvalidPhoneNumber {
        /// The rejected input
        phone: String,
    },

    /// A dish reference in an event selection did not resolve
    #[error("Dish not found: {reference}")]
    DishNotFound {
        /// The unresolved reference as written (e.g. `custom:12`)
        reference: String,
    },

    /// Event does not exist
    #[error("Event not found: {id}")]
    EventNotFound {
        /// Event id
        id: i64,
    },

    /// Chef does not exist or is not bookable
    #[error("Chef not found: {id}")]
    ChefNotFound {
        /// Chef id
        id: i64,
    },

    /// Booking does not exist
    #[error("Booking not found: {id}")]
    BookingNotFound {
        /// Booking id
        id: i64,
    },

    /// Payment does not exist
    #[error("Payment not found: {id}")]
    PaymentNotFound {
        /// Payment id
        id: i64,
    },

    /// The event already has a booking
    #[error("Event {event_id} already has a booking")]
    BookingAlreadyExists {
        /// Event id
        event_id: i64,
    },

    /// Booking has no outstanding deposit
    #[error("Booking {booking_id} has no outstanding deposit")]
    NothingToPay {
        /// Booking id
        booking_id: i64,
    },

    /// The booking cannot be rated in its current state
    #[error("Rating not allowed: {reason}")]
    RatingNotAllowed {
        /// Why the rating was refused
        reason: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
