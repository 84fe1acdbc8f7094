//! Core business logic, independent of any user interface.
//!
//! Functions take a database connection (or a transaction) and return crate
//! [`Result`](crate::errors::Result)s. Settings such as the deposit percentage are
//! passed in by the caller rather than read here.

pub mod booking;
pub mod catalog;
pub mod chef;
pub mod event;
pub mod gateway;
pub mod payment;
pub mod pricing;
pub mod rating;
pub mod reconcile;
pub mod settings;
