//! Operator settings stored in the `system_config` table.
//!
//! Values are read fresh on every request and handed to the booking logic as a
//! [`DepositPolicy`] snapshot, so the booking functions never look settings up on
//! their own and tests can pass any percentage they like.

use crate::{
    core::pricing::round_money,
    entities::{SystemConfig, system_config},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Key holding the deposit percentage.
pub const DEPOSIT_PERCENTAGE_KEY: &str = "deposit_percentage";

/// Deposit percentage used when none is configured.
pub const DEFAULT_DEPOSIT_PERCENTAGE: f64 = 30.0;

/// Snapshot of the deposit rule in force for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositPolicy {
    /// Share of the event total collected up front, 0-100
    pub percentage: f64,
}

impl DepositPolicy {
    /// Builds a policy, rejecting percentages outside 0-100.
    pub fn new(percentage: f64) -> Result<Self> {
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(Error::Config {
                message: format!("Deposit percentage must be between 0 and 100, got {percentage}"),
            });
        }
        Ok(Self { percentage })
    }

    /// Deposit owed for an event costing `total_cost`, rounded to cents.
    #[must_use]
    pub fn deposit_for(&self, total_cost: f64) -> f64 {
        round_money(total_cost * self.percentage / 100.0)
    }
}

impl Default for DepositPolicy {
    fn default() -> Self {
        Self {
            percentage: DEFAULT_DEPOSIT_PERCENTAGE,
        }
    }
}

/// Reads a raw value from the `system_config` table.
pub async fn get_config_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let row = SystemConfig::find()
        .filter(system_config::Column::Key.eq(key))
        .one(db)
        .await?;
    Ok(row.map(|r| r.value))
}

/// Inserts or replaces a value in the `system_config` table.
pub async fn set_config_value<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = SystemConfig::find()
        .filter(system_config::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(row) = existing {
        let mut active_model: system_config::ActiveModel = row.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Loads the deposit policy currently configured.
///
/// A missing key yields the default of 30%.
///
/// # Errors
/// Returns [`Error::Config`] if the stored value is not a number in 0-100.
pub async fn load_deposit_policy<C>(db: &C) -> Result<DepositPolicy>
where
    C: ConnectionTrait,
{
    match get_config_value(db, DEPOSIT_PERCENTAGE_KEY).await? {
        Some(raw) => {
            let percentage = raw.trim().parse::<f64>().map_err(|e| Error::Config {
                message: format!("Failed to parse {DEPOSIT_PERCENTAGE_KEY} '{raw}': {e}"),
            })?;
            DepositPolicy::new(percentage)
        }
        None => Ok(DepositPolicy::default()),
    }
}

/// Stores a new deposit percentage after validating it.
pub async fn set_deposit_percentage(db: &DatabaseConnection, percentage: f64) -> Result<()> {
    let policy = DepositPolicy::new(percentage)?;
    set_config_value(db, DEPOSIT_PERCENTAGE_KEY, &policy.percentage.to_string()).await?;
    info!("Deposit percentage set to {}", policy.percentage);
    Ok(())
}

/// Writes the default deposit percentage if no value exists yet.
pub async fn ensure_default_settings(db: &DatabaseConnection) -> Result<()> {
    if get_config_value(db, DEPOSIT_PERCENTAGE_KEY).await?.is_none() {
        set_config_value(db, DEPOSIT_PERCENTAGE_KEY, "30").await?;
        info!("Initialised {DEPOSIT_PERCENTAGE_KEY} to 30");
    }
    Ok(())
}
