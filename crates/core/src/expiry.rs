//! Expiry classification.
//!
//! Classification works on whole calendar days. Both sides are dates, so an
//! item expiring tomorrow is "1 day out" whether the query runs at 00:01 or
//! 23:59.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Freshness bucket of a single item relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryStatus {
    #[serde(rename = "no-expiry")]
    NoExpiry,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "expiring-today")]
    ExpiringToday,
    #[serde(rename = "expiring-3-days")]
    ExpiringThreeDays,
    #[serde(rename = "expiring-week")]
    ExpiringWeek,
    #[serde(rename = "ok")]
    Ok,
}

impl ExpiryStatus {
    /// Classify an optional expiry date against `today`.
    ///
    /// | days until expiry | bucket |
    /// |---|---|
    /// | none | `NoExpiry` |
    /// | < 0 | `Expired` |
    /// | 0 | `ExpiringToday` |
    /// | 1..=3 | `ExpiringThreeDays` |
    /// | 4..=7 | `ExpiringWeek` |
    /// | > 7 | `Ok` |
    #[must_use]
    pub fn classify(expiry: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(expiry) = expiry else {
            return Self::NoExpiry;
        };

        match days_until(expiry, today) {
            d if d < 0 => Self::Expired,
            0 => Self::ExpiringToday,
            1..=3 => Self::ExpiringThreeDays,
            4..=7 => Self::ExpiringWeek,
            _ => Self::Ok,
        }
    }


    /// Returns true if the item expires within the next seven days (today included).
    #[must_use]
    pub const fn is_within_week(self) -> bool {
        matches!(
            self,
            Self::ExpiringToday | Self::ExpiringThreeDays | Self::ExpiringWeek
        )
    }
}

/// Signed whole-day difference `expiry - today`.
#[must_use]
pub fn days_until(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

/// Aggregate expiry filter as offered to clients.
///
/// The windows nest: `Week` covers `ThreeDays`, which covers `Today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryFilter {
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "3-days")]
    ThreeDays,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "no-expiry")]
    NoExpiry,
    #[serde(rename = "ok")]
    Ok,
}

impl ExpiryFilter {
    /// Returns true if an item in `status` belongs to this filter.
    #[must_use]
    pub const fn matches(self, status: ExpiryStatus) -> bool {
        match self {
            Self::Expired => matches!(status, ExpiryStatus::Expired),
            Self::Today => matches!(status, ExpiryStatus::ExpiringToday),
            Self::ThreeDays => matches!(
                status,
                ExpiryStatus::ExpiringToday | ExpiryStatus::ExpiringThreeDays
            ),
            Self::Week => status.is_within_week(),
            Self::NoExpiry => matches!(status, ExpiryStatus::NoExpiry),
            Self::Ok => matches!(status, ExpiryStatus::Ok),
        }
    }
}

impl std::str::FromStr for ExpiryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expired" => Ok(Self::Expired),
            "today" => Ok(Self::Today),
            "3-days" => Ok(Self::ThreeDays),
            "week" => Ok(Self::Week),
            "no-expiry" => Ok(Self::NoExpiry),
            "ok" => Ok(Self::Ok),
            _ => Err(format!("invalid expiry filter: {s}")),
        }
    }
}

/// Per-bucket counts for a set of items.
///
/// `expiring_week` is the aggregate "this week" count and includes the
/// today and 3-day buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySummary {
    pub total: usize,
    pub expired: usize,
    pub expiring_today: usize,
    pub expiring_3_days: usize,
    pub expiring_week: usize,
    pub ok: usize,
    pub no_expiry: usize,
}

impl ExpirySummary {
    /// Count the buckets of every expiry date in `expiries`.
    pub fn tally<I>(expiries: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = Option<NaiveDate>>,
    {
        expiries.into_iter().fold(Self::default(), |mut acc, expiry| {
            acc.total += 1;
            let status = ExpiryStatus::classify(expiry, today);
            match status {
                ExpiryStatus::NoExpiry => acc.no_expiry += 1,
                ExpiryStatus::Expired => acc.expired += 1,
                ExpiryStatus::ExpiringToday => acc.expiring_today += 1,
                ExpiryStatus::ExpiringThreeDays => acc.expiring_3_days += 1,
                ExpiryStatus::ExpiringWeek | ExpiryStatus::Ok => {}
            }
            if status == ExpiryStatus::Ok {
                acc.ok += 1;
            }
            if status.is_within_week() {
                acc.expiring_week += 1;
            }
            acc
        })
    }
}
