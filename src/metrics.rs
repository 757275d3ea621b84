//! Dashboard metrics payloads and the API response envelopes wrapping them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// API path of the metrics endpoint, relative to [`crate::ApiConfig::base_url`].
pub const METRICS_PATH: &str = "/dashboard/metrics";

/// Revenue for the current and previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    pub current: f64,
    pub previous: f64,
    /// Percentage change from `previous` to `current`.
    pub change: f64,
}

/// User counts; `new` is sign-ups in the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub total: u64,
    pub active: u64,
    pub new: u64,
}

/// Order counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMetrics {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
}

/// Traffic figures. `bounce_rate` is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub page_views: u64,
    pub unique_visitors: u64,
    pub bounce_rate: f64,
}

/// Headline figures shown on the dashboard overview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub revenue: RevenueMetrics,
    pub users: UserMetrics,
    pub orders: OrderMetrics,
    pub analytics: AnalyticsMetrics,
}

impl DashboardMetrics {
    /// Fixed figures served by the mock metrics endpoint.
    pub fn sample() -> Self {
        Self {
            revenue: RevenueMetrics {
                current: 45231.89,
                previous: 37689.12,
                change: 20.1,
            },
            users: UserMetrics {
                total: 2350,
                active: 1892,
                new: 180,
            },
            orders: OrderMetrics {
                total: 12234,
                pending: 45,
                completed: 12189,
            },
            analytics: AnalyticsMetrics {
                page_views: 89234,
                unique_visitors: 34567,
                bounce_rate: 2.4,
            },
        }
    }
}

/// Successful API envelope: `{"data": …, "success": true, "status": 200}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// A `200` success envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data,
            success: true,
            status: 200,
        }
    }
}

/// Failed API envelope: `{"message": …, "success": false, "status": 500}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: String,
    pub success: bool,
    pub status: u16,
}

impl ApiError {
    /// A failure envelope with `success: false`.
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            success: false,
            status,
        }
    }
}

/// Inclusive reporting window passed to the metrics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The window from `from` to `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// `from=…&to=…` with millisecond RFC 3339 timestamps, form-encoded.
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("from", &self.from.to_rfc3339_opts(SecondsFormat::Millis, true))
            .append_pair("to", &self.to.to_rfc3339_opts(SecondsFormat::Millis, true))
            .finish()
    }
}
