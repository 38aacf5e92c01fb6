use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::service::ServiceSummary;
use super::user::{EntityId, UserSummary};

pub const UNKNOWN_PROVIDER: &str = "Unknown Provider";
pub const UNKNOWN_SERVICE: &str = "Unknown Service";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: EntityId,
    #[serde(default)]
    pub service_id: Option<EntityId>,
    #[serde(default)]
    pub customer_id: Option<EntityId>,
    #[serde(default)]
    pub provider_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub cancel_message: Option<String>,
    #[serde(default)]
    pub service: Option<ServiceSummary>,
    #[serde(default)]
    pub provider: Option<UserSummary>,
    #[serde(default)]
    pub customer: Option<UserSummary>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn provider_name(&self) -> &str {
        self.provider
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_PROVIDER)
    }

    pub fn service_name(&self) -> &str {
        self.service
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_SERVICE)
    }

    /// The provider that owns the booked service, if the backend told us.
    pub fn owning_provider_id(&self) -> Option<EntityId> {
        self.service
            .as_ref()
            .and_then(|s| s.provider_id)
            .or(self.provider_id)
    }

    pub fn booked_service_id(&self) -> Option<EntityId> {
        self.service_id
            .or_else(|| self.service.as_ref().and_then(|s| s.id))
    }

    /// Overlays a server payload onto this booking. Keys present in `patch`
    /// win; everything else keeps its local value.
    pub fn merge_server_fields(&self, patch: &Value) -> Result<Booking, serde_json::Error> {
        let Value::Object(incoming) = patch else {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "booking payload is not a JSON object",
            ));
        };

        let mut merged = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in incoming {
                fields.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    /// Anything the backend sends that we don't recognize.
    Other(String),
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Other(String::new())
    }
}

impl BookingStatus {
    pub const KNOWN: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            _ => BookingStatus::Other(s.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BookingStatus::Other(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    fn rank(&self) -> Option<u8> {
        match self {
            BookingStatus::Pending => Some(0),
            BookingStatus::Confirmed => Some(1),
            BookingStatus::Completed => Some(2),
            BookingStatus::Cancelled | BookingStatus::Other(_) => None,
        }
    }

    /// Forward-only transitions; `cancelled` is reachable from any
    /// non-terminal state. A status we don't recognize locally defers to
    /// the server.
    pub fn can_transition_to(&self, next: &BookingStatus) -> bool {
        if !next.is_known() || self.is_terminal() {
            return false;
        }
        if *next == BookingStatus::Cancelled {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BookingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BookingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(s)) => BookingStatus::parse(&s),
            _ => BookingStatus::default(),
        })
    }
}

/// Accepts RFC 3339, naive ISO timestamps, plain dates, and epoch millis.
/// Anything else decodes as absent rather than failing the whole payload.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => parse_datetime(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// Body for `POST /bookings`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub service_id: EntityId,
    pub booking_date: DateTime<Utc>,
    pub street: String,
    pub city: String,
    pub pincode: String,
    pub notes: String,
}

/// Raw booking form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    pub service_id: EntityId,
    pub date: Option<DateTime<Utc>>,
    pub street: String,
    pub city: String,
    pub pincode: String,
    pub notes: String,
}

/// Body for `PATCH /bookings/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusChange {
    pub fn to(status: BookingStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn cancel(reason: impl Into<String>) -> Self {
        Self {
            status: BookingStatus::Cancelled,
            message: Some(reason.into()),
        }
    }
}
