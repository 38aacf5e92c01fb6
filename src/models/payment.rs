use serde::{Deserialize, Serialize};

use super::user::EntityId;

/// Recorded by the backend; the client only passes it through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: EntityId,
    pub booking_id: EntityId,
    pub amount: f64,
    #[serde(default)]
    pub status: String,
}

/// Body for `POST /payments`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub booking_id: EntityId,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}
