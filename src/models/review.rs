use serde::{Deserialize, Serialize};

use super::user::{EntityId, Role, User};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: EntityId,
    #[serde(default)]
    pub service_id: Option<EntityId>,
    #[serde(default)]
    pub booking_id: Option<EntityId>,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl Review {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user_id == Some(user.id)
    }

    pub fn can_edit(&self, user: &User) -> bool {
        self.is_owned_by(user)
    }

    pub fn can_delete(&self, user: &User) -> bool {
        self.is_owned_by(user) || user.role == Role::Admin
    }
}

/// Body for `POST /reviews`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub service_id: EntityId,
    pub booking_id: EntityId,
    pub rating: u8,
    pub comment: String,
}

/// Body for `PUT /reviews/:id`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewUpdate {
    pub rating: u8,
    pub comment: String,
}

/// Raw review form input, before eligibility and range checks.
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub service_id: EntityId,
    pub booking_id: Option<EntityId>,
    pub rating: u8,
    pub comment: String,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            service_id: 0,
            booking_id: None,
            rating: MAX_RATING,
            comment: String::new(),
        }
    }
}
