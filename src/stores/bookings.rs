use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::api::{endpoints, ApiClient, ApiRequest};
use crate::errors::{ApiError, StoreError};
use crate::models::{Booking, BookingDraft, BookingStatus, EntityId, Role, StatusChange};
use crate::notify::Notifications;
use crate::services::policy;

use super::{require_role, Collection, Lifecycle, StoreCore, StoreState, Write};

pub const NO_STATUS_PERMISSION: &str = "You do not have permission to update booking status";

/// Which bookings a list fetch asks for. Customers only see their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingScope {
    #[default]
    All,
    Customer(EntityId),
}

impl BookingScope {
    pub fn for_role(role: Option<Role>, user_id: Option<EntityId>) -> Self {
        match (role, user_id) {
            (Some(Role::Customer), Some(id)) => BookingScope::Customer(id),
            _ => BookingScope::All,
        }
    }

    fn path(&self) -> String {
        match self {
            BookingScope::All => endpoints::BOOKINGS.to_string(),
            BookingScope::Customer(id) => endpoints::bookings_for_user(*id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsState {
    pub bookings: Collection<Booking>,
    /// Highlighted after a status change until cleared or refetched.
    pub recently_updated_id: Option<EntityId>,
    #[serde(skip)]
    pub last_scope: Option<BookingScope>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl StoreState for BookingsState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

pub struct BookingStore {
    api: ApiClient,
    notifications: Arc<Notifications>,
    core: StoreCore<BookingsState>,
}

impl BookingStore {
    pub fn new(api: ApiClient, notifications: Arc<Notifications>) -> Self {
        Self {
            api,
            notifications,
            core: StoreCore::new("bookings", BookingsState::default()),
        }
    }

    pub fn snapshot(&self) -> BookingsState {
        self.core.snapshot()
    }

    async fn load(&self, scope: BookingScope) -> Result<Vec<Booking>, StoreError> {
        let request = ApiRequest::get(scope.path()).cancel_with(self.core.request_token());
        Ok(self.api.request(request).await?)
    }

    fn apply_list(state: &mut BookingsState, bookings: &[Booking]) {
        state.bookings.replace_all(bookings.to_vec());
        state.recently_updated_id = None;
    }

    pub async fn fetch(&self, scope: BookingScope) -> Result<Vec<Booking>, StoreError> {
        let ticket = self
            .core
            .begin_with(Write::LIST, |state| state.last_scope = Some(scope));
        let result = self.load(scope).await;
        self.core
            .settle(ticket, result, |state, bookings| Self::apply_list(state, bookings))
    }

    pub async fn create(&self, draft: BookingDraft) -> Result<Booking, StoreError> {
        let new = match policy::validate_booking(&draft) {
            Ok(new) => new,
            Err(e) => {
                self.notifications.warn(e.to_string());
                return Err(e);
            }
        };

        let ticket = self.core.begin(Write::Merge);
        let result = async {
            let request = ApiRequest::post(endpoints::BOOKINGS)
                .json(&new)?
                .cancel_with(self.core.request_token());
            Ok::<_, StoreError>(self.api.request::<Booking>(request).await?)
        }
        .await;

        self.core
            .settle(ticket, result, |state, booking| state.bookings.append(booking.clone()))
    }

    /// Optimistic status transition.
    ///
    /// The new status lands in local state (and the booking is marked as
    /// recently updated) before the PATCH goes out. A successful response is
    /// overlaid onto the local booking. A failed one leaves the optimistic
    /// value in place, records the error, notifies, and then refetches the
    /// whole list to resynchronize; the original error is returned.
    pub async fn update_status(
        &self,
        id: EntityId,
        change: StatusChange,
        role: Option<Role>,
    ) -> Result<Booking, StoreError> {
        if let Err(e) = require_role(role, &[Role::Provider, Role::Admin], NO_STATUS_PERMISSION) {
            return self.core.reject(e);
        }

        let current = self
            .core
            .update(|state| state.bookings.get(id).map(|b| b.status.clone()));
        if let Err(e) = policy::validate_status_change(current.as_ref(), &change) {
            self.notifications.warn(e.to_string());
            return Err(e);
        }

        let ticket = self.core.begin_with(Write::Merge, |state| {
            if let Some(booking) = state.bookings.get_mut(id) {
                booking.status = change.status.clone();
                if change.status == BookingStatus::Cancelled {
                    booking.cancel_message = change.message.clone();
                }
            }
            state.recently_updated_id = Some(id);
        });
        tracing::debug!(booking_id = id, status = %change.status, "optimistic status write");

        let result = async {
            let request = ApiRequest::patch(endpoints::booking_status(id))
                .json(&change)?
                .cancel_with(self.core.request_token());
            let payload: Value = self.api.request(request).await?;
            self.reconcile(id, &payload)
        }
        .await;

        let err = match self.core.settle(ticket, result, |state, booking| {
            if !state.bookings.replace(booking.clone()) {
                tracing::debug!(booking_id = id, "updated booking not in local list");
            }
        }) {
            Ok(booking) => return Ok(booking),
            Err(e) => e,
        };

        if err.is_cancelled() || self.core.is_closed() {
            return Err(err);
        }

        tracing::warn!(booking_id = id, error = %err, "status update failed, resyncing bookings");
        self.notifications
            .error(format!("Failed to update booking status: {err}"));
        self.resync().await;
        Err(err)
    }

    /// Server fields win; local fields the server didn't send are kept.
    fn reconcile(&self, id: EntityId, payload: &Value) -> Result<Booking, StoreError> {
        let local = self.core.update(|state| state.bookings.get(id).cloned());
        let merged = match local {
            Some(local) => local.merge_server_fields(payload),
            None => serde_json::from_value(payload.clone()),
        };
        merged.map_err(|e| ApiError::Decode(e.to_string()).into())
    }

    /// Full refetch that leaves the current error visible.
    async fn resync(&self) {
        let scope = self.core.snapshot().last_scope.unwrap_or_default();
        let ticket = self.core.begin_keep_error(Write::LIST);
        let result = self.load(scope).await;
        if let Err(e) = self
            .core
            .settle(ticket, result, |state, bookings| Self::apply_list(state, bookings))
        {
            tracing::warn!(error = %e, "booking resync failed");
        }
    }

    pub fn clear_recently_updated(&self) {
        self.core.update(|state| state.recently_updated_id = None);
    }

    pub fn close(&self) {
        self.core.close();
    }
}
