use std::sync::Arc;

use serde::Serialize;

use crate::api::{endpoints, ApiClient, ApiRequest};
use crate::errors::StoreError;
use crate::models::{Booking, EntityId, NewReview, Review, ReviewDraft, ReviewUpdate, User};
use crate::notify::Notifications;
use crate::services::policy;

use super::{Collection, Lifecycle, StoreCore, StoreState, Write};

pub const NO_EDIT_PERMISSION: &str = "You can only edit your own review";
pub const NO_DELETE_PERMISSION: &str = "You do not have permission to delete this review";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewsState {
    pub reviews: Collection<Review>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl StoreState for ReviewsState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

pub struct ReviewStore {
    api: ApiClient,
    notifications: Arc<Notifications>,
    core: StoreCore<ReviewsState>,
}

impl ReviewStore {
    pub fn new(api: ApiClient, notifications: Arc<Notifications>) -> Self {
        Self {
            api,
            notifications,
            core: StoreCore::new("reviews", ReviewsState::default()),
        }
    }

    pub fn snapshot(&self) -> ReviewsState {
        self.core.snapshot()
    }

    pub async fn fetch_for_service(&self, service_id: EntityId) -> Result<Vec<Review>, StoreError> {
        let ticket = self.core.begin(Write::LIST);
        let request = ApiRequest::get(endpoints::reviews_for_service(service_id))
            .cancel_with(self.core.request_token());
        let result = self.api.request::<Vec<Review>>(request).await.map_err(StoreError::from);

        self.core.settle(ticket, result, |state, reviews| {
            state.reviews.replace_all(reviews.clone());
        })
    }

    /// Form entry point: eligibility and field checks run first, and a
    /// failure only produces a warning notification.
    pub async fn submit(&self, draft: &ReviewDraft, eligible: &[&Booking]) -> Result<Review, StoreError> {
        match policy::validate_review(draft, eligible) {
            Ok(review) => self.add(review).await,
            Err(e) => {
                self.notifications.warn(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn add(&self, review: NewReview) -> Result<Review, StoreError> {
        let ticket = self.core.begin(Write::Merge);
        let result = async {
            let request = ApiRequest::post(endpoints::REVIEWS)
                .json(&review)?
                .cancel_with(self.core.request_token());
            Ok::<_, StoreError>(self.api.request::<Review>(request).await?)
        }
        .await;

        self.core.settle(ticket, result, |state, review| {
            state.reviews.append(review.clone());
        })
    }

    /// Ownership check against the loaded copy of review `id`. Reviews that
    /// aren't loaded are left to the backend.
    fn permits(&self, id: EntityId, allowed: impl FnOnce(&Review) -> bool) -> bool {
        self.core
            .update(|state| state.reviews.get(id).map_or(true, allowed))
    }

    pub async fn update(
        &self,
        actor: &User,
        id: EntityId,
        update: ReviewUpdate,
    ) -> Result<Review, StoreError> {
        if !self.permits(id, |r| r.can_edit(actor)) {
            return self.core.reject(StoreError::permission(NO_EDIT_PERMISSION));
        }
        if let Err(e) = policy::validate_rating(update.rating) {
            self.notifications.warn(e.to_string());
            return Err(e);
        }

        let ticket = self.core.begin(Write::Merge);
        let result = async {
            let request = ApiRequest::put(endpoints::review(id))
                .json(&update)?
                .cancel_with(self.core.request_token());
            Ok::<_, StoreError>(self.api.request::<Review>(request).await?)
        }
        .await;

        self.core.settle(ticket, result, |state, review| {
            state.reviews.replace(review.clone());
        })
    }

    pub async fn delete(&self, actor: &User, id: EntityId) -> Result<EntityId, StoreError> {
        if !self.permits(id, |r| r.can_delete(actor)) {
            return self.core.reject(StoreError::permission(NO_DELETE_PERMISSION));
        }

        let ticket = self.core.begin(Write::Merge);
        let request = ApiRequest::delete(endpoints::review(id)).cancel_with(self.core.request_token());
        let result = self
            .api
            .request::<serde_json::Value>(request)
            .await
            .map(|_| id)
            .map_err(StoreError::from);

        self.core.settle(ticket, result, |state, id| {
            state.reviews.remove(*id);
        })
    }

    pub fn close(&self) {
        self.core.close();
    }
}
