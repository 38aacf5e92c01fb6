//! Checks that run before anything is dispatched to a store.
//!
//! Failures here are [`StoreError::Validation`]: they are shown to the user
//! as a transient notification and never become a store's persisted error.

use serde::Serialize;

use crate::errors::StoreError;
use crate::models::review::{MAX_RATING, MIN_RATING};
use crate::models::{
    ApprovalStatus, Booking, BookingDraft, BookingStatus, EntityId, NewBooking, NewReview,
    ReviewDraft, Role, StatusChange, User,
};

pub const MISSING_BOOKING_FIELDS: &str = "Please fill date/time and address fields.";
pub const NO_COMPLETED_BOOKING: &str =
    "You can review this service only after completing a booking.";
pub const MISSING_REVIEW_FIELDS: &str = "Please select a booking and write a comment.";
pub const CANCEL_REASON_REQUIRED: &str = "Please enter a reason for cancelling this booking.";
pub const PROVIDER_REQUEST_NOT_ALLOWED: &str =
    "Only customers without a pending request can apply to become a provider.";

pub fn validate_booking(draft: &BookingDraft) -> Result<NewBooking, StoreError> {
    let Some(date) = draft.date else {
        return Err(StoreError::validation(MISSING_BOOKING_FIELDS));
    };
    if [&draft.street, &draft.city, &draft.pincode]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(StoreError::validation(MISSING_BOOKING_FIELDS));
    }

    Ok(NewBooking {
        service_id: draft.service_id,
        booking_date: date,
        street: draft.street.trim().to_string(),
        city: draft.city.trim().to_string(),
        pincode: draft.pincode.trim().to_string(),
        notes: draft.notes.trim().to_string(),
    })
}

fn customer_of(booking: &Booking) -> Option<EntityId> {
    booking
        .customer_id
        .or_else(|| booking.customer.as_ref().and_then(|c| c.id))
}

/// Completed bookings of `service_id` that belong to `user_id`.
pub fn completed_bookings_for(
    bookings: &[Booking],
    user_id: EntityId,
    service_id: EntityId,
) -> Vec<&Booking> {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .filter(|b| customer_of(b) == Some(user_id))
        .filter(|b| b.booked_service_id() == Some(service_id))
        .collect()
}

pub fn can_review(bookings: &[Booking], user_id: EntityId, service_id: EntityId) -> bool {
    !completed_bookings_for(bookings, user_id, service_id).is_empty()
}

pub fn validate_rating(rating: u8) -> Result<(), StoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}."
        )))
    }
}

/// `eligible` is the caller's completed bookings for this service, usually
/// from [`completed_bookings_for`].
pub fn validate_review(draft: &ReviewDraft, eligible: &[&Booking]) -> Result<NewReview, StoreError> {
    if eligible.is_empty() {
        return Err(StoreError::validation(NO_COMPLETED_BOOKING));
    }

    let comment = draft.comment.trim();
    let Some(booking_id) = draft.booking_id.filter(|_| !comment.is_empty()) else {
        return Err(StoreError::validation(MISSING_REVIEW_FIELDS));
    };

    if !eligible.iter().any(|b| b.id == booking_id) {
        return Err(StoreError::validation(
            "Reviews can only be left for your completed bookings.",
        ));
    }
    validate_rating(draft.rating)?;

    Ok(NewReview {
        service_id: draft.service_id,
        booking_id,
        rating: draft.rating,
        comment: comment.to_string(),
    })
}

/// Checks a status change against the booking's current status, when known.
pub fn validate_status_change(
    current: Option<&BookingStatus>,
    change: &StatusChange,
) -> Result<(), StoreError> {
    if !change.status.is_known() {
        return Err(StoreError::validation(format!(
            "Unknown booking status: {}",
            change.status
        )));
    }

    if change.status == BookingStatus::Cancelled
        && change.message.as_deref().map_or(true, |m| m.trim().is_empty())
    {
        return Err(StoreError::validation(CANCEL_REASON_REQUIRED));
    }

    if let Some(current) = current {
        if !current.can_transition_to(&change.status) {
            return Err(StoreError::validation(format!(
                "Cannot move a {} booking to {}.",
                current, change.status
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Complete,
    Cancel,
}

impl BookingAction {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Complete => BookingStatus::Completed,
            BookingAction::Cancel => BookingStatus::Cancelled,
        }
    }
}

/// Status actions `user` may take on `booking`. Providers only act on
/// bookings for their own services; admins act on any.
pub fn available_actions(booking: &Booking, user: &User) -> Vec<BookingAction> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Provider => booking.owning_provider_id() == Some(user.id),
        Role::Customer => false,
    };
    if !allowed {
        return Vec::new();
    }

    [BookingAction::Confirm, BookingAction::Complete, BookingAction::Cancel]
        .into_iter()
        .filter(|action| booking.status.can_transition_to(&action.target()))
        .collect()
}

/// Customers may ask for provider status unless a request is already pending.
pub fn can_request_provider(user: &User) -> bool {
    user.role == Role::Customer && user.status != ApprovalStatus::Pending
}
