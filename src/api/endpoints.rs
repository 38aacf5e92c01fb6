use crate::models::EntityId;

// ── Users ──

pub const REGISTER: &str = "/users/register";
pub const LOGIN: &str = "/users/login";
pub const PROFILE: &str = "/users/profile";
pub const REQUEST_PROVIDER: &str = "/users/request-provider";

// ── Services ──

pub const SERVICES: &str = "/services";

pub fn service(id: EntityId) -> String {
    format!("/services/{id}")
}

// ── Bookings ──

pub const BOOKINGS: &str = "/bookings";

pub fn bookings_for_user(user_id: EntityId) -> String {
    format!("/bookings?userId={user_id}")
}

pub fn booking_status(id: EntityId) -> String {
    format!("/bookings/{id}/status")
}

// ── Reviews ──

pub const REVIEWS: &str = "/reviews";

pub fn reviews_for_service(service_id: EntityId) -> String {
    format!("/reviews/{service_id}")
}

pub fn review(id: EntityId) -> String {
    format!("/reviews/{id}")
}

// ── Payments ──

pub const PAYMENTS: &str = "/payments";

pub fn payments_for_booking(booking_id: EntityId) -> String {
    format!("/payments/{booking_id}")
}

/// Resolves a backend-relative image path (e.g. `/uploads/x.png`).
pub fn image_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
