pub mod bookings;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod profile;
pub mod services;

/// Explicit `refresh` wins; otherwise load only if nothing has been loaded.
fn wants_refresh(refresh: Option<bool>, loaded: bool) -> bool {
    refresh.unwrap_or(!loaded)
}
