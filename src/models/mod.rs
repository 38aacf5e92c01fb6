pub mod booking;
pub mod payment;
pub mod review;
pub mod service;
pub mod user;

pub use booking::{Booking, BookingDraft, BookingStatus, NewBooking, StatusChange};
pub use payment::{NewPayment, Payment};
pub use review::{NewReview, Review, ReviewDraft, ReviewUpdate};
pub use service::{ImageUpload, Service, ServiceForm, ServiceSummary};
pub use user::{
    ApprovalStatus, EntityId, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role,
    User, UserSummary,
};
