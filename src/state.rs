use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::notify::Notifications;
use crate::session::Session;
use crate::stores::{AuthStore, BookingStore, PaymentStore, ReviewStore, ServiceStore};

pub struct AppState {
    pub config: AppConfig,
    pub api: ApiClient,
    pub notifications: Arc<Notifications>,
    pub auth: AuthStore,
    pub services: ServiceStore,
    pub bookings: BookingStore,
    pub reviews: ReviewStore,
    pub payments: PaymentStore,
}

impl AppState {
    /// Wires every store to one gateway client sharing `session`.
    pub fn new(config: AppConfig, session: Arc<Session>) -> Self {
        let api = ApiClient::new(
            config.api_base_url.clone(),
            config.request_timeout(),
            session,
        );
        let notifications = Arc::new(Notifications::new());

        Self {
            auth: AuthStore::new(api.clone()),
            services: ServiceStore::new(api.clone()),
            bookings: BookingStore::new(api.clone(), notifications.clone()),
            reviews: ReviewStore::new(api.clone(), notifications.clone()),
            payments: PaymentStore::new(api.clone()),
            notifications,
            api,
            config,
        }
    }

    /// Cancels in-flight requests in every store.
    pub fn close(&self) {
        self.auth.close();
        self.services.close();
        self.bookings.close();
        self.reviews.close();
        self.payments.close();
    }
}
