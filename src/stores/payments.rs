use serde::{Deserialize, Serialize};

use crate::api::{endpoints, ApiClient, ApiRequest};
use crate::errors::StoreError;
use crate::models::{EntityId, NewPayment, Payment};

use super::{Collection, Lifecycle, StoreCore, StoreState, Write};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentsState {
    pub payments: Collection<Payment>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl StoreState for PaymentsState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// The payments endpoint answers with a single record or a list depending
/// on how many exist for the booking.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Payment>),
    One(Payment),
}

impl From<OneOrMany> for Vec<Payment> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(list) => list,
            OneOrMany::One(payment) => vec![payment],
        }
    }
}

pub struct PaymentStore {
    api: ApiClient,
    core: StoreCore<PaymentsState>,
}

impl PaymentStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            core: StoreCore::new("payments", PaymentsState::default()),
        }
    }

    pub fn snapshot(&self) -> PaymentsState {
        self.core.snapshot()
    }

    pub async fn fetch_for_booking(&self, booking_id: EntityId) -> Result<Vec<Payment>, StoreError> {
        let ticket = self.core.begin(Write::LIST);
        let request = ApiRequest::get(endpoints::payments_for_booking(booking_id))
            .cancel_with(self.core.request_token());
        let result = match self.api.request::<Option<OneOrMany>>(request).await {
            Ok(payload) => Ok(payload.map(Vec::from).unwrap_or_default()),
            Err(e) => Err(StoreError::from(e)),
        };

        self.core.settle(ticket, result, |state, payments| {
            state.payments.replace_all(payments.clone());
        })
    }

    pub async fn create(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let ticket = self.core.begin(Write::Merge);
        let result = async {
            let request = ApiRequest::post(endpoints::PAYMENTS)
                .json(&payment)?
                .cancel_with(self.core.request_token());
            Ok::<_, StoreError>(self.api.request::<Payment>(request).await?)
        }
        .await;

        self.core.settle(ticket, result, |state, payment| {
            state.payments.append(payment.clone());
        })
    }

    pub fn close(&self) {
        self.core.close();
    }
}
