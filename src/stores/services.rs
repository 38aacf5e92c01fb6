use serde::Serialize;

use crate::api::{endpoints, ApiClient, ApiRequest};
use crate::errors::StoreError;
use crate::models::{EntityId, Role, Service, ServiceForm};

use super::{require_role, Collection, Lifecycle, StoreCore, StoreState, Write};

pub const NO_CREATE_PERMISSION: &str = "You do not have permission to create a service";
pub const NO_UPDATE_PERMISSION: &str = "You do not have permission to update this service";
pub const NO_DELETE_PERMISSION: &str = "Only admin can delete service";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServicesState {
    pub services: Collection<Service>,
    pub selected: Option<Service>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl StoreState for ServicesState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

pub struct ServiceStore {
    api: ApiClient,
    core: StoreCore<ServicesState>,
}

fn multipart(form: ServiceForm) -> Result<reqwest::multipart::Form, StoreError> {
    form.into_multipart()
        .map_err(|e| StoreError::validation(format!("invalid image upload: {e}")))
}

impl ServiceStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            core: StoreCore::new("services", ServicesState::default()),
        }
    }

    pub fn snapshot(&self) -> ServicesState {
        self.core.snapshot()
    }

    /// Absolute URL for a service's image, if it has one.
    pub fn image_url(&self, service: &Service) -> Option<String> {
        service
            .image_url
            .as_deref()
            .map(|p| endpoints::image_url(self.api.base_url(), p))
    }

    pub async fn fetch_all(&self) -> Result<Vec<Service>, StoreError> {
        let ticket = self.core.begin(Write::LIST);
        let request = ApiRequest::get(endpoints::SERVICES).cancel_with(self.core.request_token());
        let result = self.api.request::<Vec<Service>>(request).await.map_err(StoreError::from);

        self.core.settle(ticket, result, |state, services| {
            state.services.replace_all(services.clone());
        })
    }

    pub async fn fetch_one(&self, id: EntityId) -> Result<Service, StoreError> {
        let ticket = self.core.begin(Write::SELECTED);
        let request =
            ApiRequest::get(endpoints::service(id)).cancel_with(self.core.request_token());
        let result = self.api.request::<Service>(request).await.map_err(StoreError::from);

        self.core.settle(ticket, result, |state, service| {
            state.selected = Some(service.clone());
        })
    }

    pub async fn create(&self, role: Option<Role>, form: ServiceForm) -> Result<Service, StoreError> {
        if let Err(e) = require_role(role, &[Role::Provider, Role::Admin], NO_CREATE_PERMISSION) {
            return self.core.reject(e);
        }

        let body = multipart(form)?;
        let ticket = self.core.begin(Write::Merge);
        let request = ApiRequest::post(endpoints::SERVICES)
            .multipart(body)
            .cancel_with(self.core.request_token());
        let result = self.api.request::<Service>(request).await.map_err(StoreError::from);

        self.core.settle(ticket, result, |state, service| {
            state.services.append(service.clone());
        })
    }

    pub async fn update(
        &self,
        role: Option<Role>,
        id: EntityId,
        form: ServiceForm,
    ) -> Result<Service, StoreError> {
        if let Err(e) = require_role(role, &[Role::Provider, Role::Admin], NO_UPDATE_PERMISSION) {
            return self.core.reject(e);
        }

        let body = multipart(form)?;
        let ticket = self.core.begin(Write::Merge);
        let request = ApiRequest::put(endpoints::service(id))
            .multipart(body)
            .cancel_with(self.core.request_token());
        let result = self.api.request::<Service>(request).await.map_err(StoreError::from);

        self.core.settle(ticket, result, |state, service| {
            state.services.replace(service.clone());
            if state.selected.as_ref().is_some_and(|s| s.id == service.id) {
                state.selected = Some(service.clone());
            }
        })
    }

    pub async fn delete(&self, role: Option<Role>, id: EntityId) -> Result<EntityId, StoreError> {
        if let Err(e) = require_role(role, &[Role::Admin], NO_DELETE_PERMISSION) {
            return self.core.reject(e);
        }

        let ticket = self.core.begin(Write::Merge);
        let request =
            ApiRequest::delete(endpoints::service(id)).cancel_with(self.core.request_token());
        let result = self
            .api
            .request::<serde_json::Value>(request)
            .await
            .map(|_| id)
            .map_err(StoreError::from);

        self.core.settle(ticket, result, |state, id| {
            state.services.remove(*id);
            if state.selected.as_ref().is_some_and(|s| s.id == *id) {
                state.selected = None;
            }
        })
    }

    pub fn clear_selected(&self) {
        self.core.update(|state| state.selected = None);
    }

    pub fn close(&self) {
        self.core.close();
    }
}
