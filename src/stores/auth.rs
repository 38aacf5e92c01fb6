use serde::Serialize;

use crate::api::{endpoints, ApiClient, ApiRequest};
use crate::errors::StoreError;
use crate::models::{
    ApprovalStatus, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role, User,
};
use crate::services::policy;
use crate::session::Credentials;

use super::{Lifecycle, StoreCore, StoreState, Write};

const SESSION: Write = Write::Replace("session");

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl StoreState for AuthState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// The only store with effects outside its own state: login and logout
/// write through to the session.
pub struct AuthStore {
    api: ApiClient,
    core: StoreCore<AuthState>,
}

impl AuthStore {
    pub fn new(api: ApiClient) -> Self {
        let restored = api.session().credentials();
        let initial = AuthState {
            token: restored.as_ref().map(|c| c.token.clone()),
            role: restored.map(|c| c.role),
            ..Default::default()
        };
        Self {
            api,
            core: StoreCore::new("auth", initial),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.core.snapshot()
    }

    pub fn current_user(&self) -> Option<User> {
        self.core.snapshot().user
    }

    pub fn role(&self) -> Option<Role> {
        self.core.snapshot().role
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.snapshot().token.is_some()
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<serde_json::Value, StoreError> {
        let ticket = self.core.begin(Write::Merge);
        let result = async {
            let request = ApiRequest::post(endpoints::REGISTER)
                .json(&req)?
                .cancel_with(self.core.request_token());
            Ok::<_, StoreError>(self.api.request::<serde_json::Value>(request).await?)
        }
        .await;
        self.core.settle(ticket, result, |_, _| {})
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let ticket = self.core.begin(SESSION);
        let result = async {
            let request = ApiRequest::post(endpoints::LOGIN)
                .json(&LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })?
                .cancel_with(self.core.request_token());
            let resp: LoginResponse = self.api.request(request).await?;

            self.api
                .session()
                .login(Credentials {
                    token: resp.token.clone(),
                    role: resp.user.role,
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok::<_, StoreError>(resp)
        }
        .await;

        self.core
            .settle(ticket, result, |state, resp| {
                state.user = Some(resp.user.clone());
                state.token = Some(resp.token.clone());
                state.role = Some(resp.user.role);
            })
            .map(|resp| resp.user)
    }

    /// Loads the signed-in user, e.g. after a session was restored without
    /// one. A role change on the server is written through to the session.
    pub async fn fetch_profile(&self) -> Result<User, StoreError> {
        let ticket = self.core.begin(SESSION);
        let result = async {
            let request = ApiRequest::get(endpoints::PROFILE).cancel_with(self.core.request_token());
            let user: User = self.api.request(request).await?;

            let session = self.api.session();
            if let Some(creds) = session.credentials().filter(|c| c.role != user.role) {
                session
                    .login(Credentials {
                        token: creds.token,
                        role: user.role,
                    })
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            Ok::<_, StoreError>(user)
        }
        .await;

        self.core.settle(ticket, result, |state, user| {
            state.user = Some(user.clone());
            state.role = Some(user.role);
        })
    }

    /// Asks an admin to approve the current customer as a provider. On
    /// success the local approval status becomes pending.
    pub async fn request_provider(&self) -> Result<Option<String>, StoreError> {
        let user = match self.current_user() {
            Some(user) => user,
            None => self.fetch_profile().await?,
        };
        if !policy::can_request_provider(&user) {
            return self
                .core
                .reject(StoreError::permission(policy::PROVIDER_REQUEST_NOT_ALLOWED));
        }

        let ticket = self.core.begin(Write::Merge);
        let request =
            ApiRequest::post(endpoints::REQUEST_PROVIDER).cancel_with(self.core.request_token());
        let result = self
            .api
            .request::<Option<MessageResponse>>(request)
            .await
            .map(|resp| resp.and_then(|r| r.message))
            .map_err(StoreError::from);

        self.core.settle(ticket, result, |state, _| {
            if let Some(user) = state.user.as_mut() {
                user.status = ApprovalStatus::Pending;
            }
        })
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        self.api
            .session()
            .logout()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        self.core.update(|state| {
            state.user = None;
            state.token = None;
            state.role = None;
            state.lifecycle.reset();
        });
        Ok(())
    }

    pub fn close(&self) {
        self.core.close();
    }
}
