use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub session_file: PathBuf,
    pub dashboard_email: Option<String>,
    pub dashboard_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".doorstep-session.json")),
            dashboard_email: env::var("DASHBOARD_EMAIL").ok().filter(|v| !v.is_empty()),
            dashboard_password: env::var("DASHBOARD_PASSWORD").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Both halves of the dashboard login, when configured.
    pub fn dashboard_credentials(&self) -> Option<(String, String)> {
        match (&self.dashboard_email, &self.dashboard_password) {
            (Some(email), Some(password)) => Some((email.clone(), password.clone())),
            _ => None,
        }
    }
}
