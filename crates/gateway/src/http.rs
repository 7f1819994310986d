// crates/gateway/src/http.rs
//! Authenticated HTTP implementation of [`BackendApi`].

use async_trait::async_trait;
use grantswipe_types::{
    Activity, ApiError, DashboardStats, MatchOutcome, NewActivity, PipelineStats, SyncOutcome,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::session::SessionHandle;
use crate::BackendApi;

/// Thin typed wrapper over the hosted backend.
///
/// Every call attaches the current session's bearer token; a missing token
/// short-circuits to `Unauthorized` without touching the network. A 401/403
/// response is additionally reported to the session provider so the login
/// flow can react — the gateway itself never retries it.
pub struct HttpGateway {
    http: reqwest::Client,
    config: GatewayConfig,
    session: SessionHandle,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig, session: SessionHandle) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let token = self
            .session
            .access_token()
            .ok_or_else(|| ApiError::Unauthorized("no active session".to_string()))?;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(%method, path, "backend call");

        let mut request = self.http.request(method, &url).bearer_auth(&token);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("apikey", api_key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), path, "backend call failed");
        let err = ApiError::from_status(status.as_u16(), message);
        if matches!(err, ApiError::Unauthorized(_)) {
            self.session.report_unauthorized(path);
        }
        Err(err)
    }
}

#[async_trait]
impl BackendApi for HttpGateway {
    async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>, ApiError> {
        let path =
            format!("/rest/v1/activities?select=*&order=createdAt.desc&limit={limit}");
        self.call(Method::GET, &path, None).await
    }

    async fn insert_activity(&self, new: NewActivity) -> Result<Activity, ApiError> {
        let body = serde_json::to_value(&new).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.call(Method::POST, "/rest/v1/activities", Some(&body))
            .await
    }

    async fn dashboard_activity(&self, limit: usize) -> Result<Vec<Activity>, ApiError> {
        let path = format!("/functions/v1/dashboard-activity?limit={limit}");
        self.call(Method::GET, &path, None).await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.call(Method::GET, "/functions/v1/dashboard-stats", None)
            .await
    }

    async fn pipeline_status(&self) -> Result<PipelineStats, ApiError> {
        self.call(Method::GET, "/functions/v1/pipeline-status", None)
            .await
    }

    async fn sync_grants(&self) -> Result<SyncOutcome, ApiError> {
        self.call(Method::POST, "/functions/v1/sync-grants", None)
            .await
    }

    async fn run_matching(&self) -> Result<MatchOutcome, ApiError> {
        self.call(Method::POST, "/functions/v1/run-matching", None)
            .await
    }
}
