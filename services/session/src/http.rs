//! Authenticated request pipeline
//!
//! `ApiClient` wraps every outgoing call to the backend with ordered
//! stages: attach the bearer token, send, and on a 401 run exactly one
//! recovery cycle through the refresh coordinator before replaying the
//! request once. The underlying `reqwest` client keeps a cookie jar so the
//! httpOnly refresh cookie flows to `/auth/refresh` on credentialed calls.

use std::sync::Arc;

use common::config::AppConfig;
use common::error::{ApiError, ApiResult};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::models::{UpdateMeRequest, UserProfile};
use crate::refresh::RefreshGate;
use crate::store::SessionStore;

/// HTTP client for the backend, with the auth pipeline built in
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    refresh: Arc<RefreshGate>,
}

impl ApiClient {
    /// Build a client for the configured backend
    pub fn new(config: &AppConfig, store: SessionStore) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let refresh = Arc::new(RefreshGate::new(
            http.clone(),
            base_url.clone(),
            store.clone(),
        ));

        Ok(Self {
            http,
            base_url,
            store,
            refresh,
        })
    }

    /// The session store this client reads its token from
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Raw client sharing the cookie jar, for flows that must bypass the
    /// 401-recovery pipeline (credential exchange, refresh)
    pub(crate) fn raw_client(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> reqwest::Result<Response> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await
    }

    /// Send a request through the full pipeline
    ///
    /// A missing token sends the request unauthenticated (some endpoints
    /// are public). Exactly one 401-recovery cycle is attempted per
    /// original request; a replay that 401s again propagates without
    /// re-entering recovery.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let token = self.store.access_token();
        let resp = self
            .send_once(method.clone(), path, body, token.as_deref())
            .await
            .map_err(ApiError::Network)?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(resp).await;
        }

        info!("request to {} got 401, attempting token refresh", path);
        let Some(new_token) = self.refresh.recover().await else {
            // recovery failed; the gate already cleared the store
            return Err(ApiError::Unauthorized);
        };

        let retry = self
            .send_once(method, path, body, Some(new_token.as_str()))
            .await
            .map_err(ApiError::Network)?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            // already retried once for this request
            warn!("request to {} still unauthorized after refresh", path);
            return Err(ApiError::Unauthorized);
        }

        Self::check_status(retry).await
    }

    async fn check_status(resp: Response) -> ApiResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// GET a JSON resource
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let resp = self.request::<()>(Method::GET, path, None).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    /// POST a JSON body, decode a JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let resp = self.request(Method::POST, path, Some(body)).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    /// PUT a JSON body, decode a JSON response
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let resp = self.request(Method::PUT, path, Some(body)).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    /// Fetch the current user profile
    pub async fn me(&self) -> ApiResult<UserProfile> {
        self.get_json("/api/usuarios/me").await
    }

    /// Update the current user profile (profile completion flow)
    pub async fn update_me(&self, payload: &UpdateMeRequest) -> ApiResult<UserProfile> {
        self.put_json("/api/usuarios/me", payload).await
    }

    /// Tell the backend to drop the refresh cookie
    ///
    /// Callers treat this as fire-and-forget; see `SessionStore::logout`.
    pub async fn logout(&self) -> ApiResult<()> {
        self.request::<()>(Method::POST, "/auth/logout", None)
            .await?;
        Ok(())
    }

    /// App-start silent refresh
    ///
    /// Attempts one refresh cycle against the cookie; on success, hydrates
    /// the full profile from `/api/usuarios/me`. Leaves a clean
    /// unauthenticated state when no session can be recovered. Route
    /// decisions must wait for this to resolve (the store reports
    /// `loading` until it does).
    pub async fn bootstrap(&self) {
        self.store.set_loading(true);

        if self.refresh.recover().await.is_some() {
            match self.me().await {
                Ok(user) => self.store.set_user(Some(user)),
                Err(err) => warn!("failed to hydrate profile after refresh: {}", err),
            }
        }

        self.store.set_loading(false);
    }
}
