//! Authenticated client for the management API
//!
//! Handles:
//! - Cookie-based login (`POST {base}Login`)
//! - Device inventory fetch (`POST {base}ListPhysicalDevices`)
//! - One transparent re-login and retry when a request comes back 401
//! - A serialized re-auth path, safe when overlapping fetch tasks hit 401 together

mod session;

pub use session::{find_session_cookie, Session, SessionCookie, SESSION_COOKIE_NAMES};

use crate::config::MonitorConfig;
use crate::error::{error_chain, MonitorError, Result};
use crate::models::{DeviceList, LimitRequest, LoginRequest};
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::StatusCode;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Upper bound on devices requested per fetch
pub const DEVICE_LIMIT: u32 = 10_000;

/// Anything the scheduler can poll for a device inventory
pub trait DeviceSource: Send + Sync + 'static {
    fn fetch_devices(&self) -> impl Future<Output = Result<DeviceList>> + Send;
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

pub struct SessionClient {
    http: reqwest::Client,
    login_endpoint: String,
    devices_endpoint: String,
    credentials: Mutex<Credentials>,
    session: Mutex<Session>,
    /// Held for the whole login exchange so only one task re-authenticates.
    login_gate: tokio::sync::Mutex<()>,
    logins: AtomicU64,
}

impl SessionClient {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for {}", config.base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(concat!("devmon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Config(error_chain(&e)))?;

        Ok(Self {
            http,
            login_endpoint: format!("{}Login", config.base_url),
            devices_endpoint: format!("{}ListPhysicalDevices", config.base_url),
            credentials: Mutex::new(Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
            }),
            session: Mutex::new(Session::Unauthenticated),
            login_gate: tokio::sync::Mutex::new(()),
            logins: AtomicU64::new(0),
        })
    }

    pub fn devices_endpoint(&self) -> &str {
        &self.devices_endpoint
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.lock().is_authenticated()
    }

    /// Drop the session cookie; the next request fails until `login` is called.
    pub fn logout(&self) {
        self.session.lock().invalidate();
    }

    /// Log in and remember the credentials for later re-authentication.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let _gate = self.login_gate.lock().await;
        self.login_locked(username, password).await?;
        *self.credentials.lock() = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        Ok(())
    }

    /// Fetch the device inventory, re-authenticating once on 401.
    pub async fn list_devices(&self) -> Result<DeviceList> {
        let list = self
            .authorized(|cookie| async move {
                let response = self.send_devices_request(&cookie).await?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| MonitorError::transport(&self.devices_endpoint, e))?;
                serde_json::from_slice::<DeviceList>(&bytes).map_err(|e| MonitorError::Decode {
                    endpoint: self.devices_endpoint.clone(),
                    message: e.to_string(),
                })
            })
            .await?;

        debug!(
            "fetched {} physical devices (total reported: {})",
            list.physical_devices.len(),
            list.total
        );
        Ok(list)
    }

    /// Same request as `list_devices` with the body discarded. Used once at startup.
    pub async fn test_connection(&self) -> Result<()> {
        self.authorized(|cookie| async move {
            self.send_devices_request(&cookie).await.map(|_| ())
        })
        .await?;
        info!("connection test to {} succeeded", self.devices_endpoint);
        Ok(())
    }

    async fn authorized<T, F, Fut>(&self, request: F) -> Result<T>
    where
        F: Fn(SessionCookie) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (cookie, generation) = {
            let session = self.session.lock();
            match &*session {
                Session::Authenticated { cookie, generation } => (cookie.clone(), *generation),
                Session::Unauthenticated => return Err(MonitorError::NotAuthenticated),
            }
        };

        match request(cookie).await {
            Err(err) if err.is_unauthorized() => {
                warn!("session expired, re-authenticating");
                self.reauthenticate(generation)
                    .await
                    .map_err(|e| MonitorError::Reauth(Box::new(e)))?;

                let cookie = self
                    .session
                    .lock()
                    .cookie()
                    .cloned()
                    .ok_or(MonitorError::NotAuthenticated)?;
                request(cookie)
                    .await
                    .map_err(|e| MonitorError::AfterReauth(Box::new(e)))
            }
            other => other,
        }
    }

    async fn reauthenticate(&self, stale_generation: u64) -> Result<()> {
        let _gate = self.login_gate.lock().await;
        {
            let mut session = self.session.lock();
            if let Some(current) = session.generation() {
                if current != stale_generation {
                    debug!("session already refreshed by a concurrent request");
                    return Ok(());
                }
            }
            session.invalidate();
        }

        let Credentials { username, password } = self.credentials.lock().clone();
        self.login_locked(&username, &password).await
    }

    /// Caller must hold `login_gate`.
    async fn login_locked(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.login_endpoint)
            .header(ACCEPT, "application/json")
            .json(&LoginRequest { login: username, password })
            .send()
            .await
            .map_err(|e| MonitorError::transport(&self.login_endpoint, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            debug!("login rejected: {} {}", status, body);
            return Err(MonitorError::Auth(format!(
                "login rejected with HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let cookie = find_session_cookie(response.headers()).ok_or_else(|| {
            MonitorError::Auth("no session cookie in login response".to_string())
        })?;

        let generation = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        self.session.lock().login(cookie, generation);
        info!("logged in as {}", username);
        Ok(())
    }

    async fn send_devices_request(&self, cookie: &SessionCookie) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.devices_endpoint)
            .header(ACCEPT, "application/json")
            .header(COOKIE, cookie.header_value())
            .json(&LimitRequest { limit: DEVICE_LIMIT })
            .send()
            .await
            .map_err(|e| MonitorError::transport(&self.devices_endpoint, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MonitorError::Api {
                status: status.as_u16(),
                endpoint: self.devices_endpoint.clone(),
                body: "authentication expired".to_string(),
            });
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Api {
                status: status.as_u16(),
                endpoint: self.devices_endpoint.clone(),
                body,
            });
        }
        Ok(response)
    }
}

impl DeviceSource for SessionClient {
    fn fetch_devices(&self) -> impl Future<Output = Result<DeviceList>> + Send {
        self.list_devices()
    }
}
