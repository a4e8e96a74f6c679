/*!
Stub management API for tests that need a real HTTP peer

Serves `POST {base}Login` and `POST {base}ListPhysicalDevices` on an ephemeral
localhost port. Sessions are cookie based like the real appliance; tests can
expire the session, pick the cookie spelling, or queue raw replies that
bypass the normal handling.
*/

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const API_PREFIX: &str = "/api/v2/";

/// Name of the session cookie set on login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieName {
    Canonical,
    /// Spelling shipped by some firmware releases
    Misspelled,
}

impl CookieName {
    pub fn as_str(self) -> &'static str {
        match self {
            CookieName::Canonical => "Authorization",
            CookieName::Misspelled => "Autorization",
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug)]
struct StubState {
    username: String,
    password: String,
    cookie_name: CookieName,
    send_cookie: bool,
    session_token: Option<String>,
    tokens_issued: u64,
    devices: Value,
    login_replies: VecDeque<ScriptedReply>,
    list_replies: VecDeque<ScriptedReply>,
    login_count: usize,
    list_count: usize,
    last_list_request: Option<Value>,
}

type Shared = Arc<Mutex<StubState>>;

struct ServerTask(JoinHandle<()>);

impl Drop for ServerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a running stub server; the server stops when the last clone drops.
#[derive(Clone)]
pub struct StubManagementApi {
    state: Shared,
    addr: SocketAddr,
    _task: Arc<ServerTask>,
}

impl StubManagementApi {
    /// Start a stub accepting `admin`/`admin` and serving an empty inventory.
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(Mutex::new(StubState {
            username: "admin".to_string(),
            password: "admin".to_string(),
            cookie_name: CookieName::Canonical,
            send_cookie: true,
            session_token: None,
            tokens_issued: 0,
            devices: json!({ "physicalDevices": [], "total": 0 }),
            login_replies: VecDeque::new(),
            list_replies: VecDeque::new(),
            login_count: 0,
            list_count: 0,
            last_list_request: None,
        }));

        let app = Router::new()
            .route(&format!("{API_PREFIX}Login"), post(login))
            .route(&format!("{API_PREFIX}ListPhysicalDevices"), post(list_physical_devices))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("stub API server failed: {}", e);
            }
        });
        log::info!("stub management API listening on {}", addr);

        Ok(Self {
            state,
            addr,
            _task: Arc::new(ServerTask(task)),
        })
    }

    /// Base URL with trailing slash, e.g. `http://127.0.0.1:4321/api/v2/`
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.username = username.to_string();
            state.password = password.to_string();
        }
        self
    }

    pub fn with_cookie_name(self, name: CookieName) -> Self {
        self.state.lock().cookie_name = name;
        self
    }

    /// Answer logins with 200 but no session cookie.
    pub fn without_cookie(self) -> Self {
        self.state.lock().send_cookie = false;
        self
    }

    /// Inventory served to authenticated list requests.
    pub fn set_devices(&self, devices: Value) {
        self.state.lock().devices = devices;
    }

    /// Invalidate the current session; the next list request gets 401.
    pub fn expire_session(&self) {
        self.state.lock().session_token = None;
    }

    /// Queue a raw reply for the next list request, ahead of any auth check.
    pub fn push_list_reply(&self, status: u16, body: Value) {
        let reply = scripted(status, body);
        self.state.lock().list_replies.push_back(reply);
    }

    /// Queue a raw reply for the next login request.
    pub fn push_login_reply(&self, status: u16, body: Value) {
        let reply = scripted(status, body);
        self.state.lock().login_replies.push_back(reply);
    }

    pub fn login_count(&self) -> usize {
        self.state.lock().login_count
    }

    pub fn list_count(&self) -> usize {
        self.state.lock().list_count
    }

    /// JSON body of the most recent list request.
    pub fn last_list_request(&self) -> Option<Value> {
        self.state.lock().last_list_request.clone()
    }
}

fn scripted(status: u16, body: Value) -> ScriptedReply {
    ScriptedReply {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body,
    }
}

// POST {base}Login
async fn login(State(stub): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = stub.lock();
    state.login_count += 1;

    if let Some(reply) = state.login_replies.pop_front() {
        return (reply.status, Json(reply.body)).into_response();
    }

    let login = body.get("login").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if login != Some(state.username.as_str()) || password != Some(state.password.as_str()) {
        log::debug!("stub login rejected for {:?}", login);
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" }))).into_response();
    }

    state.tokens_issued += 1;
    let token = format!("session-{}", state.tokens_issued);
    state.session_token = Some(token.clone());

    if !state.send_cookie {
        return (StatusCode::OK, Json(json!({}))).into_response();
    }
    let cookie = format!("{}={}; Path=/; HttpOnly", state.cookie_name.as_str(), token);
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(json!({}))).into_response()
}

// POST {base}ListPhysicalDevices
async fn list_physical_devices(
    State(stub): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = stub.lock();
    state.list_count += 1;
    state.last_list_request = Some(body);

    if let Some(reply) = state.list_replies.pop_front() {
        return (reply.status, Json(reply.body)).into_response();
    }

    let presented = session_from_cookie(&headers);
    match (&state.session_token, presented) {
        (Some(expected), Some(token)) if *expected == token => {
            (StatusCode::OK, Json(state.devices.clone())).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response(),
    }
}

/// Session token from either cookie spelling.
fn session_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| {
            *name == CookieName::Canonical.as_str() || *name == CookieName::Misspelled.as_str()
        })
        .map(|(_, token)| token.to_string())
}
