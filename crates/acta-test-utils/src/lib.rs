//! Testing utilities for Acta workspace
//!
//! Scripted fakes for the transport, identity and telemetry seams, plus a
//! fixture wiring them into an [`Acta`].

#![allow(missing_docs)]

use acta_auth::{IdentityError, IdentityProvider, IdentitySession, SessionStore};
use acta_client::{HttpRequest, RawResponse, Transport, TransportError};
use acta_core::{Acta, ActaConfig, TelemetryRecord, TelemetrySink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub const BASE_URL: &str = "http://acta.test/prod";

type Scripted = Result<RawResponse, TransportError>;

/// Transport answering from per-path scripts
///
/// Each path holds a queue of answers; the last one repeats. Paths match by
/// suffix of the request path, so `"/projects"` matches
/// `http://acta.test/prod/projects`. Unscripted paths answer `404`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    fallback: Mutex<Option<Scripted>>,
    stalled: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails with a connection error
    pub fn always_network_failure() -> Self {
        let transport = Self::new();
        *transport.fallback.lock() = Some(Err(connection_refused()));
        transport
    }

    /// Queue a response for `path`
    pub fn respond(&self, path: &str, response: RawResponse) -> &Self {
        self.push(path, Ok(response))
    }

    /// Queue a JSON response for `path`
    pub fn respond_json(&self, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.respond(path, RawResponse::new(status, body.to_string()))
    }

    /// Queue a transport failure for `path`
    pub fn fail(&self, path: &str, error: TransportError) -> &Self {
        self.push(path, Err(error))
    }

    /// Requests to `path` never get an answer
    pub fn stall(&self, path: &str) -> &Self {
        self.stalled.lock().push(path.to_string());
        self
    }

    /// Everything sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent
    pub fn attempts(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests sent to `path`
    pub fn attempts_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.path().ends_with(path))
            .count()
    }

    /// Paths requested, in order
    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    fn push(&self, path: &str, answer: Scripted) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|(key, _)| key == path) {
            Some((_, queue)) => queue.push_back(answer),
            None => routes.push((path.to_string(), VecDeque::from([answer]))),
        }
        self
    }

    fn answer(&self, path: &str) -> Scripted {
        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .filter(|(key, _)| path.ends_with(key.as_str()))
            .max_by_key(|(key, _)| key.len());

        match route {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Ok(not_found())),
            Some((_, queue)) => queue.front().cloned().unwrap_or_else(|| Ok(not_found())),
            None => self.fallback.lock().clone().unwrap_or_else(|| Ok(not_found())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let path = request.url.path().to_string();
        self.requests.lock().push(request);
        let stalled = self.stalled.lock().iter().any(|key| path.ends_with(key.as_str()));
        if stalled {
            std::future::pending::<()>().await;
        }
        self.answer(&path)
    }
}

pub fn connection_refused() -> TransportError {
    TransportError::Connect("connection refused".to_string())
}

fn not_found() -> RawResponse {
    RawResponse::new(404, r#"{"message":"not found"}"#)
}

/// Identity provider answering from a script
///
/// `Some(token)` issues a session, `None` fails. The last entry repeats.
#[derive(Debug, Default)]
pub struct ScriptedIdentity {
    script: Mutex<VecDeque<Option<String>>>,
    login_id: Option<String>,
    calls: Mutex<Vec<bool>>,
}

impl ScriptedIdentity {
    /// Always issues `token`
    pub fn issuing(token: &str) -> Self {
        Self::sequence([Some(token)])
    }

    /// Never issues a session
    pub fn failing() -> Self {
        Self::sequence([None])
    }

    pub fn sequence<'a>(script: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|t| t.map(str::to_string)).collect()),
            login_id: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_login_id(mut self, login_id: &str) -> Self {
        self.login_id = Some(login_id.to_string());
        self
    }

    /// `force_refresh` flag of every call, in order
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn forced_count(&self) -> usize {
        self.calls.lock().iter().filter(|forced| **forced).count()
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_session(&self, force_refresh: bool) -> Result<IdentitySession, IdentityError> {
        self.calls.lock().push(force_refresh);

        let next = {
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().flatten()
            } else {
                script.front().cloned().flatten()
            }
        };

        match next {
            Some(token) => {
                let session = IdentitySession::new(token);
                Ok(match &self.login_id {
                    Some(login_id) => session.with_login_id(login_id.as_str()),
                    None => session,
                })
            }
            None => Err(IdentityError::NoActiveSession),
        }
    }
}

/// Telemetry sink keeping every record
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, action: &str) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.action == action)
            .cloned()
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, record: TelemetryRecord) {
        self.records.lock().push(record);
    }
}

/// [`Acta`] wired to scripted fakes
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub identity: Arc<ScriptedIdentity>,
    pub telemetry: Arc<MemorySink>,
    pub store: Arc<SessionStore>,
    pub acta: Acta,
}

impl Harness {
    pub fn new(transport: ScriptedTransport, identity: ScriptedIdentity) -> Self {
        Self::with_config(ActaConfig::new(), transport, identity)
    }

    /// Base URL is always [`BASE_URL`]
    pub fn with_config(config: ActaConfig, transport: ScriptedTransport, identity: ScriptedIdentity) -> Self {
        let transport = Arc::new(transport);
        let identity = Arc::new(identity);
        let telemetry = Arc::new(MemorySink::new());
        let store = Arc::new(SessionStore::in_memory());

        let acta = Acta::with_parts(
            config.with_api_base_url(BASE_URL),
            Arc::clone(&store),
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&telemetry) as Arc<dyn TelemetrySink>,
        )
        .expect("harness config is valid");

        Self {
            transport,
            identity,
            telemetry,
            store,
            acta,
        }
    }

    /// Signed-in harness whose identity always issues `token`
    pub fn signed_in(token: &str) -> Self {
        Self::signed_in_with(ScriptedTransport::new(), token)
    }

    pub fn signed_in_with(transport: ScriptedTransport, token: &str) -> Self {
        Self::new(transport, ScriptedIdentity::issuing(token))
    }

    /// Bearer tokens sent, one per request
    pub fn bearers(&self) -> Vec<Option<String>> {
        self.transport
            .requests()
            .iter()
            .map(|r| r.bearer.as_ref().map(|b| b.as_str().to_string()))
            .collect()
    }
}
