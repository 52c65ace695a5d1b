//! Local consent callback listener
//!
//! The identity provider redirects the operator's browser to
//! `http://127.0.0.1:<port>/?code=...&state=...` once consent is given. The
//! listener binds the first free port from the candidate list, serves that
//! single endpoint, and hands the first matching callback back to the auth
//! flow.
//!
//! # Lifecycle
//!
//! The bound socket is owned by the listener until
//! [`CallbackListener::wait_for_callback`] consumes it. The server runs inside
//! that future, so the port is released as soon as the wait returns or the
//! future is dropped.

use crate::auth::AuthError;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const SUCCESS_PAGE: &str =
    "<html><body><h1>Authentication complete</h1><p>You can close this window.</p></body></html>";
const DENIED_PAGE: &str =
    "<html><body><h1>Authentication denied</h1><p>You can close this window.</p></body></html>";
const BAD_REQUEST_PAGE: &str = "<html><body><h1>Invalid authentication callback</h1></body></html>";

/// What the browser delivered to the callback endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
enum Callback {
    Code(String),
    Denied(String),
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<String>,
    sender: mpsc::Sender<Callback>,
}

/// Scoped listener for the OAuth redirect
pub struct CallbackListener {
    port: u16,
    socket: TcpListener,
    router: Router,
    receiver: mpsc::Receiver<Callback>,
}

impl CallbackListener {
    /// Binds a listener on `127.0.0.1` at the first free port in `ports`
    ///
    /// Port `0` asks the OS for any free port. Fails with
    /// [`AuthError::AllPortsBusy`] if no candidate can be bound.
    pub async fn bind(ports: &[u16], expected_state: String) -> Result<Self, AuthError> {
        let mut bound = None;
        for &port in ports {
            match TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => {
                    bound = Some(listener);
                    break;
                }
                Err(e) => {
                    tracing::debug!("Port {} unavailable for callback listener: {}", port, e);
                }
            }
        }

        let socket = bound.ok_or_else(|| AuthError::AllPortsBusy {
            ports: ports.to_vec(),
        })?;
        let port = socket
            .local_addr()
            .map_err(|e| AuthError::Listener(e.to_string()))?
            .port();

        let (sender, receiver) = mpsc::channel(1);
        let state = CallbackState {
            expected_state: Arc::new(expected_state),
            sender,
        };
        let router = Router::new()
            .route("/", get(handle_callback))
            .with_state(state);

        tracing::info!("Listening for the authentication callback on port {}", port);

        Ok(Self {
            port,
            socket,
            router,
            receiver,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI registered with the authorization request
    ///
    /// Uses the loopback literal the socket is bound to, so a browser never
    /// resolves `localhost` to a different interface.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Serves the callback endpoint until the first valid callback arrives
    ///
    /// Returns the authorization code, [`AuthError::ConsentDenied`] if the
    /// provider reported an error, or [`AuthError::Timeout`] if nothing
    /// arrives in time. The port is free again once this returns, and also
    /// when the returned future is dropped before completing.
    pub async fn wait_for_callback(self, timeout: Duration) -> Result<String, AuthError> {
        let Self {
            port,
            socket,
            router,
            mut receiver,
        } = self;

        let server = axum::serve(socket, router).into_future();
        let outcome = tokio::select! {
            callback = receiver.recv() => match callback {
                Some(Callback::Code(code)) => Ok(code),
                Some(Callback::Denied(reason)) => Err(AuthError::ConsentDenied(reason)),
                None => Err(AuthError::Listener(
                    "callback channel closed unexpectedly".to_string(),
                )),
            },
            result = server => Err(AuthError::Listener(match result {
                Ok(()) => "callback server stopped unexpectedly".to_string(),
                Err(e) => e.to_string(),
            })),
            _ = tokio::time::sleep(timeout) => Err(AuthError::Timeout),
        };

        tracing::debug!("Callback listener on port {} closed", port);
        outcome
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("state").map(String::as_str) != Some(state.expected_state.as_str()) {
        tracing::warn!("Ignoring authentication callback with a mismatched state");
        return page(StatusCode::BAD_REQUEST, BAD_REQUEST_PAGE);
    }

    let (callback, body) = if let Some(error) = params.get("error") {
        (Callback::Denied(error.clone()), DENIED_PAGE)
    } else if let Some(code) = params.get("code") {
        (Callback::Code(code.clone()), SUCCESS_PAGE)
    } else {
        return page(StatusCode::BAD_REQUEST, BAD_REQUEST_PAGE);
    };

    // Only the first callback counts
    if state.sender.try_send(callback).is_err() {
        return page(StatusCode::CONFLICT, BAD_REQUEST_PAGE);
    }

    page(StatusCode::OK, body)
}

fn page(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONNECTION, "close")], Html(body)).into_response()
}
