//! Loopback redirect listener (RFC 8252)
//!
//! Serves the redirect URI on a loopback interface for the length of one
//! login and hands the first redirect it receives back to the login flow.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use askama::Template;
use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::error::{AuthError, ProtocolError};
use super::templates;
use super::types::CallbackParams;

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>,
}

/// Listener bound for a single login attempt
///
/// Dropping the listener shuts the server down gracefully, so a page that is
/// still being written to the browser completes.
pub struct CallbackListener {
    redirect_uri: String,
    receiver: oneshot::Receiver<CallbackParams>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl CallbackListener {
    /// Bind `host:port` (port 0 picks an ephemeral port) and serve `path`
    pub async fn bind(host: &str, port: u16, path: &str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        let redirect_uri = if host.contains(':') {
            format!("http://[{}]:{}{}", host, local_addr.port(), path)
        } else {
            format!("http://{}:{}{}", host, local_addr.port(), path)
        };

        let (sender, receiver) = oneshot::channel();
        let state = CallbackState {
            sender: Arc::new(Mutex::new(Some(sender))),
        };

        let app = Router::new()
            .route(path, get(handle_callback))
            .fallback(handle_not_found)
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                tracing::error!(local_addr = %local_addr, "Callback listener failed: {}", e);
            }
        });

        tracing::debug!(redirect_uri = %redirect_uri, "Callback listener started");

        Ok(Self {
            redirect_uri,
            receiver,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the redirect and return its authorization code
    pub async fn wait_for_code(mut self, expected_state: &str) -> Result<String, AuthError> {
        let params = (&mut self.receiver).await.map_err(|_| {
            AuthError::Other(anyhow::anyhow!(
                "callback listener stopped before a redirect arrived"
            ))
        })?;
        validate_callback(params, expected_state)
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Check a redirect against the login request that produced it
///
/// An error response wins over everything else so a denial is always
/// reported as such.
fn validate_callback(params: CallbackParams, expected_state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Protocol(ProtocolError {
            error,
            description: params.error_description,
            uri: params.error_uri,
        }));
    }

    match params.state.as_deref() {
        Some(state) if constant_time_eq(state, expected_state) => {}
        _ => return Err(AuthError::StateMismatch),
    }

    params.code.filter(|code| !code.is_empty()).ok_or(AuthError::MissingCode)
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let sender = state.sender.lock().take();
    let Some(sender) = sender else {
        return render_page(StatusCode::CONFLICT, templates::CompletedPage);
    };

    let response = match &params.error {
        Some(error) => render_page(
            StatusCode::OK,
            templates::ErrorPage {
                error,
                description: params.error_description.as_deref(),
            },
        ),
        None => render_page(StatusCode::OK, templates::SuccessPage),
    };

    if sender.send(params).is_err() {
        tracing::debug!("Redirect arrived after the login attempt was abandoned");
    }

    response
}

async fn handle_not_found() -> Response {
    render_page(StatusCode::NOT_FOUND, templates::NotFoundPage)
}

fn render_page(status: StatusCode, page: impl Template) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render callback page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(String::from),
            state: state.map(String::from),
            error: error.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("state", "state"));
        assert!(!constant_time_eq("state", "other"));
        assert!(!constant_time_eq("state", "stat"));
        assert!(!constant_time_eq("", "state"));
    }

    #[test]
    fn test_validate_callback_accepts_matching_state() {
        let code = validate_callback(params(Some("abc"), Some("xyz"), None), "xyz").unwrap();
        assert_eq!(code, "abc");
    }

    #[test]
    fn test_validate_callback_rejects_state_mismatch() {
        let result = validate_callback(params(Some("abc"), Some("forged"), None), "xyz");
        assert!(matches!(result, Err(AuthError::StateMismatch)));

        let result = validate_callback(params(Some("abc"), None, None), "xyz");
        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[test]
    fn test_validate_callback_requires_code() {
        let result = validate_callback(params(None, Some("xyz"), None), "xyz");
        assert!(matches!(result, Err(AuthError::MissingCode)));

        let result = validate_callback(params(Some(""), Some("xyz"), None), "xyz");
        assert!(matches!(result, Err(AuthError::MissingCode)));
    }

    #[test]
    fn test_validate_callback_error_wins() {
        let mut redirect = params(None, Some("forged"), Some("access_denied"));
        redirect.error_description = Some("The user denied the request".to_string());

        match validate_callback(redirect, "xyz") {
            Err(AuthError::Protocol(error)) => {
                assert!(error.is_access_denied());
                assert_eq!(error.description.as_deref(), Some("The user denied the request"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listener_delivers_code() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/callback/login/local")
            .await
            .unwrap();
        assert!(listener.redirect_uri().starts_with("http://127.0.0.1:"));
        assert!(listener.redirect_uri().ends_with("/callback/login/local"));

        let url = format!("{}?code=abc&state=xyz", listener.redirect_uri());
        let request = tokio::spawn(async move { reqwest::get(url).await });

        let code = listener.wait_for_code("xyz").await.unwrap();
        assert_eq!(code, "abc");

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("Sign-in complete"));
    }

    #[tokio::test]
    async fn test_listener_reports_access_denied() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/callback/login/github")
            .await
            .unwrap();

        let url = format!(
            "{}?error=access_denied&error_description=nope&state=xyz",
            listener.redirect_uri()
        );
        let response = reqwest::get(url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("access_denied"));

        let error = listener.wait_for_code("xyz").await.unwrap_err();
        assert!(error.is_access_denied());
    }

    #[tokio::test]
    async fn test_listener_accepts_single_callback() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/callback/login/local")
            .await
            .unwrap();
        let client = reqwest::Client::new();

        let first = format!("{}?code=first&state=xyz", listener.redirect_uri());
        let second = format!("{}?code=second&state=xyz", listener.redirect_uri());

        let response = client.get(&first).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let response = client.get(&second).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

        assert_eq!(listener.wait_for_code("xyz").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_dropped_listener_shuts_down() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/callback/login/local")
            .await
            .unwrap();
        let url = format!("{}?code=abc&state=xyz", listener.redirect_uri());
        drop(listener);

        let mut refused = false;
        for _ in 0..50 {
            if reqwest::get(&url).await.is_err() {
                refused = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(refused, "listener still serving after drop");
    }

    #[tokio::test]
    async fn test_listener_unknown_path_is_not_found() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/callback/login/local")
            .await
            .unwrap();
        let base = listener
            .redirect_uri()
            .trim_end_matches("/callback/login/local")
            .to_string();

        let response = reqwest::get(format!("{}/favicon.ico", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
