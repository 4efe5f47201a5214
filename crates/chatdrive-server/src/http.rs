//! HTTP server for the chat webhook and the OAuth callback
//!
//! Routes:
//! - `POST /` - signed webhook deliveries from the chat platform
//! - `GET /oauth/callback` - browser redirect back from the Google consent page

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatdrive_core::domain::{ConnectionError, WebhookPayload};
use chatdrive_line::signature::SIGNATURE_HEADER;

use crate::context::AppContext;

/// Path of the OAuth redirect target
pub const CALLBACK_PATH: &str = "/oauth/callback";

/// Largest webhook body accepted
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

pub const INVALID_STATE: &str = "Invalid state parameter. Please try again.";
pub const AUTHORIZATION_CANCELLED: &str = "Authorization was cancelled.";
pub const EXCHANGE_FAILED: &str = "Failed to exchange token.";
pub const SAVE_FAILED: &str = "Failed to save token.";

/// HTTP server bound to the configured listen address
pub struct WebServer {
    ctx: Arc<AppContext>,
    addr: SocketAddr,
}

impl WebServer {
    /// Creates a new `WebServer`
    ///
    /// # Arguments
    /// * `ctx` - The shared application context
    /// * `endpoint` - Address to bind, e.g. `"0.0.0.0:5000"`
    pub fn new(ctx: Arc<AppContext>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint.parse()?;
        Ok(Self { ctx, addr })
    }

    /// Accepts connections until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Accepts connections on an already-bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        info!(addr = %listener.local_addr()?, "HTTP server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let ctx = Arc::clone(&self.ctx);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let ctx = Arc::clone(&ctx);
                            async move { handle_request(req, &ctx).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            debug!(peer = %peer, error = %e, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("HTTP server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Handles a single HTTP request
pub async fn handle_request<B>(
    req: Request<B>,
    ctx: &AppContext,
) -> Result<Response<Full<Bytes>>, hyper::Error>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, "/") => handle_webhook(req, ctx).await,
        (&Method::GET, CALLBACK_PATH) => handle_callback(req.uri().query(), ctx).await,
        (_, "/") | (_, CALLBACK_PATH) => text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(response)
}

// ============================================================================
// Webhook
// ============================================================================

async fn handle_webhook<B>(req: Request<B>, ctx: &AppContext) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match Limited::new(req.into_body(), MAX_WEBHOOK_BODY_BYTES)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit = MAX_WEBHOOK_BODY_BYTES, "Webhook body too large");
            return text(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
        }
        Err(e) => {
            warn!(error = %e, "Failed to read webhook body");
            return text(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let Some(signature) = signature else {
        warn!("Webhook request without signature");
        return text(StatusCode::BAD_REQUEST, "Missing signature");
    };

    if !ctx.verifier.verify(&body, &signature) {
        warn!("Webhook signature mismatch");
        return text(StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook body");
            return text(StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    debug!(events = payload.events.len(), "Webhook received");
    ctx.router.dispatch_all(&payload.events).await;

    text(StatusCode::OK, "OK")
}

// ============================================================================
// OAuth callback
// ============================================================================

/// Parameters of the consent redirect
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parses the query string of the callback URL
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "state" => &mut params.state,
                "code" => &mut params.code,
                "error" => &mut params.error,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

async fn handle_callback(query: Option<&str>, ctx: &AppContext) -> Response<Full<Bytes>> {
    let params = CallbackParams::parse(query);

    if let Some(reason) = &params.error {
        info!(reason = %reason, "Authorization declined at the consent page");
        if let Some(state) = &params.state {
            if let Err(e) = ctx.flow.abandon(state).await {
                warn!(error = %e, "Failed to discard declined authorization state");
            }
        }
        return html(StatusCode::BAD_REQUEST, &error_html(AUTHORIZATION_CANCELLED));
    }

    let (Some(state), Some(code)) = (params.state, params.code) else {
        warn!("OAuth callback without state or code");
        return html(StatusCode::BAD_REQUEST, &error_html(INVALID_STATE));
    };

    match ctx.flow.complete(&state, &code).await {
        Ok(user) => {
            info!(user = %user, "Google Drive connected");
            html(StatusCode::OK, &success_html())
        }
        Err(ConnectionError::StateNotFound) => {
            warn!("OAuth callback with unknown or expired state");
            html(StatusCode::BAD_REQUEST, &error_html(INVALID_STATE))
        }
        Err(e @ ConnectionError::ExchangeFailed(_)) => {
            warn!(error = %e, "Code exchange failed");
            html(StatusCode::INTERNAL_SERVER_ERROR, &error_html(EXCHANGE_FAILED))
        }
        Err(e @ ConnectionError::Persistence(_)) => {
            error!(error = %e, "Failed to persist credential");
            html(StatusCode::INTERNAL_SERVER_ERROR, &error_html(SAVE_FAILED))
        }
        Err(e) => {
            error!(error = %e, "Unexpected authorization failure");
            html(StatusCode::INTERNAL_SERVER_ERROR, &error_html(EXCHANGE_FAILED))
        }
    }
}

/// Returns the HTML for a successful authorization page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>ChatDrive - Authorization Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Successful</h1>
    <p>Your Google Drive is now connected.</p>
    <p>You can close this window and return to the chat to start uploading files.</p>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authorization error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>ChatDrive - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// Response helpers
// ============================================================================

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn text(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", body.to_string())
}

fn html(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    respond(status, "text/html; charset=utf-8", body.to_string())
}
