//! JSON-RPC 2.0 transport for the Zabbix API.
//!
//! One operation: [`Transport::post`]. The envelope is
//! `{"jsonrpc":"2.0","method":..,"params":..,"id":<monotonic>}`; the auth
//! token travels either in the `Authorization: Bearer` header (≥6.4) or in
//! the body under `auth` (<6.4) — the caller decides via [`AuthPlacement`],
//! since placement depends on the server version the client tracks.
//!
//! Server-reported errors are classified into [`ApiErrorKind`]s and their
//! messages redacted: the live auth token and any `token`/`password` param
//! values are replaced with placeholders before the error leaves this
//! module.

use std::cell::Cell;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ApiError, ApiErrorKind};

pub const RPC_ENDPOINT: &str = "/api_jsonrpc.php";

/// Methods that never carry an auth token.
pub const UNAUTHENTICATED_METHODS: [&str; 3] =
    ["apiinfo.version", "user.login", "user.checkauthentication"];

pub fn is_unauthenticated_method(method: &str) -> bool {
    UNAUTHENTICATED_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

/// Canonicalise a server URL: strip a trailing `/api_jsonrpc.php` if the
/// caller already included it, then re-append it.
pub fn canonical_api_url(server: &str) -> String {
    let base = server.split(RPC_ENDPOINT).next().unwrap_or(server);
    format!("{}{}", base.trim_end_matches('/'), RPC_ENDPOINT)
}

/// Error object of a failed JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// A parsed JSON-RPC response. Exactly one of `result`/`error` is present
/// on a conforming server.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl RpcResponse {
    /// The result value, or `Null` if the server omitted it.
    pub fn into_result(self) -> Value {
        self.result.unwrap_or(Value::Null)
    }
}

/// Where the auth token goes for this request.
#[derive(Debug, Clone, Copy)]
pub enum AuthPlacement<'a> {
    /// `Authorization: Bearer <token>` header (Zabbix ≥ 6.4).
    Header(&'a str),
    /// `"auth": "<token>"` in the request body (Zabbix < 6.4).
    Body(&'a str),
}

impl AuthPlacement<'_> {
    fn token(&self) -> &str {
        match self {
            AuthPlacement::Header(t) | AuthPlacement::Body(t) => t,
        }
    }
}

/// The HTTP side of the client: one reqwest client, one URL, one monotonic
/// request counter. Single-threaded by design; the front-end serialises
/// work per client instance.
#[derive(Debug)]
pub struct Transport {
    http: Client,
    url: String,
    id: Cell<u64>,
}

impl Transport {
    pub fn new(
        server: &str,
        timeout: Option<Duration>,
        verify_ssl: bool,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json-rpc"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .user_agent(concat!("zbx/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_ssl)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: canonical_api_url(server),
            id: Cell::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of requests issued so far. The envelope id of request `n` is
    /// `n - 1`; the counter moves by exactly one per call regardless of
    /// outcome.
    pub fn request_count(&self) -> u64 {
        self.id.get()
    }

    /// Post one JSON-RPC request and parse the response.
    pub fn post(
        &self,
        method: &str,
        params: &Value,
        auth: Option<AuthPlacement<'_>>,
    ) -> Result<RpcResponse, ApiError> {
        let id = self.id.get();
        self.id.set(id + 1);

        let mut envelope = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        if let Some(AuthPlacement::Body(token)) = auth {
            envelope["auth"] = Value::String(token.to_string());
        }
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| ApiError::request_other(format!("failed to encode request: {e}")))?;

        tracing::debug!(method, url = %self.url, id, "sending request");

        let mut request = self.http.post(&self.url).body(body);
        if let Some(AuthPlacement::Header(token)) = auth {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;

        tracing::debug!(status = %response.status(), "response received");
        if let Err(e) = response.error_for_status_ref() {
            return Err(ApiError::Transport(e));
        }

        let text = response.text()?;
        if text.is_empty() {
            return Err(ApiError::empty_response());
        }

        let parsed: RpcResponse =
            serde_json::from_str(&text).map_err(|source| ApiError::ResponseParsing {
                body_len: text.len(),
                source,
            })?;

        if let Some(error) = &parsed.error {
            return Err(self.error_from_body(error, auth.as_ref().map(|a| a.token()), params));
        }
        Ok(parsed)
    }

    fn error_from_body(
        &self,
        error: &ApiErrorBody,
        auth: Option<&str>,
        params: &Value,
    ) -> ApiError {
        // Some errors come without 'data'; keep the message shape stable.
        let data = error.data.as_deref().unwrap_or("No data");
        let message = redact(
            &format!("Error: {} {}", error.message, data),
            auth,
            params,
        );
        let kind = ApiErrorKind::classify(&message);
        if kind == ApiErrorKind::TokenExpired {
            tracing::debug!("API token has expired");
        }
        ApiError::Request {
            kind,
            message,
            error: Some(error.clone()),
        }
    }
}

/// Replace the live auth token and any `token`/`password` param values in a
/// message before it is surfaced or logged.
fn redact(message: &str, auth: Option<&str>, params: &Value) -> String {
    let mut out = message.to_string();
    let mut scrub = |needle: Option<&str>, placeholder: &str| {
        if let Some(needle) = needle
            && !needle.is_empty()
        {
            out = out.replace(needle, placeholder);
        }
    };
    scrub(auth, "<token>");
    scrub(params.get("token").and_then(Value::as_str), "<token>");
    scrub(params.get("password").and_then(Value::as_str), "<password>");
    out
}

#[cfg(test)]
mod tests {
    use std::thread;

    use tiny_http::{Response, Server, StatusCode};

    use super::*;

    fn with_server<F>(handler: F) -> (String, thread::JoinHandle<()>)
    where
        F: FnOnce(tiny_http::Request) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("server");
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let req = server.recv().expect("request");
            handler(req);
        });
        (addr, handle)
    }

    fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body).with_header(
            tiny_http::Header::from_bytes("Content-Type", "application/json").expect("header"),
        )
    }

    fn read_body(req: &mut tiny_http::Request) -> Value {
        let mut body = String::new();
        use std::io::Read;
        req.as_reader().read_to_string(&mut body).expect("body");
        serde_json::from_str(&body).expect("body json")
    }

    #[test]
    fn canonical_url_appends_endpoint() {
        assert_eq!(
            canonical_api_url("https://zbx.example.com"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
        assert_eq!(
            canonical_api_url("https://zbx.example.com/"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn canonical_url_strips_existing_endpoint() {
        assert_eq!(
            canonical_api_url("https://zbx.example.com/api_jsonrpc.php"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn unauthenticated_method_detection_ignores_case() {
        assert!(is_unauthenticated_method("apiinfo.version"));
        assert!(is_unauthenticated_method("User.Login"));
        assert!(!is_unauthenticated_method("host.get"));
    }

    #[test]
    fn post_sends_envelope_and_parses_result() {
        let (addr, handle) = with_server(|mut req| {
            assert_eq!(req.url(), "/api_jsonrpc.php");
            let content_type = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.as_str().to_string());
            assert_eq!(content_type.as_deref(), Some("application/json-rpc"));

            let body = read_body(&mut req);
            assert_eq!(body["jsonrpc"], "2.0");
            assert_eq!(body["method"], "apiinfo.version");
            assert_eq!(body["id"], 0);
            assert!(body.get("auth").is_none());

            req.respond(json_response(r#"{"jsonrpc":"2.0","id":0,"result":"7.0.0"}"#))
                .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let resp = transport
            .post("apiinfo.version", &json!({}), None)
            .expect("response");
        assert_eq!(resp.into_result(), json!("7.0.0"));
        assert_eq!(transport.request_count(), 1);
        handle.join().expect("join");
    }

    #[test]
    fn post_places_auth_in_body() {
        let (addr, handle) = with_server(|mut req| {
            let body = read_body(&mut req);
            assert_eq!(body["auth"], "legacy-session");
            req.respond(json_response(r#"{"jsonrpc":"2.0","id":0,"result":[]}"#))
                .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        transport
            .post("host.get", &json!({}), Some(AuthPlacement::Body("legacy-session")))
            .expect("response");
        handle.join().expect("join");
    }

    #[test]
    fn post_places_auth_in_header() {
        let (addr, handle) = with_server(|mut req| {
            let authorization = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            assert_eq!(authorization.as_deref(), Some("Bearer modern-token"));

            let body = read_body(&mut req);
            assert!(body.get("auth").is_none());
            req.respond(json_response(r#"{"jsonrpc":"2.0","id":0,"result":[]}"#))
                .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        transport
            .post("host.get", &json!({}), Some(AuthPlacement::Header("modern-token")))
            .expect("response");
        handle.join().expect("join");
    }

    #[test]
    fn id_increments_per_call_regardless_of_outcome() {
        let server = Server::http("127.0.0.1:0").expect("server");
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            for _ in 0..3 {
                let req = match server.recv_timeout(Duration::from_secs(5)) {
                    Ok(Some(req)) => req,
                    _ => break,
                };
                req.respond(json_response(r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32602,"message":"Invalid params.","data":"bad"}}"#))
                    .expect("respond");
            }
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        for expected in 1..=3u64 {
            let err = transport
                .post("host.get", &json!({}), None)
                .expect_err("server error");
            assert!(matches!(err, ApiError::Request { .. }));
            assert_eq!(transport.request_count(), expected);
        }
        handle.join().expect("join");
    }

    #[test]
    fn empty_body_is_a_request_error() {
        let (addr, handle) = with_server(|req| {
            req.respond(Response::from_string("")).expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let err = transport
            .post("host.get", &json!({}), None)
            .expect_err("empty body");
        match err {
            ApiError::Request { kind, message, .. } => {
                assert_eq!(kind, ApiErrorKind::Other);
                assert!(message.contains("empty response"));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.join().expect("join");
    }

    #[test]
    fn malformed_body_reports_length_not_content() {
        let secret_body = "<html>stack trace with secrets</html>";
        let body_len = secret_body.len();
        let (addr, handle) = with_server(move |req| {
            req.respond(Response::from_string(secret_body)).expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let err = transport
            .post("host.get", &json!({}), None)
            .expect_err("malformed");
        match &err {
            ApiError::ResponseParsing { body_len: len, .. } => assert_eq!(*len, body_len),
            other => panic!("unexpected error: {other}"),
        }
        let rendered = err.to_string();
        assert!(rendered.contains(&body_len.to_string()));
        assert!(!rendered.contains("stack trace"));
        handle.join().expect("join");
    }

    #[test]
    fn http_error_status_wins_over_body() {
        let (addr, handle) = with_server(|req| {
            req.respond(
                Response::from_string(r#"{"jsonrpc":"2.0","id":0,"result":[]}"#)
                    .with_status_code(StatusCode(500)),
            )
            .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let err = transport
            .post("host.get", &json!({}), None)
            .expect_err("http error");
        assert!(matches!(err, ApiError::Transport(_)));
        handle.join().expect("join");
    }

    #[test]
    fn server_error_is_classified_and_kept() {
        let (addr, handle) = with_server(|req| {
            req.respond(json_response(
                r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32602,"message":"Session terminated, re-login, please.","data":null}}"#,
            ))
            .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let err = transport
            .post("host.get", &json!({}), Some(AuthPlacement::Body("sess")))
            .expect_err("session expired");
        match err {
            ApiError::Request { kind, error, .. } => {
                assert_eq!(kind, ApiErrorKind::SessionExpired);
                assert_eq!(error.map(|e| e.code), Some(-32602));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.join().expect("join");
    }

    #[test]
    fn error_messages_are_redacted() {
        let (addr, handle) = with_server(|req| {
            req.respond(json_response(
                r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32602,"message":"Invalid params.","data":"Login failed for password \"hunter2\" with token live-token-123"}}"#,
            ))
            .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let params = json!({"username": "Admin", "password": "hunter2", "token": "live-token-123"});
        let err = transport
            .post("user.login", &params, Some(AuthPlacement::Body("live-token-123")))
            .expect_err("error");
        let rendered = err.to_string();
        assert!(!rendered.contains("hunter2"), "password leaked: {rendered}");
        assert!(!rendered.contains("live-token-123"), "token leaked: {rendered}");
        assert!(rendered.contains("<password>"));
        assert!(rendered.contains("<token>"));
        handle.join().expect("join");
    }

    #[test]
    fn error_without_data_gets_placeholder() {
        let (addr, handle) = with_server(|req| {
            req.respond(json_response(
                r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32500,"message":"Not authorized."}}"#,
            ))
            .expect("respond");
        });

        let transport = Transport::new(&addr, None, true).expect("transport");
        let err = transport
            .post("host.get", &json!({}), None)
            .expect_err("error");
        match err {
            ApiError::Request { kind, message, .. } => {
                assert_eq!(kind, ApiErrorKind::NotAuthorized);
                assert!(message.contains("No data"));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.join().expect("join");
    }
}
