//! In-process stub HTTP server for end-to-end tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};

use apiconform_core::endpoint::Scenario;
use apiconform_core::scenario::{Format, ScenarioFile};

pub const STUB: &str = r#"{"summary":[{"schema_id":30,"status_code":200}]}"#;

pub const SCENARIO: &str = r#"
name: documents
schema_id: 30
identity_headers:
  X-Tenant-ID: acme
cookies:
  session: abc
groups:
  - name: crud
    endpoints:
      - method: POST
        path: /documents
        body:
          required: true
          schema:
            type: object
            required: [title, pages]
            unevaluatedProperties: false
            properties:
              title: { type: string }
              pages: { type: integer, minimum: 1, maximum: 500 }
      - method: GET
        path: /documents/{id}
        parameters:
          - { name: id, in: path, schema: { type: string, format: uuid } }
          - { name: limit, in: query, required: true, schema: { type: integer, minimum: 1, maximum: 50 } }
"#;

pub fn scenario() -> Scenario {
    ScenarioFile::parse(SCENARIO, Format::Yaml)
        .unwrap()
        .compile()
        .unwrap()
}

#[derive(Debug)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Lower-cased names
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StubRequest {
    fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            query: uri.query().unwrap_or_default().to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: body.to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

pub type Handler = fn(&StubRequest) -> (u16, String);

/// Serve `handler` for every route on an ephemeral port; returns the base URL.
///
/// The server runs on its own tokio runtime so the blocking runner can be
/// driven from a plain `#[test]`.
pub fn spawn(handler: Handler) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind listener");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let addr = listener.local_addr().expect("local addr");

    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
            let request = StubRequest::from_parts(&method, &uri, &headers, body);
            let (status, body) = handler(&request);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        },
    );

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            axum::serve(listener, app).await.expect("serve stub");
        });
    });
    format!("http://{addr}")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn reject(status: u16, message: &str) -> (u16, String) {
    (status, format!(r#"{{"error":"{message}"}}"#))
}

/// A target that validates every request the scenario describes.
pub fn strict(req: &StubRequest) -> (u16, String) {
    if req.header("x-schema-id") != Some("30") {
        return reject(400, "schema id");
    }
    if req.header("x-tenant-id") != Some("acme") {
        return reject(401, "tenant");
    }
    if !req.header("cookie").is_some_and(|c| c.contains("session=abc")) {
        return reject(401, "session");
    }

    match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/documents") => {
            let Ok(serde_json::Value::Object(body)) =
                serde_json::from_slice::<serde_json::Value>(&req.body)
            else {
                return reject(400, "body");
            };
            let title_ok = body.get("title").is_some_and(serde_json::Value::is_string);
            let pages_ok = body
                .get("pages")
                .and_then(serde_json::Value::as_i64)
                .is_some_and(|p| (1..=500).contains(&p));
            let closed = body.keys().all(|k| k == "title" || k == "pages");
            if title_ok && pages_ok && closed {
                (200, STUB.to_string())
            } else {
                reject(400, "body")
            }
        }
        ("GET", path) => {
            let Some(id) = path.strip_prefix("/documents/") else {
                return reject(404, "route");
            };
            if !is_uuid(id) {
                return reject(404, "id");
            }
            match req.query_param("limit").and_then(|v| v.parse::<i64>().ok()) {
                Some(limit) if (1..=50).contains(&limit) => (200, STUB.to_string()),
                _ => reject(400, "limit"),
            }
        }
        _ => reject(404, "route"),
    }
}

/// A target that acknowledges everything.
pub fn lenient(_req: &StubRequest) -> (u16, String) {
    (200, STUB.to_string())
}

/// Echoes the received `Accept` header as a JSON string.
pub fn echo_accept(req: &StubRequest) -> (u16, String) {
    let accept = req.header("accept").unwrap_or_default();
    (200, serde_json::Value::from(accept).to_string())
}
