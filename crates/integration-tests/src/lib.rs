//! Integration tests for Coffee House.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p coffee-house-integration-tests
//! ```
//!
//! Tests run the storefront client against [`MockBackend`], an in-process
//! HTTP server bound to an ephemeral local port. It serves the REST
//! endpoints the client uses and records every request it receives.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

const API_PREFIX: &str = "/api/v1/";

/// A request received by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path below `/api/v1/`, e.g. `orders/guest`.
    pub path: String,
    pub query: HashMap<String, String>,
    pub idempotency_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// How the mock backend answers.
#[derive(Debug, Clone)]
pub struct Responses {
    /// Catalog returned by `products/`.
    pub products: Vec<Value>,
    /// Merchant details; `None` answers 503.
    pub merchant: Option<Value>,
    /// Outcome of `khqr/verify/{id}`.
    pub verify_success: bool,
    /// Overrides the order creation reply.
    pub order_failure: Option<(StatusCode, Value)>,
    /// Orders listed by `orders/customer/`.
    pub customer_orders: Vec<Value>,
    /// When set, requests without this bearer token get 401.
    pub required_token: Option<String>,
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            products: vec![
                json!({"id": 1, "name": "Iced Latte", "price": "5.00", "image_url": "/media/latte.png"}),
                json!({"id": 2, "name": "Espresso", "price": "2.50"}),
                json!({"id": 3, "name": "Croissant", "price": "3.25"}),
            ],
            merchant: Some(json!({
                "merchant_name": "Coffee House",
                "merchant_city": "Phnom Penh",
                "country_code": "KH",
            })),
            verify_success: true,
            order_failure: None,
            customer_orders: Vec::new(),
            required_token: None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    responses: Mutex<Responses>,
    requests: Mutex<Vec<RecordedRequest>>,
    next_order_id: Mutex<i64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the Coffee House REST API.
///
/// The server stops when the value is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend with default responses.
    ///
    /// # Errors
    ///
    /// Returns error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        Self::with_responses(Responses::default()).await
    }

    /// Start a backend with the given responses.
    ///
    /// # Errors
    ///
    /// Returns error if no local port can be bound.
    pub async fn with_responses(responses: Responses) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            next_order_id: Mutex::new(100),
        });

        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            shared,
            server,
        })
    }

    /// API base URL to point a client at.
    ///
    /// # Panics
    ///
    /// Never in practice: the address always forms a valid URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1", self.addr)).expect("Invalid mock URL")
    }

    /// Change the responses of a running backend.
    pub fn update(&self, f: impl FnOnce(&mut Responses)) {
        f(&mut lock(&self.shared.responses));
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared.requests).clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Requests whose path starts with `prefix`.
    #[must_use]
    pub fn requests_under(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or_else(|| uri.path())
        .to_string();
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let request = RecordedRequest {
        method,
        path,
        query,
        idempotency_key: header_value("idempotency-key"),
        authorization: header_value(header::AUTHORIZATION.as_str()),
        body: serde_json::from_slice(&body).ok(),
    };
    lock(&shared.requests).push(request.clone());

    let responses = lock(&shared.responses).clone();
    if let Some(token) = &responses.required_token {
        let expected = format!("Bearer {token}");
        if request.authorization.as_deref() != Some(expected.as_str()) {
            return reply(StatusCode::UNAUTHORIZED, json!({"detail": "Not authenticated"}));
        }
    }

    let segments: Vec<&str> = request.path.trim_end_matches('/').split('/').collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["products"]) => reply(StatusCode::OK, Value::from(responses.products)),
        ("GET", ["products", id]) => responses
            .products
            .iter()
            .find(|p| p["id"].to_string() == *id)
            .map_or_else(
                || reply(StatusCode::NOT_FOUND, json!({"detail": "Product not found"})),
                |p| reply(StatusCode::OK, p.clone()),
            ),
        ("GET", ["khqr", "merchant-info"]) => match responses.merchant {
            Some(merchant) => reply(StatusCode::OK, merchant),
            None => reply(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"detail": "Merchant details unavailable"}),
            ),
        },
        ("POST", ["khqr", "generate"]) => {
            let amount = request.query.get("amount").cloned().unwrap_or_default();
            let bill = request
                .query
                .get("bill_number")
                .cloned()
                .unwrap_or_default();
            reply(
                StatusCode::OK,
                json!({"qr_string": format!("KHQR|{bill}|{amount}"), "md5": "d41d8cd9"}),
            )
        }
        ("POST", ["khqr", "verify", _]) => {
            if responses.verify_success {
                reply(StatusCode::OK, json!({"success": true}))
            } else {
                reply(
                    StatusCode::OK,
                    json!({"success": false, "message": "Payment not received"}),
                )
            }
        }
        ("POST", ["orders", "guest"]) => {
            if let Some((status, body)) = responses.order_failure {
                return reply(status, body);
            }
            let id = {
                let mut next = lock(&shared.next_order_id);
                *next += 1;
                *next
            };
            reply(
                StatusCode::CREATED,
                json!({
                    "id": id,
                    "order_number": request.idempotency_key,
                    "status": "pending",
                }),
            )
        }
        ("GET", ["orders", "customer"]) => {
            reply(StatusCode::OK, Value::from(responses.customer_orders))
        }
        _ => reply(StatusCode::NOT_FOUND, json!({"detail": "Not Found"})),
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}
