// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use mprsummary_app::StatusRecord;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

pub const SAMPLE_PRODUCT: &str = "Analytics";
pub const SAMPLE_VERSION: &str = "4.1.0";
pub const SAMPLE_TOTAL: u64 = 7;

/// One canned backend response. A `path` containing `?` only matches that
/// exact URL; otherwise it matches the path with any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoute {
    pub path: String,
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockRoute {
    pub fn json(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            status: 200,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn raw(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn matches_exact(&self, url: &str) -> bool {
        self.path.contains('?') && self.path == url
    }

    fn matches_path(&self, url: &str) -> bool {
        let path = url.split_once('?').map_or(url, |(path, _)| path);
        !self.path.contains('?') && self.path == path
    }
}

/// In-process HTTP server that answers with canned routes and records every
/// URL it was asked for. Requests for unknown routes get a 404.
pub struct MockBackend {
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
    base_url: String,
}

impl MockBackend {
    pub fn start(routes: Vec<MockRoute>) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || serve(&server, &routes, &requests))
        };

        Ok(Self {
            server,
            requests,
            handle: Some(handle),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(server: &Server, routes: &[MockRoute], requests: &Mutex<Vec<String>>) {
    while let Ok(request) = server.recv() {
        let url = request.url().to_owned();
        requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());

        let route = routes
            .iter()
            .find(|route| route.matches_exact(&url))
            .or_else(|| routes.iter().find(|route| route.matches_path(&url)));

        let (status, body, delay) = match route {
            Some(route) => (route.status, route.body.clone(), route.delay),
            None => (404, "not found".to_owned(), None),
        };

        let handle_one = move || {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            let mut response = Response::from_string(body).with_status_code(status);
            if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
                response = response.with_header(header);
            }
            let _ = request.respond(response);
        };

        if delay.is_some() {
            thread::spawn(handle_one);
        } else {
            handle_one();
        }
    }
}

pub fn products_body(products: &[&str]) -> Value {
    let entries = products
        .iter()
        .enumerate()
        .map(|(index, product)| (format!("p{index}"), Value::from(*product)))
        .collect::<serde_json::Map<String, Value>>();
    json!({ "data": entries })
}

pub fn versions_body(versions: &[&str]) -> Value {
    json!({ "data": versions })
}

pub fn prcount_body(records: &[StatusRecord]) -> Value {
    json!({ "data": records })
}

pub fn total_body(count: u64) -> Value {
    json!({ "data": { "count": count } })
}

pub fn record(doc_status: i64, count: u64) -> StatusRecord {
    StatusRecord::new(doc_status, count)
}

/// Backend with one product line, two versions, and the reference breakdown
/// `Not Started = 3`, `No Draft = 1`, total 7.
pub fn sample_routes() -> Vec<MockRoute> {
    vec![
        MockRoute::json("/products", products_body(&[SAMPLE_PRODUCT, "Identity Server"])),
        MockRoute::json("/versions", versions_body(&[SAMPLE_VERSION, "4.2.0"])),
        MockRoute::json(
            "/prcount",
            prcount_body(&[record(0, 3), record(2, 1)]),
        ),
        MockRoute::json("/totalprcount", total_body(SAMPLE_TOTAL)),
    ]
}

#[cfg(test)]
mod tests {
    use super::{MockRoute, products_body};

    #[test]
    fn exact_routes_only_match_full_url() {
        let route = MockRoute::raw("/versions?product=A", 200, "{}");
        assert!(route.matches_exact("/versions?product=A"));
        assert!(!route.matches_exact("/versions?product=B"));
        assert!(!route.matches_path("/versions?product=A"));
    }

    #[test]
    fn path_routes_ignore_query() {
        let route = MockRoute::raw("/versions", 200, "{}");
        assert!(route.matches_path("/versions?product=A"));
        assert!(route.matches_path("/versions"));
        assert!(!route.matches_path("/products"));
    }

    #[test]
    fn products_body_is_keyed_object_in_order() {
        let body = products_body(&["X", "Y"]);
        assert_eq!(body.to_string(), r#"{"data":{"p0":"X","p1":"Y"}}"#);
    }
}
