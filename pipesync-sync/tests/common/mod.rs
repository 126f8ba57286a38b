//! A stateful in-memory registry for orchestrator tests.
//!
//! Implements just enough of the pipeline config API to exercise ETag
//! handling: every successful write bumps the version, `PUT` requires an
//! `If-Match` equal to the current ETag.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use pipesync_client::{Method, Request, Response, Transport, TransportError};
use serde_json::{json, Value};

const PIPELINES: &str = "/go/api/admin/pipelines";

#[derive(Debug, Default)]
struct State {
    pipelines: BTreeMap<String, (Value, u64)>,
    calls: Vec<Request>,
    /// Simulate another writer: bump the version after every GET.
    interloper: bool,
}

#[derive(Debug, Default)]
pub struct FakeRegistry {
    state: Mutex<State>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(self, doc: Value, version: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let name = doc["name"].as_str().unwrap().to_string();
            state.pipelines.insert(name, (doc, version));
        }
        self
    }

    pub fn with_interloper(self) -> Self {
        self.state.lock().unwrap().interloper = true;
        self
    }

    pub fn stored(&self, name: &str) -> Option<Value> {
        self.state.lock().unwrap().pipelines.get(name).map(|(doc, _)| doc.clone())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.requests().into_iter().map(|r| r.method).collect()
    }
}

fn etag(version: u64) -> String {
    format!("\"v{version}\"")
}

fn reply(status: u16, body: &Value) -> Response {
    Response::new(status).with_body(body.to_string())
}

impl Transport for FakeRegistry {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        let name = request
            .path
            .strip_prefix(PIPELINES)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string);

        let response = match (request.method, name) {
            (Method::Get, Some(name)) => {
                let interloper = state.interloper;
                match state.pipelines.get_mut(&name) {
                    Some((doc, version)) => {
                        let response = reply(200, doc).with_header("ETag", etag(*version));
                        if interloper {
                            *version += 1;
                        }
                        response
                    }
                    None => reply(404, &json!({"message": "not found"})),
                }
            }
            (Method::Post, None) if request.path == PIPELINES => {
                let body: Value = serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                    .expect("create body");
                let doc = body["pipeline"].clone();
                let name = doc["name"].as_str().unwrap_or_default().to_string();
                if state.pipelines.contains_key(&name) {
                    reply(409, &json!({"message": format!("pipeline '{name}' already exists")}))
                } else {
                    state.pipelines.insert(name, (doc.clone(), 1));
                    reply(200, &doc).with_header("ETag", etag(1))
                }
            }
            (Method::Put, Some(name)) => {
                let if_match = request.header_value("If-Match").map(str::to_string);
                let body: Value = serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                    .expect("update body");
                match state.pipelines.get_mut(&name) {
                    Some((doc, version)) if if_match.as_deref() == Some(etag(*version).as_str()) => {
                        *doc = body.clone();
                        *version += 1;
                        reply(200, &body).with_header("ETag", etag(*version))
                    }
                    Some(_) => reply(
                        412,
                        &json!({"message": format!("Someone has modified the configuration for pipeline '{name}'")}),
                    ),
                    None => reply(404, &json!({"message": "not found"})),
                }
            }
            _ => Response::new(404),
        };
        Ok(response)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn pipeline_doc(mode: &str) -> Value {
    json!({
        "label_template": "${COUNT}",
        "enable_pipeline_locking": false,
        "name": "build",
        "environment_variables": [
            {"secure": false, "name": "MODE", "value": mode}
        ],
        "materials": [{"type": "git", "attributes": {"url": "https://example.invalid/r.git"}}],
        "stages": [{"name": "compile", "jobs": [{"name": "make", "tasks": []}]}]
    })
}
