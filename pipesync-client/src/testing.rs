//! In-memory [`Transport`] for tests.
//!
//! Replies are routed by method and path. A route with several queued
//! replies hands them out in order and then keeps repeating the last one.
//! Unrouted requests get an empty 404. Every request is recorded.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::TransportError;
use crate::transport::{Method, Request, Response, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Timeout,
    Refused,
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

/// A response carrying `value` as its JSON body.
pub fn json_response(status: u16, value: &serde_json::Value) -> Response {
    Response::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(value.to_string())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for `method path`.
    pub fn on(self, method: Method, path: &str, response: Response) -> Self {
        self.push(method, path, Reply::Respond(response))
    }

    /// Queue a timeout for `method path`.
    pub fn on_timeout(self, method: Method, path: &str) -> Self {
        self.push(method, path, Reply::Timeout)
    }

    /// Queue a refused connection for `method path`.
    pub fn on_refused(self, method: Method, path: &str) -> Self {
        self.push(method, path, Reply::Refused)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(method, path)` of every request received so far, in order.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect()
    }

    fn push(self, method: Method, path: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.path == path)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path: path.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let route = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let method = request.method;
        let path = request.path.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        match self.next_reply(method, &path) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Timeout) => Err(TransportError::Timeout {
                method,
                url: path,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "mock timeout",
                )),
            }),
            Some(Reply::Refused) => Err(TransportError::Connection {
                method,
                url: path,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "mock connection refused",
                )),
            }),
            None => Ok(Response::new(404)),
        }
    }
}
