//! Scripted transport for unit tests.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;

use crate::api::transport::{HttpResponse, Transport};
use crate::error::{GridError, GridResult};

/// One recorded POST.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: Value,
    pub authorization: Option<String>,
}

type Scripted = GridResult<HttpResponse>;

/// Answers POSTs from per-path queues, falling back to a per-path default
/// once a queue runs dry. Unscripted paths fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: Mutex<HashMap<String, HttpResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for URLs ending in `path`.
    pub fn push(&self, path: &str, response: HttpResponse) -> &Self {
        self.queues
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(response));
        self
    }

    /// Queue a one-shot transport failure for URLs ending in `path`.
    pub fn push_error(&self, path: &str, message: &str) -> &Self {
        self.queues
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(GridError::Transport(message.to_string())));
        self
    }

    /// Response used for `path` whenever its queue is empty.
    pub fn always(&self, path: &str, response: HttpResponse) -> &Self {
        self.defaults.lock().insert(path.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| route_of(&c.url).map_or(false, |r| r == path))
            .cloned()
            .collect()
    }

    fn route(&self, url: &str) -> Option<String> {
        let queues = self.queues.lock();
        let defaults = self.defaults.lock();
        queues
            .keys()
            .chain(defaults.keys())
            .find(|p| route_of(url).map_or(false, |r| r == p.as_str()))
            .cloned()
    }
}

fn route_of(url: &str) -> Option<&str> {
    let without_query = url.split('?').next()?;
    let start = without_query.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = without_query[start..].find('/').map(|i| start + i)?;
    Some(&without_query[path_start..])
}

impl Transport for ScriptedTransport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> GridResult<HttpResponse> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            body: body.clone(),
            authorization: authorization.map(|a| a.to_string()),
        });

        let Some(path) = self.route(url) else {
            return Err(GridError::Transport(format!("unscripted url {}", url)));
        };

        if let Some(next) = self.queues.lock().get_mut(&path).and_then(|q| q.pop_front()) {
            return next;
        }
        match self.defaults.lock().get(&path) {
            Some(response) => Ok(response.clone()),
            None => Err(GridError::Transport(format!("script exhausted for {}", path))),
        }
    }
}
