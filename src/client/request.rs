use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Everything needed to (re)send one API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/api/todo/list`.
    pub path: String,
    pub body: Option<Value>,
    /// Set once the request has been through a refresh; a retried request is
    /// never refreshed again.
    pub retried: bool,
    /// Whether a 401 should trigger the refresh flow. Off for login and
    /// registration, where a 401 means bad credentials.
    pub reauthenticate: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            body: None,
            retried: false,
            reauthenticate: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Decode(format!("Error encoding request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Opt out of the refresh-and-retry flow.
    pub fn public(mut self) -> Self {
        self.reauthenticate = false;
        self
    }
}
