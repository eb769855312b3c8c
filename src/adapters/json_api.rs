//! JSON request adapter.
//!
//! Turns a request body into a runtime call and renders the answer:
//!
//! ```text
//!   {"action": "start", "line": 2}   ──▶  refreshed status of line 2
//!   {"line": 0}                      ──▶  status of every line (array)
//!   {"action": "flood", "line": 1}   ──▶  {"error": "InvalidAction", "message": ...}
//! ```
//!
//! A missing `action`, or `"status"`, is a query.  A missing `line` means
//! line 0 (all lines).  The adapter never panics on malformed input.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::{Clock, EventSink, PinDriver};
use crate::app::service::StatusReport;
use crate::error::Error;
use crate::runtime::Runtime;

const QUERY_ACTION: &str = "status";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub line: i64,
}

impl ApiRequest {
    pub fn is_query(&self) -> bool {
        self.action.as_deref().is_none_or(|a| a == QUERY_ACTION)
    }
}

/// Structured rejection body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiRejection {
    pub error: &'static str,
    pub message: String,
}

impl ApiRejection {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "BadRequest",
            message: message.into(),
        }
    }
}

impl From<&Error> for ApiRejection {
    fn from(e: &Error) -> Self {
        Self {
            error: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Decode a request body without touching any state.
pub fn parse_request(body: &[u8]) -> Result<ApiRequest, ApiRejection> {
    serde_json::from_slice(body).map_err(|e| ApiRejection::bad_request(e.to_string()))
}

/// Handle one request against `runtime` and return the response body.
pub fn handle<D, C, S>(runtime: &Runtime<D, C, S>, body: &[u8]) -> String
where
    D: PinDriver,
    C: Clock,
    S: EventSink,
{
    let outcome = parse_request(body).and_then(|req| {
        debug!("API request: {:?}", req);
        let result = match req.action.as_deref() {
            Some(action) if !req.is_query() => runtime.dispatch(action, req.line),
            _ => runtime.status(req.line),
        };
        result.map_err(|e| ApiRejection::from(&e))
    });
    render(&outcome)
}

/// Serialise a status report or a rejection.
pub fn render(outcome: &Result<StatusReport, ApiRejection>) -> String {
    let encoded = match outcome {
        Ok(report) => serde_json::to_string(report),
        Err(rejection) => serde_json::to_string(rejection),
    };
    encoded.unwrap_or_else(|e| {
        format!(r#"{{"error":"BadRequest","message":"unencodable response: {e}"}}"#)
    })
}
