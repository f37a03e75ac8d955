//! Command intake status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a command request, as reported to the remote-control UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    NotImplemented,
    ServiceUnavailable,
}

impl StatusCode {
    /// Numeric HTTP-style code.
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "BAD_REQUEST",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::NotImplemented => "NOT_IMPLEMENTED",
            StatusCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        };
        write!(f, "{} {s}", self.code())
    }
}
