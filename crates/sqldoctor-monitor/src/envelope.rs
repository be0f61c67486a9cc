//! Response envelope shared by every tool

use serde::{Deserialize, Serialize};
use sqldoctor_core::Result;

/// Outcome of a tool call
///
/// Serializes as `{ "success": bool, "error": string|null, ...payload }`.
/// On failure the payload is `T::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse<T> {
    pub success: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> ToolResponse<T> {
    pub fn success(payload: T) -> Self {
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Error message, if the call failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<T: Default> ToolResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            payload: T::default(),
        }
    }
}

impl<T: Default> From<Result<T>> for ToolResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests;
