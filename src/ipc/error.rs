use serde_json::json;
use thiserror::Error;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// A request whose params cannot be turned into typed inputs.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("missing {0}")]
    Missing(String),
    #[error("invalid {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ParamError {
    pub fn invalid(key: &str, message: impl Into<String>) -> Self {
        ParamError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ParamError::Missing(key) => key,
            ParamError::Invalid { key, .. } => key,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        tracing::warn!(id, key = self.key(), error = %self, "rejected request params");
        let details = json!({ "param": self.key() });
        err(id, "bad_params", self.to_string(), Some(details))
    }
}
