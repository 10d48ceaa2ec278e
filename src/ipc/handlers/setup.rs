use crate::config::SetupPatch;
use crate::ipc::error::{err, ok, ParamError};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "setup": state.config }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let patch = if req.params.is_null() {
        SetupPatch::default()
    } else {
        match SetupPatch::deserialize(&req.params) {
            Ok(p) => p,
            Err(e) => return ParamError::invalid("params", e.to_string()).response(&req.id),
        }
    };
    match state.config.patched(&patch) {
        Ok(next) => {
            tracing::info!(
                utc_offset_minutes = next.utc_offset_minutes,
                default_window = %next.default_window,
                grid_start = %next.grid_start,
                grid_end = %next.grid_end,
                grid_step_minutes = next.grid_step_minutes,
                "setup updated"
            );
            state.config = next;
            ok(&req.id, json!({ "setup": state.config }))
        }
        Err(e) => {
            tracing::warn!(id = %req.id, error = %e, "setup update rejected");
            err(&req.id, "bad_params", e.to_string(), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
