use crate::attendance::{self, AttendanceRecord, DateWindow};
use crate::config::CampusConfig;
use crate::ipc::error::{ok, ParamError};
use crate::ipc::params::{optional_str, request_now, required_list};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn parse_window(params: &serde_json::Value, fallback: DateWindow) -> Result<DateWindow, ParamError> {
    match optional_str(params, "window")? {
        Some(raw) => raw
            .parse::<DateWindow>()
            .map_err(|e| ParamError::invalid("window", e)),
        None => Ok(fallback),
    }
}

fn attendance_window_range(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<serde_json::Value, ParamError> {
    let window = parse_window(params, config.default_window)?;
    let now = request_now(config, params)?;
    let range = attendance::window_range(window, &now);
    Ok(json!({
        "window": window,
        "start": range.map(|r| r.start),
        "end": range.map(|r| r.end),
    }))
}

fn attendance_summary(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<serde_json::Value, ParamError> {
    let records: Vec<AttendanceRecord> = required_list(params, "records")?;
    let window = parse_window(params, config.default_window)?;
    let now = request_now(config, params)?;
    let summary = attendance::summarize(&records, window, &now);
    tracing::debug!(
        records = records.len(),
        subjects = summary.subjects.len(),
        excluded = summary.excluded_count,
        %window,
        "attendance summarized"
    );
    Ok(json!(summary))
}

fn handle_attendance_window_range(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_window_range(&state.config, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_summary(&state.config, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.windowRange" => Some(handle_attendance_window_range(state, req)),
        "attendance.summary" => Some(handle_attendance_summary(state, req)),
        _ => None,
    }
}
