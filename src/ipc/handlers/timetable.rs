use crate::clock::{DayOfWeek, SlotTime};
use crate::config::CampusConfig;
use crate::ipc::error::{ok, ParamError};
use crate::ipc::params::{optional, request_now, required, required_list};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{self, Direction, TimetableEntry};
use serde_json::json;

fn entries(params: &serde_json::Value) -> Result<Vec<TimetableEntry>, ParamError> {
    required_list(params, "entries")
}

fn ids(entries: &[&TimetableEntry]) -> Vec<String> {
    entries.iter().map(|e| e.id.clone()).collect()
}

fn timetable_occupancy(params: &serde_json::Value) -> Result<serde_json::Value, ParamError> {
    let entries = entries(params)?;
    let day: DayOfWeek = required(params, "day")?;
    let time: SlotTime = required(params, "time")?;
    Ok(json!({
        "day": day,
        "time": time,
        "entries": timetable::entries_at(&entries, day, time),
    }))
}

fn timetable_now(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<serde_json::Value, ParamError> {
    let entries = entries(params)?;
    let now = request_now(config, params)?;
    Ok(json!({
        "day": DayOfWeek::of(&now),
        "time": SlotTime::of(&now),
        "current": timetable::current_classes(&entries, &now),
        "next": timetable::next_class(&entries, &now),
    }))
}

fn timetable_week(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<serde_json::Value, ParamError> {
    let entries = entries(params)?;
    let now = request_now(config, params)?;
    let today = DayOfWeek::of(&now);
    Ok(json!({
        "today": today,
        "stats": timetable::week_stats(&entries, today),
        "grid": config.grid(),
        "days": timetable::week_grid(&entries, &config.grid()),
        "colors": timetable::course_colors(&entries),
    }))
}

fn timetable_day(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<serde_json::Value, ParamError> {
    let entries = entries(params)?;
    let now = request_now(config, params)?;
    let day: DayOfWeek = optional(params, "day")?.unwrap_or_else(|| DayOfWeek::of(&now));
    let schedule = timetable::day_schedule(&entries, day);
    let current: Vec<&TimetableEntry> = schedule
        .iter()
        .copied()
        .filter(|e| e.is_current(&now))
        .collect();
    Ok(json!({
        "day": day,
        "prevDay": day.prev(),
        "nextDay": day.next(),
        "entries": schedule,
        "currentIds": ids(&current),
    }))
}

fn timetable_navigate(params: &serde_json::Value) -> Result<serde_json::Value, ParamError> {
    let day: DayOfWeek = required(params, "day")?;
    let direction: Direction = required(params, "direction")?;
    Ok(json!({ "day": timetable::step_day(day, direction) }))
}

fn timetable_conflicts(params: &serde_json::Value) -> Result<serde_json::Value, ParamError> {
    let entries = entries(params)?;
    let candidate: Option<TimetableEntry> = optional(params, "candidate")?;
    let conflicts = match candidate.as_ref() {
        Some(c) => timetable::conflicts_with(c, &entries),
        None => timetable::find_conflicts(&entries),
    };
    if !conflicts.is_empty() {
        tracing::debug!(count = conflicts.len(), "timetable conflicts found");
    }
    Ok(json!({ "conflicts": conflicts }))
}

fn respond(req: &Request, result: Result<serde_json::Value, ParamError>) -> serde_json::Value {
    match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let params = &req.params;
    let result = match req.method.as_str() {
        "timetable.occupancy" => timetable_occupancy(params),
        "timetable.now" => timetable_now(&state.config, params),
        "timetable.week" => timetable_week(&state.config, params),
        "timetable.day" => timetable_day(&state.config, params),
        "timetable.navigate" => timetable_navigate(params),
        "timetable.conflicts" => timetable_conflicts(params),
        _ => return None,
    };
    Some(respond(req, result))
}
