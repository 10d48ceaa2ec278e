use crate::filters::{self, TextQuery, Ticket, TicketFilter};
use crate::ipc::error::{ok, ParamError};
use crate::ipc::params::{optional_filter, optional_str, required_list};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn parse_ticket_filter(params: &serde_json::Value) -> Result<TicketFilter, ParamError> {
    Ok(TicketFilter {
        query: TextQuery::new(optional_str(params, "query")?.as_deref().unwrap_or("")),
        category: optional_filter(params, "category")?,
        priority: optional_filter(params, "priority")?,
        status: optional_filter(params, "status")?,
    })
}

fn tickets_filter(params: &serde_json::Value) -> Result<serde_json::Value, ParamError> {
    let tickets: Vec<Ticket> = required_list(params, "tickets")?;
    let filter = parse_ticket_filter(params)?;
    let items = filter.apply(&tickets);
    tracing::debug!(input = tickets.len(), kept = items.len(), "tickets filtered");
    Ok(json!({
        "counts": filters::ticket_counts(items.iter().copied()),
        "items": items,
    }))
}

fn handle_tickets_filter(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match tickets_filter(&req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tickets.filter" => Some(handle_tickets_filter(state, req)),
        _ => None,
    }
}
