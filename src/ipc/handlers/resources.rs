use crate::filters::{self, Resource, ResourceFilter, TextQuery};
use crate::ipc::error::{ok, ParamError};
use crate::ipc::params::{optional_filter, optional_str, required_list};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn parse_resource_filter(params: &serde_json::Value) -> Result<ResourceFilter, ParamError> {
    Ok(ResourceFilter {
        query: TextQuery::new(optional_str(params, "query")?.as_deref().unwrap_or("")),
        kind: optional_filter(params, "type")?,
        // "all" is a literal tag here, not a wildcard.
        tag: optional_str(params, "tag")?.filter(|t| !t.trim().is_empty()),
    })
}

fn resources_filter(params: &serde_json::Value) -> Result<serde_json::Value, ParamError> {
    let resources: Vec<Resource> = required_list(params, "resources")?;
    let filter = parse_resource_filter(params)?;
    let items = filter.apply(&resources);
    let total_downloads: u64 = items.iter().map(|r| r.download_count).sum();
    tracing::debug!(input = resources.len(), kept = items.len(), "resources filtered");
    Ok(json!({
        "tags": filters::distinct_tags(items.iter().copied()),
        "totalDownloads": total_downloads,
        "items": items,
    }))
}

fn handle_resources_filter(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match resources_filter(&req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "resources.filter" => Some(handle_resources_filter(state, req)),
        _ => None,
    }
}
