//! Client-side narrowing of ticket and resource snapshots.
//!
//! Every filter keeps the input order: the backend already sorted the snapshot
//! (usually newest first) and the output must be a subsequence of it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Technical,
    Academic,
    Facility,
    Hostel,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Document,
    Video,
    Link,
    Image,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub download_count: u64,
    pub created_at: i64,
    pub uploaded_by: String,
}

/// Lowercased, trimmed search text. A blank query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery(Option<String>);

impl TextQuery {
    pub fn new(raw: &str) -> Self {
        let t = raw.trim();
        if t.is_empty() {
            TextQuery(None)
        } else {
            TextQuery(Some(t.to_lowercase()))
        }
    }

    pub fn matches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(needle) = self.0.as_deref() else {
            return true;
        };
        fields
            .into_iter()
            .any(|f| f.to_lowercase().contains(needle))
    }
}

fn constraint_holds<T: PartialEq>(constraint: Option<T>, value: T) -> bool {
    constraint.map(|c| c == value).unwrap_or(true)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub query: TextQuery,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
}

impl TicketFilter {
    pub fn matches(&self, t: &Ticket) -> bool {
        constraint_holds(self.category, t.category)
            && constraint_holds(self.priority, t.priority)
            && constraint_holds(self.status, t.status)
            && self
                .query
                .matches_any([t.title.as_str(), t.description.as_str()])
    }

    pub fn apply<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        tickets.iter().filter(|t| self.matches(t)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
}

pub fn ticket_counts<'a, I>(tickets: I) -> TicketCounts
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut counts = TicketCounts::default();
    for t in tickets {
        counts.total += 1;
        match t.status {
            TicketStatus::Open => counts.open += 1,
            TicketStatus::InProgress => counts.in_progress += 1,
            TicketStatus::Resolved => counts.resolved += 1,
            TicketStatus::Closed => counts.closed += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceFilter {
    pub query: TextQuery,
    pub kind: Option<ResourceType>,
    /// Compared case-insensitively against every tag.
    pub tag: Option<String>,
}

impl ResourceFilter {
    pub fn matches(&self, r: &Resource) -> bool {
        if !constraint_holds(self.kind, r.kind) {
            return false;
        }
        if let Some(tag) = self.tag.as_deref() {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !r.tags.iter().any(|t| t.trim().to_lowercase() == tag) {
                return false;
            }
        }
        let fields = std::iter::once(r.title.as_str())
            .chain(r.description.as_deref())
            .chain(r.tags.iter().map(String::as_str));
        self.query.matches_any(fields)
    }

    pub fn apply<'a>(&self, resources: &'a [Resource]) -> Vec<&'a Resource> {
        resources.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct tags in first-seen order.
pub fn distinct_tags<'a, I>(resources: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Resource>,
{
    let mut out: Vec<String> = Vec::new();
    for r in resources {
        for tag in &r.tags {
            if !out.iter().any(|t| t == tag) {
                out.push(tag.clone());
            }
        }
    }
    out
}
