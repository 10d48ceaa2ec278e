use crate::clock::{self, MILLIS_PER_DAY};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Below this overall percentage a student is flagged for low attendance.
pub const LOW_ATTENDANCE_THRESHOLD: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    /// Generic `subjectKey`/`subjectLabel` payloads resolve as course subjects.
    #[serde(default, alias = "subjectKey")]
    pub course_id: Option<String>,
    #[serde(default, alias = "subjectLabel")]
    pub course_name: Option<String>,
    #[serde(default)]
    pub custom_subject_id: Option<String>,
    #[serde(default)]
    pub custom_subject_name: Option<String>,
    /// Epoch millis.
    pub timestamp: i64,
    pub status: AttendanceStatus,
}

/// Grouping identity of a record. Courses and custom subjects are separate
/// key spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum SubjectKey {
    Course(String),
    Custom(String),
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl AttendanceRecord {
    /// Resolves the subject a record belongs to. A course reference takes
    /// precedence over a custom subject; a record with neither has no subject.
    pub fn subject(&self) -> Option<(SubjectKey, String)> {
        if let Some(id) = non_blank(&self.course_id) {
            let label = non_blank(&self.course_name).unwrap_or(id);
            return Some((SubjectKey::Course(id.to_string()), label.to_string()));
        }
        if let Some(id) = non_blank(&self.custom_subject_id) {
            let label = non_blank(&self.custom_subject_name).unwrap_or(id);
            return Some((SubjectKey::Custom(id.to_string()), label.to_string()));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateWindow {
    Today,
    Week,
    Month,
    All,
}

impl DateWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            DateWindow::Today => "today",
            DateWindow::Week => "week",
            DateWindow::Month => "month",
            DateWindow::All => "all",
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateWindow::Today),
            "week" => Ok(DateWindow::Week),
            "month" => Ok(DateWindow::Month),
            "all" => Ok(DateWindow::All),
            other => Err(format!("unknown window: {}", other)),
        }
    }
}

/// Closed interval of epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Bounds of a named window relative to `now`; `None` for `All`.
pub fn window_range(window: DateWindow, now: &DateTime<FixedOffset>) -> Option<TimeRange> {
    match window {
        DateWindow::Today => {
            let start = clock::start_of_day_millis(now);
            Some(TimeRange {
                start,
                end: start + MILLIS_PER_DAY,
            })
        }
        DateWindow::Week => Some(TimeRange {
            start: clock::start_of_week_millis(now),
            end: now.timestamp_millis(),
        }),
        DateWindow::Month => Some(TimeRange {
            start: clock::start_of_month_millis(now),
            end: now.timestamp_millis(),
        }),
        DateWindow::All => None,
    }
}

pub fn filter_by_window<'a>(
    records: &'a [AttendanceRecord],
    window: DateWindow,
    now: &DateTime<FixedOffset>,
) -> Vec<&'a AttendanceRecord> {
    let range = window_range(window, now);
    records
        .iter()
        .filter(|r| range.map(|rg| rg.contains(r.timestamp)).unwrap_or(true))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_percentage: u8,
}

impl AttendanceStats {
    pub fn is_low(&self) -> bool {
        self.total > 0 && self.attendance_percentage < LOW_ATTENDANCE_THRESHOLD
    }
}

pub fn tally<'a, I>(records: I) -> AttendanceStats
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut stats = AttendanceStats::default();
    for r in records {
        stats.total += 1;
        match r.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Late => stats.late += 1,
        }
    }
    stats.attendance_percentage = percentage(stats.present, stats.total);
    stats
}

/// `round(100 * part / total)`, 0 for an empty total.
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * part.min(total) as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGroup {
    pub key: SubjectKey,
    pub label: String,
    pub stats: AttendanceStats,
    pub records: Vec<AttendanceRecord>,
}

/// Groups records by subject in order of first appearance. Records keep their
/// input order within a group; records without a subject are dropped.
pub fn group_by_subject<'a, I>(records: I) -> Vec<SubjectGroup>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut groups: Vec<SubjectGroup> = Vec::new();
    let mut index: HashMap<SubjectKey, usize> = HashMap::new();
    for r in records {
        let Some((key, label)) = r.subject() else {
            continue;
        };
        let slot = match index.get(&key) {
            Some(i) => *i,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(SubjectGroup {
                    key,
                    label,
                    stats: AttendanceStats::default(),
                    records: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].records.push(r.clone());
    }
    for g in groups.iter_mut() {
        g.stats = tally(&g.records);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub window: DateWindow,
    pub range: Option<TimeRange>,
    pub subjects: Vec<SubjectGroup>,
    pub overall: AttendanceStats,
    pub low_attendance: bool,
    pub excluded_count: usize,
}

pub fn summarize(
    records: &[AttendanceRecord],
    window: DateWindow,
    now: &DateTime<FixedOffset>,
) -> AttendanceSummary {
    let in_window = filter_by_window(records, window, now);
    let excluded_count = in_window.iter().filter(|r| r.subject().is_none()).count();
    let subjects = group_by_subject(in_window.iter().copied());
    let overall = tally(subjects.iter().flat_map(|g| g.records.iter()));
    AttendanceSummary {
        window,
        range: window_range(window, now),
        subjects,
        low_attendance: overall.is_low(),
        overall,
        excluded_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("utc")
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("instant")
    }

    fn rec(id: &str, course: Option<&str>, ts: i64, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            course_id: course.map(|c| c.to_string()),
            course_name: course.map(|c| format!("{} name", c)),
            custom_subject_id: None,
            custom_subject_name: None,
            timestamp: ts,
            status,
        }
    }

    #[test]
    fn two_of_three_present_rounds_to_67() {
        let records = vec![
            rec("a", Some("CS101"), 1, AttendanceStatus::Present),
            rec("b", Some("CS101"), 2, AttendanceStatus::Present),
            rec("c", Some("CS101"), 3, AttendanceStatus::Absent),
        ];
        let groups = group_by_subject(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].stats,
            AttendanceStats {
                total: 3,
                present: 2,
                absent: 1,
                late: 0,
                attendance_percentage: 67,
            }
        );
        assert_eq!(groups[0].label, "CS101 name");
    }

    #[test]
    fn empty_input_is_zero_and_not_flagged() {
        let now = utc(2024, 3, 14, 12, 0);
        let summary = summarize(&[], DateWindow::All, &now);
        assert_eq!(summary.overall, AttendanceStats::default());
        assert!(summary.subjects.is_empty());
        assert!(!summary.low_attendance);
    }

    #[test]
    fn late_does_not_count_as_present() {
        let records = vec![
            rec("a", Some("M"), 1, AttendanceStatus::Late),
            rec("b", Some("M"), 2, AttendanceStatus::Present),
        ];
        let stats = tally(&records);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.attendance_percentage, 50);
        assert!(stats.is_low());
    }

    #[test]
    fn records_without_subject_are_excluded_and_counted() {
        let now = utc(2024, 3, 14, 12, 0);
        let mut orphan = rec("x", None, 5, AttendanceStatus::Present);
        orphan.course_id = Some("   ".to_string());
        let records = vec![orphan, rec("a", Some("M"), 6, AttendanceStatus::Present)];
        let summary = summarize(&records, DateWindow::All, &now);
        assert_eq!(summary.excluded_count, 1);
        assert_eq!(summary.overall.total, 1);
        assert_eq!(summary.overall.attendance_percentage, 100);
    }

    #[test]
    fn generic_subject_fields_are_grouped_not_dropped() {
        let now = utc(2024, 3, 14, 12, 0);
        let records: Vec<AttendanceRecord> = serde_json::from_value(serde_json::json!([
            { "id": "a", "subjectKey": "PHY1", "subjectLabel": "Physics",
              "timestamp": 1, "status": "present" },
            { "id": "b", "subjectKey": "PHY1", "timestamp": 2, "status": "absent" },
        ]))
        .expect("records");
        let summary = summarize(&records, DateWindow::All, &now);
        assert_eq!(summary.excluded_count, 0);
        assert_eq!(summary.subjects.len(), 1);
        assert_eq!(summary.subjects[0].key, SubjectKey::Course("PHY1".to_string()));
        assert_eq!(summary.subjects[0].label, "Physics");
        assert_eq!(summary.subjects[0].stats.total, 2);
    }

    #[test]
    fn course_reference_wins_over_custom_subject() {
        let mut both = rec("a", Some("CS101"), 1, AttendanceStatus::Present);
        both.custom_subject_id = Some("club".to_string());
        both.custom_subject_name = Some("Chess club".to_string());
        let mut custom_only = rec("b", None, 2, AttendanceStatus::Absent);
        custom_only.custom_subject_id = Some("club".to_string());

        assert_eq!(both.subject().map(|s| s.0), Some(SubjectKey::Course("CS101".into())));
        assert_eq!(
            custom_only.subject(),
            Some((SubjectKey::Custom("club".into()), "club".to_string()))
        );

        let groups = group_by_subject(&[both, custom_only]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, SubjectKey::Course("CS101".into()));
        assert_eq!(groups[1].key, SubjectKey::Custom("club".into()));
    }

    #[test]
    fn course_and_custom_with_same_id_stay_apart() {
        let a = rec("a", Some("art"), 1, AttendanceStatus::Present);
        let mut b = rec("b", None, 2, AttendanceStatus::Present);
        b.custom_subject_id = Some("art".to_string());
        assert_eq!(group_by_subject(&[a, b]).len(), 2);
    }

    #[test]
    fn groups_follow_first_appearance_and_keep_record_order() {
        let records = vec![
            rec("1", Some("B"), 30, AttendanceStatus::Present),
            rec("2", Some("A"), 10, AttendanceStatus::Present),
            rec("3", Some("B"), 20, AttendanceStatus::Absent),
        ];
        let groups = group_by_subject(&records);
        let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(keys, vec![SubjectKey::Course("B".into()), SubjectKey::Course("A".into())]);
        let ids: Vec<_> = groups[0].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn today_window_is_a_full_local_day() {
        let now = utc(2024, 3, 14, 15, 0);
        let range = window_range(DateWindow::Today, &now).expect("range");
        assert_eq!(range.start, utc(2024, 3, 14, 0, 0).timestamp_millis());
        assert_eq!(range.end, range.start + MILLIS_PER_DAY);
        // Later today still counts even though it is after now.
        assert!(range.contains(utc(2024, 3, 14, 23, 0).timestamp_millis()));
        assert!(!range.contains(utc(2024, 3, 13, 23, 59).timestamp_millis()));
    }

    #[test]
    fn week_and_month_windows_end_at_now() {
        let now = utc(2024, 3, 14, 15, 0);
        let week = window_range(DateWindow::Week, &now).expect("week");
        assert_eq!(week.start, utc(2024, 3, 10, 0, 0).timestamp_millis());
        assert_eq!(week.end, now.timestamp_millis());
        let month = window_range(DateWindow::Month, &now).expect("month");
        assert_eq!(month.start, utc(2024, 3, 1, 0, 0).timestamp_millis());
        assert!(window_range(DateWindow::All, &now).is_none());
    }

    #[test]
    fn window_filter_counts_match_group_totals() {
        let now = utc(2024, 3, 14, 15, 0);
        let records = vec![
            rec("old", Some("M"), utc(2024, 2, 28, 9, 0).timestamp_millis(), AttendanceStatus::Present),
            rec("sun", Some("M"), utc(2024, 3, 10, 0, 0).timestamp_millis(), AttendanceStatus::Absent),
            rec("wed", Some("P"), utc(2024, 3, 13, 9, 0).timestamp_millis(), AttendanceStatus::Late),
            rec("nokey", None, utc(2024, 3, 13, 10, 0).timestamp_millis(), AttendanceStatus::Present),
            rec("future", Some("M"), utc(2024, 3, 15, 9, 0).timestamp_millis(), AttendanceStatus::Present),
        ];
        for window in [DateWindow::Today, DateWindow::Week, DateWindow::Month, DateWindow::All] {
            let kept = filter_by_window(&records, window, &now);
            let keyed = kept.iter().filter(|r| r.subject().is_some()).count();
            let summary = summarize(&records, window, &now);
            let grouped: usize = summary
                .subjects
                .iter()
                .map(|g| g.stats.present + g.stats.absent + g.stats.late)
                .sum();
            assert_eq!(grouped, keyed, "window {}", window);
            assert!(summary.overall.attendance_percentage <= 100);
        }
        let week = summarize(&records, DateWindow::Week, &now);
        assert_eq!(week.overall.total, 2);
        assert_eq!(week.excluded_count, 1);
    }

    #[test]
    fn window_names_parse_case_insensitively() {
        assert_eq!("Week".parse::<DateWindow>(), Ok(DateWindow::Week));
        assert!("year".parse::<DateWindow>().is_err());
    }
}
