use crate::clock::{DayOfWeek, SlotTime};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Course colors, picked by [`color_for_course`].
pub const PALETTE: [&str; 8] = [
    "blue", "emerald", "violet", "amber", "rose", "cyan", "indigo", "orange",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: String,
    pub course_ref: String,
    pub classroom_ref: String,
    pub faculty_ref: String,
    pub day_of_week: DayOfWeek,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
}

impl TimetableEntry {
    /// Half-open: the end minute itself is free.
    pub fn occupies(&self, day: DayOfWeek, time: SlotTime) -> bool {
        self.day_of_week == day && self.start_time <= time && time < self.end_time
    }

    pub fn is_current(&self, now: &DateTime<FixedOffset>) -> bool {
        let now_minutes = SlotTime::of(now).minutes();
        self.day_of_week == DayOfWeek::of(now)
            && self.start_time.minutes() <= now_minutes
            && now_minutes < self.end_time.minutes()
    }

    fn overlaps(&self, other: &TimetableEntry) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

pub fn entries_at(
    entries: &[TimetableEntry],
    day: DayOfWeek,
    time: SlotTime,
) -> Vec<&TimetableEntry> {
    entries.iter().filter(|e| e.occupies(day, time)).collect()
}

pub fn current_classes<'a>(
    entries: &'a [TimetableEntry],
    now: &DateTime<FixedOffset>,
) -> Vec<&'a TimetableEntry> {
    entries.iter().filter(|e| e.is_current(now)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingClass<'a> {
    pub entry: &'a TimetableEntry,
    /// 0 for later today, 7 for today's weekday next week.
    pub day_offset: u8,
    pub starts_in_minutes: i64,
}

/// Earliest class starting strictly after `now`, looking forward through the
/// week and wrapping around to the same weekday next week.
pub fn next_class<'a>(
    entries: &'a [TimetableEntry],
    now: &DateTime<FixedOffset>,
) -> Option<UpcomingClass<'a>> {
    let today = DayOfWeek::of(now);
    let now_minutes = SlotTime::of(now).minutes();
    for offset in 0..=7u8 {
        let day = today.plus_days(offset);
        let best = entries
            .iter()
            .filter(|e| e.day_of_week == day)
            .filter(|e| offset != 0 || e.start_time.minutes() > now_minutes)
            .filter(|e| offset != 7 || e.start_time.minutes() <= now_minutes)
            .min_by_key(|e| e.start_time);
        if let Some(entry) = best {
            let starts_in_minutes = offset as i64 * MINUTES_PER_DAY
                + entry.start_time.minutes() as i64
                - now_minutes as i64;
            return Some(UpcomingClass {
                entry,
                day_offset: offset,
                starts_in_minutes,
            });
        }
    }
    None
}

/// Stable color for a course: sum of UTF-16 code units modulo the palette.
pub fn color_for_course(course_ref: &str) -> &'static str {
    let sum: u64 = course_ref.encode_utf16().map(u64::from).sum();
    PALETTE[(sum % PALETTE.len() as u64) as usize]
}

pub fn course_colors(entries: &[TimetableEntry]) -> BTreeMap<String, &'static str> {
    entries
        .iter()
        .map(|e| (e.course_ref.clone(), color_for_course(&e.course_ref)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

pub fn step_day(day: DayOfWeek, direction: Direction) -> DayOfWeek {
    match direction {
        Direction::Prev => day.prev(),
        Direction::Next => day.next(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStats {
    pub total: usize,
    pub today: usize,
    pub distinct_courses: usize,
    pub weekday_classes: usize,
}

pub fn week_stats(entries: &[TimetableEntry], today: DayOfWeek) -> WeekStats {
    let courses: HashSet<&str> = entries.iter().map(|e| e.course_ref.as_str()).collect();
    WeekStats {
        total: entries.len(),
        today: entries.iter().filter(|e| e.day_of_week == today).count(),
        distinct_courses: courses.len(),
        weekday_classes: entries.iter().filter(|e| e.day_of_week.is_weekday()).count(),
    }
}

/// Rows of the week grid: `start` inclusive to `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub start: SlotTime,
    pub end: SlotTime,
    pub step_minutes: u16,
}

impl GridSpec {
    pub fn slot_times(&self) -> Vec<SlotTime> {
        let step = self.step_minutes.max(1);
        (self.start.minutes()..self.end.minutes())
            .step_by(step as usize)
            .filter_map(SlotTime::from_minutes)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub time: SlotTime,
    pub entry_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayColumn {
    pub day: DayOfWeek,
    pub cells: Vec<GridCell>,
}

pub fn week_grid(entries: &[TimetableEntry], grid: &GridSpec) -> Vec<DayColumn> {
    let times = grid.slot_times();
    DayOfWeek::all()
        .map(|day| DayColumn {
            day,
            cells: times
                .iter()
                .map(|&time| GridCell {
                    time,
                    entry_ids: entries_at(entries, day, time)
                        .into_iter()
                        .map(|e| e.id.clone())
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// One day's entries ordered by start time; ties keep input order.
pub fn day_schedule(entries: &[TimetableEntry], day: DayOfWeek) -> Vec<&TimetableEntry> {
    let mut out: Vec<&TimetableEntry> = entries.iter().filter(|e| e.day_of_week == day).collect();
    out.sort_by_key(|e| e.start_time);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictReason {
    Classroom,
    Faculty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub first_id: String,
    pub second_id: String,
    pub reason: ConflictReason,
}

fn conflict_between(a: &TimetableEntry, b: &TimetableEntry) -> Option<Conflict> {
    if !a.overlaps(b) {
        return None;
    }
    let reason = if a.classroom_ref == b.classroom_ref {
        ConflictReason::Classroom
    } else if a.faculty_ref == b.faculty_ref {
        ConflictReason::Faculty
    } else {
        return None;
    };
    Some(Conflict {
        first_id: a.id.clone(),
        second_id: b.id.clone(),
        reason,
    })
}

/// Every pair of overlapping entries sharing a room or a faculty member, in input
/// order of the first member then the second.
pub fn find_conflicts(entries: &[TimetableEntry]) -> Vec<Conflict> {
    let mut out = Vec::new();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if let Some(c) = conflict_between(a, b) {
                out.push(c);
            }
        }
    }
    out
}

/// Conflicts a proposed entry would introduce against an existing schedule.
pub fn conflicts_with(candidate: &TimetableEntry, entries: &[TimetableEntry]) -> Vec<Conflict> {
    entries
        .iter()
        .filter(|e| e.id != candidate.id)
        .filter_map(|e| conflict_between(candidate, e))
        .collect()
}
