use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Source of the current instant. Derivations never read the wall clock
/// themselves; the caller samples a clock once and passes the instant down.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn local_now(clock: &dyn Clock, offset: FixedOffset) -> DateTime<FixedOffset> {
    clock.now().with_timezone(&offset)
}

/// Day of week in `0..=6`, 0 being Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub fn new(day: u8) -> Option<Self> {
        (day <= 6).then_some(DayOfWeek(day))
    }

    pub fn of(now: &DateTime<FixedOffset>) -> Self {
        DayOfWeek(now.weekday().num_days_from_sunday() as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn prev(self) -> Self {
        DayOfWeek((self.0 + 6) % 7)
    }

    pub fn next(self) -> Self {
        DayOfWeek((self.0 + 1) % 7)
    }

    /// Monday through Friday.
    pub fn is_weekday(self) -> bool {
        (1..=5).contains(&self.0)
    }

    pub fn plus_days(self, days: u8) -> Self {
        DayOfWeek(((self.0 as u16 + days as u16) % 7) as u8)
    }

    pub fn all() -> impl Iterator<Item = DayOfWeek> {
        (0..=6).map(DayOfWeek)
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DayOfWeek::new(value).ok_or_else(|| format!("day of week must be 0..=6, got {}", value))
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> u8 {
        day.0
    }
}

/// Wall-clock time of day at minute resolution, written as zero-padded
/// `HH:MM`. Ordering is chronological, which for the padded form is also the
/// lexicographic order of the strings.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime(u16);

impl SlotTime {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < 24 * 60).then_some(SlotTime(minutes))
    }

    pub fn of(now: &DateTime<FixedOffset>) -> Self {
        SlotTime((now.hour() * 60 + now.minute()) as u16)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (h, m) = raw.split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours = h.parse::<u16>().ok()?;
        let minutes = m.parse::<u16>().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(SlotTime(hours * 60 + minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for SlotTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotTime::parse(&value).ok_or_else(|| format!("time must be HH:MM, got {:?}", value))
    }
}

impl From<SlotTime> for String {
    fn from(t: SlotTime) -> String {
        t.to_string()
    }
}

/// Epoch millis of local midnight on `now`'s calendar day.
pub fn start_of_day_millis(now: &DateTime<FixedOffset>) -> i64 {
    let t = now.time();
    let since_midnight =
        t.num_seconds_from_midnight() as i64 * 1000 + (t.nanosecond() / 1_000_000).min(999) as i64;
    now.timestamp_millis() - since_midnight
}

/// Epoch millis of local midnight on the most recent Sunday (today if Sunday).
pub fn start_of_week_millis(now: &DateTime<FixedOffset>) -> i64 {
    start_of_day_millis(now) - DayOfWeek::of(now).index() as i64 * MILLIS_PER_DAY
}

/// Epoch millis of local midnight on the 1st of the current month.
pub fn start_of_month_millis(now: &DateTime<FixedOffset>) -> i64 {
    start_of_day_millis(now) - now.day0() as i64 * MILLIS_PER_DAY
}

pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("utc")
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("valid instant")
    }

    #[test]
    fn slot_time_parses_only_padded_hh_mm() {
        assert_eq!(SlotTime::parse("09:30").map(SlotTime::minutes), Some(570));
        assert_eq!(SlotTime::parse("00:00").map(SlotTime::minutes), Some(0));
        assert_eq!(SlotTime::parse("23:59").map(SlotTime::minutes), Some(1439));
        assert!(SlotTime::parse("9:30").is_none());
        assert!(SlotTime::parse("24:00").is_none());
        assert!(SlotTime::parse("12:60").is_none());
        assert!(SlotTime::parse("ab:cd").is_none());
        assert!(SlotTime::parse("+1:00").is_none());
    }

    #[test]
    fn slot_time_order_matches_string_order() {
        let raw = ["00:00", "08:05", "09:00", "09:59", "10:00", "13:30", "23:59"];
        for a in raw {
            for b in raw {
                let (ta, tb) = (SlotTime::parse(a).unwrap(), SlotTime::parse(b).unwrap());
                assert_eq!(ta.cmp(&tb), a.cmp(b), "{} vs {}", a, b);
                assert_eq!(ta.to_string(), a);
            }
        }
    }

    #[test]
    fn day_navigation_wraps_and_round_trips() {
        assert_eq!(DayOfWeek(0).prev(), DayOfWeek(6));
        assert_eq!(DayOfWeek(6).next(), DayOfWeek(0));
        for d in DayOfWeek::all() {
            assert_eq!(d.prev().next(), d);
            assert_eq!(d.next().prev(), d);
        }
        assert!(DayOfWeek::new(7).is_none());
    }

    #[test]
    fn window_starts_use_local_calendar() {
        // Thursday 2024-03-14 15:20
        let now = at(2024, 3, 14, 15, 20);
        assert_eq!(DayOfWeek::of(&now).index(), 4);
        assert_eq!(start_of_day_millis(&now), at(2024, 3, 14, 0, 0).timestamp_millis());
        assert_eq!(start_of_week_millis(&now), at(2024, 3, 10, 0, 0).timestamp_millis());
        assert_eq!(start_of_month_millis(&now), at(2024, 3, 1, 0, 0).timestamp_millis());
    }

    #[test]
    fn local_midnight_honours_offset() {
        // 2024-03-14 02:00 UTC is still 2024-03-13 in UTC-5.
        let utc = Utc.with_ymd_and_hms(2024, 3, 14, 2, 0, 0).single().expect("instant");
        let offset = offset_from_minutes(-300).expect("offset");
        let local = local_now(&FixedClock(utc), offset);
        assert_eq!(local.day(), 13);
        assert_eq!(DayOfWeek::of(&local).index(), 3);
        let expected = offset
            .with_ymd_and_hms(2024, 3, 13, 0, 0, 0)
            .single()
            .expect("midnight")
            .timestamp_millis();
        assert_eq!(start_of_day_millis(&local), expected);
    }
}
