//! Weekly opening hours and the open/closed scheduler.
//!
//! Hours are wall-clock local times. A day whose closing time is at or before
//! its opening time wraps past midnight (e.g. `21:50`-`00:00`, `22:00`-`02:00`).
//!
//! [`store_status`] is a pure function of the weekly table and "now"; callers
//! recompute it whenever they need a fresh answer (per request, per UI tick).
//! No timezone conversion happens here: the caller's local clock is
//! authoritative, which assumes the server and its customers share one zone.

use core::fmt;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize, Serializer};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// The seven weekdays, Sunday first.
const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Configuration and scheduling errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A time string is not a valid 24-hour `HH:MM` value.
    #[error("invalid time of day {0:?} (expected HH:MM)")]
    InvalidTime(String),
    /// A day key is not a weekday name.
    #[error("unknown weekday {0:?}")]
    UnknownDay(String),
    /// A weekday has no entry in the weekly table.
    #[error("no hours configured for {0}")]
    MissingDay(&'static str),
    /// A weekday has more than one entry.
    #[error("hours configured twice for {0}")]
    DuplicateDay(&'static str),
    /// A day entry is neither hours nor `closed`.
    #[error("invalid hours for a day: {0}")]
    InvalidDaySchedule(String),
    /// Every day is closed, so there is never a next opening.
    #[error("store is closed every day of the week")]
    NeverOpen,
    /// The bounded one-week scan found no upcoming opening.
    #[error("no opening found within the next 7 days")]
    NoUpcomingOpening,
}

/// Lowercase English weekday name (`"monday"`).
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

fn parse_weekday(name: &str) -> Result<Weekday, ScheduleError> {
    let lower = name.trim().to_ascii_lowercase();
    WEEK.into_iter()
        .find(|day| weekday_name(*day) == lower)
        .ok_or_else(|| ScheduleError::UnknownDay(name.to_string()))
}

// =============================================================================
// TimeOfDay
// =============================================================================

/// A wall-clock time of day with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct TimeOfDay {
    minutes: u32,
}

impl TimeOfDay {
    /// Midnight, `00:00`.
    pub const MIDNIGHT: Self = Self { minutes: 0 };

    /// Build from hours and minutes, `None` if out of range.
    #[must_use]
    pub const fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self {
                minutes: hour * 60 + minute,
            })
        } else {
            None
        }
    }

    /// Parse a 24-hour `HH:MM` string (`"7:30"` is accepted too).
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::InvalidTime` for anything else.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minutes_since_midnight(&self) -> u32 {
        self.minutes
    }

    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.minutes / 60
    }

    #[must_use]
    pub const fn minute(&self) -> u32 {
        self.minutes % 60
    }

    /// Format as a 12-hour clock time (`"7:30 AM"`, `"12:00 PM"`).
    #[must_use]
    pub fn to_12_hour(&self) -> String {
        let period = if self.hour() >= 12 { "PM" } else { "AM" };
        let hour = match self.hour() % 12 {
            0 => 12,
            h => h,
        };
        format!("{hour}:{:02} {period}", self.minute())
    }

    fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Daily and weekly hours
// =============================================================================

/// Opening and closing time for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: TimeOfDay,
    pub close: TimeOfDay,
}

impl DayHours {
    #[must_use]
    pub const fn new(open: TimeOfDay, close: TimeOfDay) -> Self {
        Self { open, close }
    }

    /// Whether the interval runs past midnight into the next day.
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.close <= self.open
    }

    /// Closing minute for comparisons, pushed past 1440 when the day wraps.
    fn close_minutes(&self) -> u32 {
        if self.wraps() {
            self.close.minutes + MINUTES_PER_DAY
        } else {
            self.close.minutes
        }
    }

    fn contains(&self, minutes: u32) -> bool {
        self.open.minutes <= minutes && minutes < self.close_minutes()
    }
}

/// What happens on one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDaySchedule")]
pub enum DaySchedule {
    Open(DayHours),
    Closed,
}

impl DaySchedule {
    #[must_use]
    pub const fn hours(&self) -> Option<&DayHours> {
        match self {
            Self::Open(hours) => Some(hours),
            Self::Closed => None,
        }
    }
}

/// Wire shape of a day entry: `{open, close}` or the word `closed`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDaySchedule {
    Hours(DayHours),
    Keyword(String),
}

impl TryFrom<RawDaySchedule> for DaySchedule {
    type Error = ScheduleError;

    fn try_from(raw: RawDaySchedule) -> Result<Self, Self::Error> {
        match raw {
            RawDaySchedule::Hours(hours) => Ok(Self::Open(hours)),
            RawDaySchedule::Keyword(word) if word.trim().eq_ignore_ascii_case("closed") => {
                Ok(Self::Closed)
            }
            RawDaySchedule::Keyword(word) => Err(ScheduleError::InvalidDaySchedule(word)),
        }
    }
}

/// A complete weekly opening table, one entry per weekday.
///
/// Construction validates that all seven days are present and that the
/// store opens on at least one of them, so [`store_status`] always finds an
/// answer for a value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, DaySchedule>")]
pub struct WeeklyHours {
    /// Indexed by `Weekday::num_days_from_sunday()`.
    days: [DaySchedule; 7],
}

impl WeeklyHours {
    /// Build from `(weekday, schedule)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `MissingDay` or `DuplicateDay` unless each weekday appears
    /// exactly once, and `NeverOpen` if every day is closed.
    pub fn new(
        entries: impl IntoIterator<Item = (Weekday, DaySchedule)>,
    ) -> Result<Self, ScheduleError> {
        let mut slots: [Option<DaySchedule>; 7] = [None; 7];
        for (day, schedule) in entries {
            let slot = slots
                .get_mut(day.num_days_from_sunday() as usize)
                .ok_or(ScheduleError::UnknownDay(weekday_name(day).to_string()))?;
            if slot.is_some() {
                return Err(ScheduleError::DuplicateDay(weekday_name(day)));
            }
            *slot = Some(schedule);
        }

        let mut days = [DaySchedule::Closed; 7];
        for (day, (slot, out)) in WEEK.iter().zip(slots.iter().zip(days.iter_mut())) {
            *out = slot.ok_or(ScheduleError::MissingDay(weekday_name(*day)))?;
        }

        if days.iter().all(|d| matches!(d, DaySchedule::Closed)) {
            return Err(ScheduleError::NeverOpen);
        }

        Ok(Self { days })
    }

    /// The same hours every day.
    #[must_use]
    pub const fn every_day(hours: DayHours) -> Self {
        Self {
            days: [DaySchedule::Open(hours); 7],
        }
    }

    /// Schedule for one weekday.
    #[must_use]
    pub fn get(&self, day: Weekday) -> DaySchedule {
        self.days
            .get(day.num_days_from_sunday() as usize)
            .copied()
            .unwrap_or(DaySchedule::Closed)
    }

    /// All days, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DaySchedule)> + '_ {
        WEEK.into_iter().zip(self.days.iter().copied())
    }
}

impl TryFrom<BTreeMap<String, DaySchedule>> for WeeklyHours {
    type Error = ScheduleError;

    fn try_from(map: BTreeMap<String, DaySchedule>) -> Result<Self, Self::Error> {
        let entries = map
            .into_iter()
            .map(|(name, schedule)| parse_weekday(&name).map(|day| (day, schedule)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }
}

// =============================================================================
// Store status
// =============================================================================

/// Which day the store next opens, relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningDay {
    Today,
    Tomorrow,
    Weekday(Weekday),
}

impl fmt::Display for OpeningDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Tomorrow => f.write_str("tomorrow"),
            Self::Weekday(day) => f.write_str(weekday_name(*day)),
        }
    }
}

impl Serialize for OpeningDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The next time the store opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextOpening {
    pub day: OpeningDay,
    pub time: TimeOfDay,
    pub seconds_until_open: u64,
}

impl NextOpening {
    /// Countdown text, `"{hours}h {minutes}m"`.
    #[must_use]
    pub fn countdown(&self) -> String {
        let minutes = self.seconds_until_open / 60;
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Canonical open/closed state at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Open { closing_time: TimeOfDay },
    Closed { next_opening: NextOpening },
}

impl StoreStatus {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Raw closing time of the current window, when open.
    #[must_use]
    pub const fn closing_time(&self) -> Option<TimeOfDay> {
        match self {
            Self::Open { closing_time } => Some(*closing_time),
            Self::Closed { .. } => None,
        }
    }

    #[must_use]
    pub const fn next_opening(&self) -> Option<&NextOpening> {
        match self {
            Self::Open { .. } => None,
            Self::Closed { next_opening } => Some(next_opening),
        }
    }

    /// Presentation tri-state: closed stores opening within `opening_soon`
    /// are reported as `OpeningSoon`.
    #[must_use]
    pub fn state(&self, opening_soon: Duration) -> StoreState {
        match self {
            Self::Open { .. } => StoreState::Open,
            Self::Closed { next_opening } if next_opening.seconds_until_open <= opening_soon.as_secs() => {
                StoreState::OpeningSoon
            }
            Self::Closed { .. } => StoreState::Closed,
        }
    }
}

/// Tri-state derived from [`StoreStatus`] for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreState {
    Open,
    OpeningSoon,
    Closed,
}

/// Decide whether the store is open at `now`, or when it next opens.
///
/// The store is open when `now` falls inside today's window, or inside the
/// part of yesterday's window that ran past midnight. Otherwise the next
/// opening is the first opening instant strictly after `now`, scanning at
/// most one week ahead.
///
/// # Errors
///
/// Returns `ScheduleError::NoUpcomingOpening` if the bounded scan finds no
/// opening. A [`WeeklyHours`] built through its constructor always has one.
pub fn store_status(weekly: &WeeklyHours, now: NaiveDateTime) -> Result<StoreStatus, ScheduleError> {
    let today = now.weekday();
    let current = now.num_seconds_from_midnight() / 60;

    if let DaySchedule::Open(hours) = weekly.get(today)
        && hours.contains(current)
    {
        return Ok(StoreStatus::Open {
            closing_time: hours.close,
        });
    }

    if let DaySchedule::Open(hours) = weekly.get(today.pred())
        && hours.wraps()
        && current < hours.close.minutes
    {
        return Ok(StoreStatus::Open {
            closing_time: hours.close,
        });
    }

    let date = now.date();
    for offset in 0..=7_u64 {
        let Some(day) = date.checked_add_days(Days::new(offset)) else {
            break;
        };
        let DaySchedule::Open(hours) = weekly.get(day.weekday()) else {
            continue;
        };

        let opening = day.and_time(hours.open.to_naive_time());
        if opening > now {
            let seconds_until_open = u64::try_from((opening - now).num_seconds()).unwrap_or(0);
            let day_label = match offset {
                0 => OpeningDay::Today,
                1 => OpeningDay::Tomorrow,
                _ => OpeningDay::Weekday(day.weekday()),
            };
            return Ok(StoreStatus::Closed {
                next_opening: NextOpening {
                    day: day_label,
                    time: hours.open,
                    seconds_until_open,
                },
            });
        }
    }

    Err(ScheduleError::NoUpcomingOpening)
}
