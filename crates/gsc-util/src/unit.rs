//! Calendar units and their boundary policy
//!
//! A unit is the recurring window a quota is measured against. Windows start at
//! local midnight (Day) or local midnight of Monday (Week).

use chrono::{DateTime, Datelike, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GscError;

/// Recurring calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Day,
    Week,
}

impl UnitKind {
    pub const ALL: [UnitKind; 2] = [UnitKind::Day, UnitKind::Week];

    /// Start of the window containing `point`.
    pub fn boundary_start(self, point: &DateTime<Local>) -> DateTime<Local> {
        let date = point.date_naive();
        let first_day = match self {
            UnitKind::Day => date,
            UnitKind::Week => {
                let back = u64::from(date.weekday().num_days_from_monday());
                date.checked_sub_days(Days::new(back)).unwrap_or(date)
            }
        };
        local_midnight(&Local, first_day)
    }

    /// Lower-case tag used in configuration and persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Day => "day",
            UnitKind::Week => "week",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Day => write!(f, "Day"),
            UnitKind::Week => write!(f, "Week"),
        }
    }
}

impl FromStr for UnitKind {
    type Err = GscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GscError::unknown_unit(s))
    }
}

/// First instant of `date` in `tz`.
///
/// Midnight can be skipped or repeated by DST transitions in some zones.
/// Repeated midnight resolves to the earlier instant; skipped midnight resolves
/// to the first whole hour that exists on that date. A date with no valid
/// hour at all falls back to midnight UTC.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    for hour in 0..24 {
        let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
            break;
        };
        match tz.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => continue,
        }
    }

    tz.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
