// Prediction week windows: when each week opens, when picks lock, and when
// the week is over and ready to grade.
//
// Weeks run Tuesday 08:00 to the following Tuesday 08:00 in league-local
// time. Picks lock Thursday at 20:15, or 12:30 on Thanksgiving.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
    Weekday,
};
use serde::{Deserialize, Serialize};

const WEEK_START: (u32, u32) = (8, 0);
const DEADLINE: (u32, u32) = (20, 15);
const THANKSGIVING_DEADLINE: (u32, u32) = (12, 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub week: u32,
    pub start: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// A form is on time when it arrives strictly before the deadline.
    pub fn accepts_submission(&self, at: DateTime<Utc>) -> bool {
        at < self.deadline
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// The windows of every prediction week in a season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    windows: Vec<WeekWindow>,
}

impl Schedule {
    /// Build `weeks` consecutive windows. Week 1 opens on the first Tuesday
    /// on or after `season_start`. `offset` is the league's local UTC offset.
    pub fn new(season_start: NaiveDate, weeks: u32, offset: FixedOffset) -> Self {
        let first_tuesday = next_tuesday(season_start);
        let windows = (0..weeks)
            .map(|i| {
                let start_date = first_tuesday + Duration::days(7 * i64::from(i));
                let deadline_date = start_date + Duration::days(2);
                let deadline_time = if is_thanksgiving(deadline_date) {
                    THANKSGIVING_DEADLINE
                } else {
                    DEADLINE
                };
                WeekWindow {
                    week: i + 1,
                    start: local(start_date, WEEK_START, offset),
                    deadline: local(deadline_date, deadline_time, offset),
                    end: local(start_date + Duration::days(7), WEEK_START, offset),
                }
            })
            .collect();
        Self { windows }
    }

    pub fn windows(&self) -> &[WeekWindow] {
        &self.windows
    }

    pub fn window(&self, week: u32) -> Option<&WeekWindow> {
        week.checked_sub(1).and_then(|i| self.windows.get(i as usize))
    }

    /// The week whose window contains `at`.
    pub fn week_at(&self, at: DateTime<Utc>) -> Option<u32> {
        self.windows.iter().find(|w| w.contains(at)).map(|w| w.week)
    }

    /// The latest week whose window has closed by `at`.
    pub fn last_completed_week(&self, at: DateTime<Utc>) -> Option<u32> {
        self.windows
            .iter()
            .rev()
            .find(|w| w.end <= at)
            .map(|w| w.week)
    }

    /// Whether a form for `week` submitted at `at` should be scored. Weeks
    /// outside the schedule accept everything.
    pub fn accepts_submission(&self, week: u32, at: DateTime<Utc>) -> bool {
        self.window(week).map_or(true, |w| w.accepts_submission(at))
    }
}

fn next_tuesday(date: NaiveDate) -> NaiveDate {
    let tuesday = Weekday::Tue.num_days_from_monday();
    let ahead = (7 + tuesday - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(ahead))
}

fn is_thanksgiving(date: NaiveDate) -> bool {
    NaiveDate::from_weekday_of_month_opt(date.year(), 11, Weekday::Thu, 4) == Some(date)
}

fn local(date: NaiveDate, (hour, minute): (u32, u32), offset: FixedOffset) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let naive = NaiveDateTime::new(date, time);
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}
