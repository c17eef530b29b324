//! NYSE trading calendar
//!
//! Rule-based: weekdays minus the exchange's full-day holidays. Fixed-date
//! holidays falling on Saturday are observed the Friday before, on Sunday the
//! Monday after. New Year's Day on a Saturday is not observed (the exchange
//! does not close on the preceding Dec 31).

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Full-day closures for `year`, sorted
pub fn nyse_holidays(year: i32) -> Vec<NaiveDate> {
    let mut holidays = Vec::with_capacity(10);

    if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
        match new_year.weekday() {
            Weekday::Sat => {}
            Weekday::Sun => holidays.push(new_year + Duration::days(1)),
            _ => holidays.push(new_year),
        }
    }

    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3)); // MLK
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3)); // Presidents
    holidays.extend(easter_sunday(year).map(|easter| easter - Duration::days(2)));
    holidays.extend(last_weekday_of_month(year, 5, Weekday::Mon)); // Memorial
    if year >= 2022 {
        holidays.extend(observed(year, 6, 19)); // Juneteenth
    }
    holidays.extend(observed(year, 7, 4));
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1)); // Labor
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4)); // Thanksgiving
    holidays.extend(observed(year, 12, 25));

    holidays.sort();
    holidays
}

/// Whether the exchange holds a regular session on `date`
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        && !nyse_holidays(date.year()).contains(&date)
}

/// Trading sessions between `start` and `end`, both inclusive
pub fn nyse_sessions(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }

    let mut holidays = Vec::new();
    for year in start.year()..=end.year() {
        holidays.extend(nyse_holidays(year));
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|d| holidays.binary_search(d).is_err())
        .collect()
}

fn observed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    })
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month - Duration::days(1);
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(back as i64))
}

/// Gregorian Easter (anonymous computus)
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
