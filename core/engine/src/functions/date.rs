//! FILENAME: core/engine/src/functions/date.rs
//! PURPOSE: Date functions over serial day numbers.
//! CONTEXT: Serials count days from 1899-12-30, which matches the 1900 date
//! system for every date from 1900-03-01 on. Fractions (times of day) are
//! dropped.

use super::{finish, num_arg, opt_num_arg};
use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use chrono::{Datelike, Days, Months, NaiveDate};
use parser::Expression;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Serial of 9999-12-31, the last date DATE can produce.
fn max_serial() -> f64 {
    NaiveDate::from_ymd_opt(9999, 12, 31).map_or(0.0, date_to_serial)
}

/// Serial day number of a date.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

/// Date of a serial day number. Negative serials have no date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    epoch().checked_add_days(Days::new(serial.trunc() as u64))
}

fn date_arg(ev: &Evaluator, expr: &Expression) -> Result<NaiveDate, CellError> {
    serial_to_date(num_arg(ev, expr)?).ok_or(CellError::Value)
}

/// DATE(year, month, day). Years below 1900 are offset by 1900; months and
/// days outside their range roll into neighbouring months and years.
pub fn date(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let mut year = num_arg(ev, &args[0])?.trunc() as i64;
        let month = num_arg(ev, &args[1])?.trunc() as i64;
        let day = num_arg(ev, &args[2])?.trunc() as i64;

        if (0..1900).contains(&year) {
            year += 1900;
        }
        if !(0..=9999).contains(&year) {
            return Err(CellError::Value);
        }

        let total_months = month
            .checked_sub(1)
            .and_then(|m| m.checked_add(year * 12))
            .ok_or(CellError::Value)?;
        let y = total_months.div_euclid(12);
        if !(0..=9999).contains(&y) {
            return Err(CellError::Value);
        }
        let m = total_months.rem_euclid(12) + 1;
        let first = NaiveDate::from_ymd_opt(y as i32, m as u32, 1).ok_or(CellError::Value)?;

        let serial = date_to_serial(first) + (day as f64 - 1.0);
        if !(0.0..=max_serial()).contains(&serial) {
            return Err(CellError::Value);
        }
        Ok(serial)
    })())
}

pub fn year(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(date_arg(ev, &args[0]).map(|d| d.year() as f64))
}

pub fn month(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(date_arg(ev, &args[0]).map(|d| d.month() as f64))
}

pub fn day(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(date_arg(ev, &args[0]).map(|d| d.day() as f64))
}

/// WEEKDAY(serial, [type]). Type 1: Sunday=1..Saturday=7, type 2:
/// Monday=1..Sunday=7, type 3: Monday=0..Sunday=6.
pub fn weekday(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let date = date_arg(ev, &args[0])?;
        let kind = opt_num_arg(ev, args, 1, 1.0)?.trunc() as i64;
        let weekday = date.weekday();
        match kind {
            1 => Ok(weekday.number_from_sunday() as f64),
            2 => Ok(weekday.number_from_monday() as f64),
            3 => Ok(weekday.num_days_from_monday() as f64),
            _ => Err(CellError::Value),
        }
    })())
}

/// DAYS(end, start)
pub fn days(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let end = num_arg(ev, &args[0])?.trunc();
        let start = num_arg(ev, &args[1])?.trunc();
        Ok(end - start)
    })())
}

/// EDATE(start, months). Days past the end of the target month clamp to
/// its last day.
pub fn edate(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let start = date_arg(ev, &args[0])?;
        let months = num_arg(ev, &args[1])?.trunc();
        let shifted = if months >= 0.0 {
            start.checked_add_months(Months::new(months as u32))
        } else {
            start.checked_sub_months(Months::new((-months) as u32))
        };
        let date = shifted.ok_or(CellError::Value)?;
        let serial = date_to_serial(date);
        if serial < 0.0 {
            return Err(CellError::Value);
        }
        Ok(serial)
    })())
}
