use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use super::clauses::{bool_filter, range, term};
use crate::error::{CoreError, Result};

/// One end of a requested date window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateBound {
    /// A whole local day
    Day(NaiveDate),
    /// An exact instant
    Instant(DateTime<Utc>),
}

/// Requested date window plus the zone it is interpreted in
///
/// Day bounds mean local days: the window runs from local midnight of the
/// from-day to local midnight after the to-day. Instant bounds are used
/// verbatim. The window is half-open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateRange {
    pub from: Option<DateBound>,
    pub to: Option<DateBound>,
    pub timezone: Option<Tz>,
    pub offset_minutes: Option<i32>,
}

/// Parse one window bound: an ISO date or an RFC 3339 instant
pub fn parse_bound(raw: &str) -> Result<DateBound> {
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(DateBound::Day(day));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| DateBound::Instant(dt.with_timezone(&Utc)))
        .map_err(|_| CoreError::BadParameter(format!("Unparseable date: {}", raw)))
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::BadParameter(format!("Unknown timezone: {}", name)))
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// UTC instant of local midnight starting the given day
    fn local_midnight(&self, day: NaiveDate) -> DateTime<Utc> {
        let naive = day.and_time(NaiveTime::MIN);
        if let Some(tz) = self.timezone {
            if let Some(local) = tz.from_local_datetime(&naive).earliest() {
                return local.with_timezone(&Utc);
            }
        }
        if let Some(minutes) = self.offset_minutes {
            if let Some(offset) = FixedOffset::east_opt(minutes * 60) {
                if let Some(local) = offset.from_local_datetime(&naive).earliest() {
                    return local.with_timezone(&Utc);
                }
            }
        }
        Utc.from_utc_datetime(&naive)
    }

    /// Local calendar date of an instant
    fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        if let Some(tz) = self.timezone {
            return instant.with_timezone(&tz).date_naive();
        }
        if let Some(minutes) = self.offset_minutes {
            if let Some(offset) = FixedOffset::east_opt(minutes * 60) {
                return instant.with_timezone(&offset).date_naive();
            }
        }
        instant.date_naive()
    }

    /// Inclusive window start as an instant
    fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.from.map(|bound| match bound {
            DateBound::Day(day) => self.local_midnight(day),
            DateBound::Instant(instant) => instant,
        })
    }

    /// Exclusive window end as an instant
    fn end_instant(&self) -> Option<DateTime<Utc>> {
        self.to.map(|bound| match bound {
            DateBound::Day(day) => self.local_midnight(day + chrono::Duration::days(1)),
            DateBound::Instant(instant) => instant,
        })
    }

    /// Inclusive window start as a local day
    fn start_day(&self) -> Option<NaiveDate> {
        self.from.map(|bound| match bound {
            DateBound::Day(day) => day,
            DateBound::Instant(instant) => self.local_day(instant),
        })
    }

    /// Inclusive window end as a local day
    fn end_day(&self) -> Option<NaiveDate> {
        self.to.map(|bound| match bound {
            DateBound::Day(day) => day,
            DateBound::Instant(instant) => self.local_day(instant),
        })
    }

    /// Range clause over wire publication times
    pub fn wire_clause(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let mut bounds = serde_json::Map::new();
        if let Some(start) = self.start_instant() {
            bounds.insert("gte".to_string(), json!(fmt_instant(start)));
        }
        if let Some(end) = self.end_instant() {
            bounds.insert("lt".to_string(), json!(fmt_instant(end)));
        }
        Some(range("versioncreated", Value::Object(bounds)))
    }

    /// One-of block over agenda scheduled dates
    ///
    /// All-day items compare in local days, timed items in instants, and
    /// descendant dates surface the parent through display_dates.
    pub fn agenda_clause(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }

        let mut variants: Vec<Value> = Vec::new();
        match (self.start_instant(), self.end_instant()) {
            (Some(start), None) => {
                // Open end: item ends on or after the window start
                variants.push(timed(vec![range(
                    "dates.end",
                    json!({"gte": fmt_instant(start)}),
                )]));
            }
            (None, Some(end)) => {
                // Open start: item starts before the window end
                variants.push(timed(vec![range(
                    "dates.start",
                    json!({"lt": fmt_instant(end)}),
                )]));
            }
            (Some(start), Some(end)) => {
                let start = fmt_instant(start);
                let end = fmt_instant(end);
                variants.push(timed(vec![range(
                    "dates.start",
                    json!({"gte": start, "lt": end}),
                )]));
                variants.push(timed(vec![range(
                    "dates.end",
                    json!({"gte": start, "lt": end}),
                )]));
                // Engulfing: the item brackets the whole window
                variants.push(timed(vec![
                    range("dates.start", json!({"lte": start})),
                    range("dates.end", json!({"gte": end})),
                ]));
            }
            (None, None) => return None,
        }
        match (self.start_day(), self.end_day()) {
            (Some(start), None) => {
                variants.push(all_day(vec![day_range(
                    "dates.end",
                    json!({"gte": fmt_day(start)}),
                )]));
            }
            (None, Some(end)) => {
                variants.push(all_day(vec![day_range(
                    "dates.start",
                    json!({"lte": fmt_day(end)}),
                )]));
            }
            (Some(start), Some(end)) => {
                let start = fmt_day(start);
                let end = fmt_day(end);
                variants.push(all_day(vec![day_range(
                    "dates.start",
                    json!({"gte": start, "lte": end}),
                )]));
                variants.push(all_day(vec![day_range(
                    "dates.end",
                    json!({"gte": start, "lte": end}),
                )]));
                variants.push(all_day(vec![
                    day_range("dates.start", json!({"lte": start})),
                    day_range("dates.end", json!({"gte": end})),
                ]));
            }
            (None, None) => {}
        }

        let mut display_bounds = serde_json::Map::new();
        if let Some(start) = self.start_instant() {
            display_bounds.insert("gte".to_string(), json!(fmt_instant(start)));
        }
        if let Some(end) = self.end_instant() {
            display_bounds.insert("lt".to_string(), json!(fmt_instant(end)));
        }
        variants.push(range("display_dates.date", Value::Object(display_bounds)));

        Some(json!({"bool": {"should": variants, "minimum_should_match": 1}}))
    }
}

fn fmt_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn fmt_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Variant over timed items; missing all_day flags count as timed
fn timed(clauses: Vec<Value>) -> Value {
    json!({"bool": {
        "filter": clauses,
        "must_not": [term("dates.all_day", true)],
    }})
}

/// Variant over all-day items, comparing at day granularity
fn all_day(mut clauses: Vec<Value>) -> Value {
    let mut filter = vec![term("dates.all_day", true)];
    filter.append(&mut clauses);
    bool_filter(filter)
}

/// Range clause comparing at day granularity
fn day_range(field: &str, bounds: Value) -> Value {
    let mut map = match bounds {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.insert("format".to_string(), json!("yyyy-MM-dd"));
    range(field, Value::Object(map))
}
