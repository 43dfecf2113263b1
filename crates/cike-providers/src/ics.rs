//! iCalendar (RFC 5545) codec for exported event files.
//!
//! Rendering decorates titles, derives UIDs from stable ids and writes
//! all-day ends exclusive. Reading reverses these steps so an exported
//! file can be inspected in the terms it was produced from. Files with timed
//! entries carry a `VTIMEZONE` for the zone their `TZID`s name.

use std::path::Path;

use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;
use cike_core::{EventTime, NormalizedEvent, SourceTag, StableId, decorate_title, strip_decoration};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, EventLike,
    Property, ValueType,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// `X-WR-CALNAME` of exported files.
pub const CALENDAR_NAME: &str = "Košice events";

/// Builds the VEVENT of one event.
pub fn render_event(event: &NormalizedEvent, tz: &Tz, stamp: DateTime<Utc>) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&StableId::for_event(event).uid());
    ics_event.summary(&decorate_title(event.source(), event.title()));
    ics_event.add_property("DTSTAMP", stamp.format("%Y%m%dT%H%M%SZ").to_string());

    add_time_property(&mut ics_event, "DTSTART", event.start(), tz);
    let end = match event.end() {
        EventTime::Date(d) => EventTime::Date(d.succ_opt().unwrap_or(d)),
        timed => timed,
    };
    add_time_property(&mut ics_event, "DTEND", end, tz);

    if !event.location().is_empty() {
        ics_event.location(event.location());
    }
    if !event.description().is_empty() {
        ics_event.description(event.description());
    }
    ics_event.add_property("CATEGORIES", event.source().as_str());
    ics_event.done()
}

/// Renders a whole calendar file.
pub fn render_calendar(events: &[NormalizedEvent], tz: &Tz, stamp: DateTime<Utc>) -> String {
    let mut cal = Calendar::new();
    cal.name(CALENDAR_NAME);
    for event in events {
        cal.push(render_event(event, tz, stamp));
    }
    let mut text = cal.done().to_string();

    let timed_year = events
        .iter()
        .find(|event| !event.is_all_day())
        .map(|event| event.start().date().year());
    if let (Some(year), Some(at)) = (timed_year, text.find("BEGIN:VEVENT")) {
        text.insert_str(at, &render_timezone(tz, year));
    }
    text
}

/// Renders the `VTIMEZONE` of `tz` with yearly rules taken from the offset
/// changes in `year`. A zone without changes that year gets one fixed
/// `STANDARD` rule.
pub fn render_timezone(tz: &Tz, year: i32) -> String {
    let mut out = format!("BEGIN:VTIMEZONE\r\nTZID:{}\r\n", tz.name());
    let transitions = transitions_in(tz, year);
    if transitions.is_empty() {
        let first = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default();
        let offset = format_offset(utc_offset(tz, first.and_time(NaiveTime::MIN)));
        out.push_str(&format!(
            "BEGIN:STANDARD\r\nDTSTART:{}\r\nTZOFFSETFROM:{offset}\r\nTZOFFSETTO:{offset}\r\nEND:STANDARD\r\n",
            first.format("%Y%m%dT000000")
        ));
    }
    for transition in &transitions {
        out.push_str(&transition.rule());
    }
    out.push_str("END:VTIMEZONE\r\n");
    out
}

/// An offset change, at the first UTC minute of the new offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    utc: NaiveDateTime,
    from: i32,
    to: i32,
}

impl Transition {
    /// `DAYLIGHT` or `STANDARD` sub-component recurring on the same
    /// weekday of the month every year.
    fn rule(&self) -> String {
        let kind = if self.to > self.from { "DAYLIGHT" } else { "STANDARD" };
        let local = self.utc + TimeDelta::seconds(i64::from(self.from));
        let date = local.date();
        let ordinal = if date.day() + 7 > days_in_month(date) {
            -1
        } else {
            i64::from((date.day() - 1) / 7 + 1)
        };
        format!(
            "BEGIN:{kind}\r\nDTSTART:{}\r\nTZOFFSETFROM:{}\r\nTZOFFSETTO:{}\r\n\
             RRULE:FREQ=YEARLY;BYMONTH={};BYDAY={ordinal}{}\r\nEND:{kind}\r\n",
            local.format("%Y%m%dT%H%M%S"),
            format_offset(self.from),
            format_offset(self.to),
            date.month(),
            weekday_code(date.weekday()),
        )
    }
}

/// Offset changes of `tz` during `year`, at most one per day.
fn transitions_in(tz: &Tz, year: i32) -> Vec<Transition> {
    let mut transitions = Vec::new();
    let Some(mut day) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return transitions;
    };
    while day.year() == year {
        let Some(next) = day.succ_opt() else {
            break;
        };
        let midnight = day.and_time(NaiveTime::MIN);
        let from = utc_offset(tz, midnight);
        let to = utc_offset(tz, next.and_time(NaiveTime::MIN));
        if from != to {
            // lo keeps the old offset, hi has the new one.
            let (mut lo, mut hi) = (0, 24 * 60);
            while hi - lo > 1 {
                let mid = (lo + hi) / 2;
                if utc_offset(tz, midnight + TimeDelta::minutes(mid)) == from {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            transitions.push(Transition {
                utc: midnight + TimeDelta::minutes(hi),
                from,
                to,
            });
        }
        day = next;
    }
    transitions
}

fn utc_offset(tz: &Tz, utc: NaiveDateTime) -> i32 {
    tz.offset_from_utc_datetime(&utc).fix().local_minus_utc()
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    format!("{sign}{:02}{:02}", seconds / 3600, seconds % 3600 / 60)
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        m => (date.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Dates as `VALUE=DATE`, date-times as wall-clock values with `TZID`.
fn add_time_property(ics_event: &mut icalendar::Event, name: &str, time: EventTime, tz: &Tz) {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        EventTime::DateTime(dt) => {
            let mut prop = Property::new(name, dt.format("%Y%m%dT%H%M%S").to_string());
            prop.add_parameter("TZID", tz.name());
            ics_event.append_property(prop);
        }
    }
}

/// An entry read back from an exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IcsEntry {
    pub uid: String,
    /// Title with the source decoration removed.
    pub title: String,
    pub start: EventTime,
    /// Inclusive end.
    pub end: EventTime,
    pub location: String,
    /// From `CATEGORIES`; `OTHER` for foreign entries.
    pub source: SourceTag,
}

/// Parses calendar text into entries.
///
/// VEVENTs without a UID or start are skipped with a warning.
pub fn read_calendar(text: &str) -> ProviderResult<Vec<IcsEntry>> {
    let calendar: Calendar = text.parse().map_err(|e| {
        ProviderError::invalid_response(format!("invalid iCalendar data: {}", e))
    })?;

    let entries: Vec<IcsEntry> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => read_event(event),
            _ => None,
        })
        .collect();
    debug!(entries = entries.len(), "read calendar");
    Ok(entries)
}

/// Reads and parses a calendar file.
pub async fn read_calendar_file(path: &Path) -> ProviderResult<Vec<IcsEntry>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProviderError::io(format!("failed to read {}: {}", path.display(), e)).with_source(e)
    })?;
    read_calendar(&text)
}

fn read_event(event: &icalendar::Event) -> Option<IcsEntry> {
    let Some(uid) = event.get_uid() else {
        warn!("VEVENT without UID skipped");
        return None;
    };
    let Some(start) = event.get_start().map(to_event_time) else {
        warn!(uid, "VEVENT without DTSTART skipped");
        return None;
    };
    let end = match (start, event.get_end().map(to_event_time)) {
        (EventTime::Date(s), Some(EventTime::Date(e))) => {
            EventTime::Date(e.pred_opt().unwrap_or(e).max(s))
        }
        (_, Some(end)) => end,
        (start, None) => start,
    };

    Some(IcsEntry {
        uid: uid.to_string(),
        title: strip_decoration(event.get_summary().unwrap_or_default())
            .trim()
            .to_string(),
        start,
        end,
        location: event.get_location().unwrap_or_default().to_string(),
        source: event
            .property_value("CATEGORIES")
            .map(SourceTag::from_tag)
            .unwrap_or(SourceTag::Other),
    })
}

fn to_event_time(dt: DatePerhapsTime) -> EventTime {
    match dt {
        DatePerhapsTime::Date(date) => EventTime::from_date(date),
        DatePerhapsTime::DateTime(cdt) => match cdt {
            CalendarDateTime::Utc(dt) => EventTime::from_datetime(dt.naive_utc()),
            CalendarDateTime::Floating(naive) => EventTime::from_datetime(naive),
            CalendarDateTime::WithTimezone { date_time, .. } => {
                EventTime::from_datetime(date_time)
            }
        },
    }
}
