//! `<dateTime.iso8601>` values

use crate::error::ValueError;
use std::fmt;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// A calendar date, or a timestamp with a known UTC offset.
///
/// Timestamps received without a zone designator are taken to be UTC, so
/// every timestamp carries an explicit offset. Precision is whole seconds
/// and whole offset minutes, the finest the wire format can state; every
/// constructor truncates to it, so a value always reads back equal to what
/// was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repr {
    Date(Date),
    Timestamp(OffsetDateTime),
}

impl DateTime {
    /// A calendar date without a time of day.
    pub fn date(value: Date) -> Self {
        DateTime(Repr::Date(value))
    }

    /// A timestamp, truncated to whole seconds and whole offset minutes.
    pub fn timestamp(value: OffsetDateTime) -> Self {
        let offset = value.offset();
        let (hours, minutes, _) = offset.as_hms();
        let value = match UtcOffset::from_hms(hours, minutes, 0) {
            Ok(whole) if whole != offset => value.to_offset(whole),
            _ => value,
        };
        DateTime(Repr::Timestamp(
            value.replace_nanosecond(0).unwrap_or(value),
        ))
    }

    /// A zone-less timestamp, read as UTC.
    pub fn floating(value: PrimitiveDateTime) -> Self {
        DateTime::timestamp(value.assume_utc())
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self.0, Repr::Date(_))
    }

    pub fn is_utc(&self) -> bool {
        match self.0 {
            Repr::Date(_) => false,
            Repr::Timestamp(ts) => ts.offset().is_utc(),
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self.0 {
            Repr::Date(date) => Some(date),
            Repr::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self.0 {
            Repr::Date(_) => None,
            Repr::Timestamp(ts) => Some(ts),
        }
    }

    /// Parses the text of a `<dateTime.iso8601>` element.
    ///
    /// Accepts `YYYY-MM-DD` and `YYYYMMDD`, optionally followed by
    /// `THH:MM[:SS[.fff]]` and a `Z`, `±HH:MM` or `±HHMM` zone.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_core::DateTime;
    ///
    /// let ts = DateTime::parse("19980717T14:08:55").unwrap();
    /// assert_eq!(ts.to_iso8601().unwrap(), "1998-07-17T14:08:55Z");
    ///
    /// let day = DateTime::parse("2004-09-13").unwrap();
    /// assert!(day.is_date_only());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let text = text.trim();
        let invalid = || ValueError::InvalidScalar {
            kind: "dateTime.iso8601",
            text: text.to_string(),
        };

        let (date_part, time_part) = match text.split_once(['T', 't']) {
            Some((date, time)) => (date, Some(time)),
            None => (text, None),
        };
        let date = parse_date(date_part).ok_or_else(invalid)?;
        let Some(time_part) = time_part else {
            return Ok(DateTime::date(date));
        };

        let (clock, offset) = split_offset(time_part).ok_or_else(invalid)?;
        let time = parse_clock(clock).ok_or_else(invalid)?;
        Ok(DateTime::timestamp(
            PrimitiveDateTime::new(date, time).assume_offset(offset),
        ))
    }

    /// Canonical wire text: `YYYY-MM-DD` for dates, otherwise
    /// `YYYY-MM-DDTHH:MM:SS` followed by `Z` or `±HH:MM`.
    pub fn to_iso8601(&self) -> Result<String, ValueError> {
        let formatted = match self.0 {
            Repr::Date(date) => date.format(format_description!("[year]-[month]-[day]")),
            Repr::Timestamp(ts) if ts.offset().is_utc() => {
                ts.format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
            }
            Repr::Timestamp(ts) => ts.format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
            )),
        };
        formatted.map_err(|e| ValueError::Write(e.to_string()))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_iso8601().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl From<Date> for DateTime {
    fn from(date: Date) -> Self {
        DateTime::date(date)
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        DateTime::timestamp(value)
    }
}

impl From<PrimitiveDateTime> for DateTime {
    fn from(value: PrimitiveDateTime) -> Self {
        DateTime::floating(value)
    }
}

fn digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_date(s: &str) -> Option<Date> {
    let (year, month, day) = if s.contains('-') {
        let mut parts = s.split('-');
        let fields = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        fields
    } else if s.len() == 8 && s.is_ascii() {
        (&s[..4], &s[4..6], &s[6..])
    } else {
        return None;
    };

    let month = Month::try_from(digits::<u8>(month)?).ok()?;
    Date::from_calendar_date(digits(year)?, month, digits(day)?).ok()
}

fn split_offset(s: &str) -> Option<(&str, UtcOffset)> {
    if let Some(clock) = s.strip_suffix(['Z', 'z']) {
        return Some((clock, UtcOffset::UTC));
    }

    let Some(idx) = s.rfind(['+', '-']) else {
        return Some((s, UtcOffset::UTC));
    };
    let (clock, zone) = s.split_at(idx);
    let sign: i8 = if zone.starts_with('-') { -1 } else { 1 };
    let zone = &zone[1..];
    let (hours, minutes) = match zone.split_once(':') {
        Some(parts) => parts,
        None if zone.len() == 4 && zone.is_ascii() => zone.split_at(2),
        None if zone.len() == 2 => (zone, "00"),
        None => return None,
    };
    let offset = UtcOffset::from_hms(
        sign * digits::<i8>(hours)?,
        sign * digits::<i8>(minutes)?,
        0,
    )
    .ok()?;
    Some((clock, offset))
}

fn parse_clock(s: &str) -> Option<Time> {
    // Fractional seconds are below the wire precision.
    let s = s.split(['.', ',']).next()?;
    let (hour, minute, second) = if s.contains(':') {
        let mut parts = s.split(':');
        let fields = (parts.next()?, parts.next()?, parts.next().unwrap_or("00"));
        if parts.next().is_some() {
            return None;
        }
        fields
    } else if s.len() == 6 && s.is_ascii() {
        (&s[..2], &s[2..4], &s[4..])
    } else if s.len() == 4 && s.is_ascii() {
        (&s[..2], &s[2..], "00")
    } else {
        return None;
    };
    Time::from_hms(digits(hour)?, digits(minute)?, digits(second)?).ok()
}
