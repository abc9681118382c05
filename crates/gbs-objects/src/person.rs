use std::fmt;

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{ObjectError, ObjectResult};
use crate::sanitize::sanitize;

/// Largest zone offset a `±HHMM` field can hold, in minutes.
pub const MAX_OFFSET_MINUTES: i16 = 99 * 60 + 59;

/// A point in time as recorded in person lines.
///
/// `offset_minutes` follows the "minutes behind UTC" convention: a zone east
/// of UTC has a negative offset and is written with a `+` sign (UTC+02:00 is
/// stored as `-120` and written `+0200`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitTime {
    /// Seconds since the UNIX epoch.
    pub seconds: i64,
    /// Minutes behind UTC.
    #[serde(rename = "offset")]
    pub offset_minutes: i16,
}

impl GitTime {
    pub fn new(seconds: i64, offset_minutes: i16) -> Self {
        Self {
            seconds,
            offset_minutes,
        }
    }

    /// Capture a calendar timestamp together with its UTC offset.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let east_secs = dt.offset().fix().local_minus_utc();
        Self {
            seconds: dt.timestamp(),
            offset_minutes: (-east_secs / 60) as i16,
        }
    }

    /// The current wall-clock time in the local zone.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Convert back to a calendar timestamp in the recorded zone.
    ///
    /// Returns `None` if the seconds or offset are outside chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let zone = FixedOffset::east_opt(-i32::from(self.offset_minutes) * 60)?;
        let utc = DateTime::from_timestamp(self.seconds, 0)?;
        Some(utc.with_timezone(&zone))
    }

    /// Whether the offset fits the `±HHMM` zone field.
    pub fn has_valid_offset(&self) -> bool {
        self.offset_minutes.unsigned_abs() <= MAX_OFFSET_MINUTES.unsigned_abs()
    }

    /// The `±HHMM` zone string.
    pub fn format_offset(&self) -> String {
        let minutes = i32::from(self.offset_minutes);
        let sign = if minutes <= 0 { '+' } else { '-' };
        let abs = minutes.abs();
        format!("{sign}{:02}{:02}", abs / 60, abs % 60)
    }

    /// Parse a `±HHMM` zone string into minutes behind UTC. `MM` must be
    /// below 60.
    pub fn parse_offset(text: &str) -> Option<i16> {
        let bytes = text.as_bytes();
        if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let hours: i16 = text[1..3].parse().ok()?;
        let mins: i16 = text[3..5].parse().ok()?;
        if mins >= 60 {
            return None;
        }
        let total = hours * 60 + mins;
        match bytes[0] {
            b'+' => Some(-total),
            b'-' => Some(total),
            _ => None,
        }
    }
}

impl fmt::Display for GitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seconds, self.format_offset())
    }
}

/// Identity and timestamp on a commit or tag line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub date: GitTime,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>, date: GitTime) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            date,
        }
    }

    /// Reject a date whose zone cannot be written as `±HHMM`.
    ///
    /// `field` names the person in the error (`author`, `tagger`, ...).
    pub fn validate(&self, field: &str) -> ObjectResult<()> {
        if !self.date.has_valid_offset() {
            return Err(ObjectError::validation(
                format!("{field}.date"),
                format!(
                    "zone offset {} minutes is beyond ±99:59",
                    self.date.offset_minutes
                ),
            ));
        }
        Ok(())
    }

    /// A copy with name and email passed through [`sanitize`].
    pub fn sanitized(&self) -> Self {
        Self {
            name: sanitize(&self.name),
            email: sanitize(&self.email),
            date: self.date,
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_person(self))
    }
}

/// Encode a person as `"<name> <<email>> <seconds> <±HHMM>"`.
pub fn format_person(person: &Person) -> String {
    format!(
        "{} <{}> {}",
        sanitize(&person.name),
        sanitize(&person.email),
        person.date
    )
}

/// Decode a person line produced by [`format_person`].
///
/// The name runs up to the first `" <"`, the email up to the next `'>'`,
/// then a single space, the epoch seconds, a single space, and the zone.
pub fn decode_person(line: &str) -> ObjectResult<Person> {
    let malformed = |why: &str| ObjectError::MalformedPerson(format!("{why} in {line:?}"));

    let open = line.find('<').ok_or_else(|| malformed("missing '<'"))?;
    let name = line[..open]
        .strip_suffix(' ')
        .ok_or_else(|| malformed("missing space before '<'"))?;

    let rest = &line[open + 1..];
    let close = rest.find('>').ok_or_else(|| malformed("missing '>'"))?;
    let email = &rest[..close];

    let stamp = rest[close + 1..]
        .strip_prefix(' ')
        .ok_or_else(|| malformed("missing space after '>'"))?;
    let (seconds, zone) = stamp
        .split_once(' ')
        .ok_or_else(|| malformed("missing zone"))?;

    let text = seconds;
    let seconds: i64 = text
        .parse()
        .map_err(|_| malformed("invalid epoch seconds"))?;
    if seconds.to_string() != text {
        return Err(malformed("non-canonical epoch seconds"));
    }
    let offset_minutes = GitTime::parse_offset(zone).ok_or_else(|| malformed("invalid zone"))?;

    Ok(Person {
        name: name.to_string(),
        email: email.to_string(),
        date: GitTime::new(seconds, offset_minutes),
    })
}
