use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

/// An instant in time as used in FHIR resources, RFC3339 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FhirDateTime(pub OffsetDateTime);

impl FhirDateTime {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    pub fn inner(&self) -> &OffsetDateTime {
        &self.0
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }
}

impl fmt::Display for FhirDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for FhirDateTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        parse_fhir_date(s).map(FhirDateTime)
    }
}

impl Serialize for FhirDateTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self
            .0
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for FhirDateTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FhirDateTime::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn now_utc() -> FhirDateTime {
    FhirDateTime(OffsetDateTime::now_utc())
}

/// Parse a FHIR date/dateTime string into a concrete instant.
///
/// FHIR allows partial precision: `2024`, `2024-03`, `2024-03-15`, or a full
/// dateTime. Partial values are completed to the start of the period so that
/// range comparators stay well defined on a single timestamp column.
/// A dateTime without an offset is assumed UTC.
pub fn parse_fhir_date(s: &str) -> Result<OffsetDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_date_time("empty date"));
    }

    // Year only: "2024"
    if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = trimmed
            .parse()
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        let date = Date::from_calendar_date(year, Month::January, 1)
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        return Ok(date.midnight().assume_utc());
    }

    // Year-month: "2024-03"
    if trimmed.len() == 7 && trimmed.as_bytes()[4] == b'-' {
        let year: i32 = trimmed[..4]
            .parse()
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        let month: u8 = trimmed[5..7]
            .parse()
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        let month = Month::try_from(month).map_err(|_| CoreError::invalid_date_time(trimmed))?;
        let date = Date::from_calendar_date(year, month, 1)
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        return Ok(date.midnight().assume_utc());
    }

    // Full date: "2024-03-15"
    if trimmed.len() == 10 && !trimmed.contains('T') {
        let format = time::macros::format_description!("[year]-[month]-[day]");
        let date = Date::parse(trimmed, &format)
            .map_err(|_| CoreError::invalid_date_time(trimmed))?;
        return Ok(date.midnight().assume_utc());
    }

    // Full dateTime with offset
    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(dt);
    }

    // dateTime without offset: assume UTC
    let format =
        time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(trimmed, &format) {
        return Ok(dt.assume_utc());
    }

    Err(CoreError::invalid_date_time(trimmed))
}
