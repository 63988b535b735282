use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

/// Renders a stored UTC timestamp as RFC 3339 with a `Z` suffix.
pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Accepts RFC 3339 and the offset-less `YYYY-MM-DDTHH:MM[:SS]` form sent by
/// datetime-local inputs. Offset-less values are read as UTC.
pub(crate) fn parse_deadline(value: &str) -> Option<PrimitiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(to_primitive_utc(parsed));
    }

    let normalized = match trimmed.len() {
        16 => format!("{trimmed}:00Z"),
        19 => format!("{trimmed}Z"),
        _ => return None,
    };

    OffsetDateTime::parse(&normalized.replacen(' ', "T", 1), &Rfc3339).ok().map(to_primitive_utc)
}
