use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

/// Timestamps are stored as `timestamp without time zone` holding UTC.
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// `at + delay`, saturating at the largest representable instant.
pub(crate) fn after(at: PrimitiveDateTime, delay: std::time::Duration) -> PrimitiveDateTime {
    time::Duration::try_from(delay)
        .ok()
        .and_then(|delay| at.checked_add(delay))
        .unwrap_or(PrimitiveDateTime::MAX)
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    let utc = value.assume_utc();
    utc.format(&Rfc3339).unwrap_or_else(|_| utc.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::macros::datetime;

    use super::*;

    #[test]
    fn stored_timestamps_render_as_utc() {
        assert_eq!(format_primitive(datetime!(2025-01-02 10:20:30)), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn retry_deadline_adds_the_delay() {
        let at = datetime!(2025-03-01 23:59:50);
        assert_eq!(after(at, Duration::from_secs(20)), datetime!(2025-03-02 00:00:10));
    }

    #[test]
    fn retry_deadline_saturates() {
        let at = datetime!(2025-03-01 00:00);
        assert_eq!(after(at, Duration::MAX), PrimitiveDateTime::MAX);
    }
}
