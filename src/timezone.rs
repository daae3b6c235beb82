use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current UTC offset of `local_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the name is not a canonical
/// timezone.
pub fn local_offset_or_error(local_timezone: &str) -> Result<UtcOffset, Error> {
    get_local_offset(local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", local_timezone);
        Error::InvalidTimezoneError(local_timezone.to_owned())
    })
}

/// Today's date in `local_offset`.
pub fn local_today(local_offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(local_offset).date()
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use crate::{
        Error,
        timezone::{get_local_offset, local_offset_or_error},
    };

    #[test]
    fn resolves_canonical_timezone() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
        assert_eq!(local_offset_or_error("Etc/UTC"), Ok(UtcOffset::UTC));
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert_eq!(
            local_offset_or_error("Mars/Olympus"),
            Err(Error::InvalidTimezoneError("Mars/Olympus".to_owned()))
        );
    }
}
