//! Countdown formatting.
//!
//! Renders milliseconds as `MM:SS` or `MM:SS.cc` (hundredths) and parses
//! the same shapes back. Minutes are never wrapped into hours.

use thiserror::Error;

/// Errors returned by [`parse_time`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTimeError {
    #[error("expected MM:SS or MM:SS.cc, got '{0}'")]
    Malformed(String),

    #[error("seconds must be below 60, got {0}")]
    SecondsOutOfRange(u64),
}

/// Formats a duration in milliseconds.
///
/// With `include_hundredths` the sub-second part is truncated to two digits.
/// Negative input is rendered with a leading `-`.
pub fn format_time(ms: i64, include_hundredths: bool) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let abs_ms = ms.unsigned_abs();
    let total_seconds = abs_ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if include_hundredths {
        let hundredths = (abs_ms % 1000) / 10;
        format!("{sign}{minutes:02}:{seconds:02}.{hundredths:02}")
    } else {
        format!("{sign}{minutes:02}:{seconds:02}")
    }
}

/// Parses the output of [`format_time`] back into milliseconds.
///
/// # Errors
///
/// Returns an error if the text is not `[-]MM:SS` or `[-]MM:SS.cc`, or if
/// the seconds field is 60 or more.
pub fn parse_time(text: &str) -> Result<i64, ParseTimeError> {
    let malformed = || ParseTimeError::Malformed(text.to_string());

    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (minutes, rest) = body.split_once(':').ok_or_else(malformed)?;
    let (seconds, hundredths) = match rest.split_once('.') {
        Some((s, h)) => (s, Some(h)),
        None => (rest, None),
    };

    let minutes = parse_digits(minutes).ok_or_else(malformed)?;
    if seconds.len() != 2 {
        return Err(malformed());
    }
    let seconds = parse_digits(seconds).ok_or_else(malformed)?;
    if seconds >= 60 {
        return Err(ParseTimeError::SecondsOutOfRange(seconds));
    }
    let hundredths = match hundredths {
        Some(h) if h.len() == 2 => parse_digits(h).ok_or_else(malformed)?,
        Some(_) => return Err(malformed()),
        None => 0,
    };

    let total = minutes
        .checked_mul(60_000)
        .and_then(|m| m.checked_add(seconds * 1000 + hundredths * 10))
        .and_then(|ms| i64::try_from(ms).ok())
        .ok_or_else(malformed)?;

    Ok(if negative { -total } else { total })
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_default_focus() {
        assert_eq!(format_time(1_500_000, false), "25:00");
        assert_eq!(format_time(1_500_000, true), "25:00.00");
    }

    #[test]
    fn test_format_truncates_hundredths() {
        assert_eq!(format_time(61_239, true), "01:01.23");
        assert_eq!(format_time(999, false), "00:00");
    }

    #[test]
    fn test_format_negative_and_long() {
        assert_eq!(format_time(-5_000, false), "-00:05");
        assert_eq!(format_time(90 * 60_000, false), "90:00");
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_time("25:00"), Ok(1_500_000));
        assert_eq!(parse_time("01:01.23"), Ok(61_230));
        assert_eq!(parse_time("-00:05"), Ok(-5_000));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_time("25"), Err(ParseTimeError::Malformed(_))));
        assert!(matches!(parse_time("1:5"), Err(ParseTimeError::Malformed(_))));
        assert!(matches!(parse_time("01:02.3"), Err(ParseTimeError::Malformed(_))));
        assert!(matches!(parse_time("aa:00"), Err(ParseTimeError::Malformed(_))));
        assert_eq!(
            parse_time("00:75"),
            Err(ParseTimeError::SecondsOutOfRange(75))
        );
    }

    #[test]
    fn test_round_trip_at_display_precision() {
        for ms in [0_i64, 1_000, 59_990, 61_230, 1_500_000, -12_340] {
            assert_eq!(parse_time(&format_time(ms, true)), Ok(ms));
        }
        // Whole seconds survive the short form; sub-second parts are dropped.
        assert_eq!(parse_time(&format_time(61_239, false)), Ok(61_000));
    }
}
