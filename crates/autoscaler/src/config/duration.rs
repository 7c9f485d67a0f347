//! Duration parsing for command line values.
//!
//! ISO 8601 durations (`PT10S`, `P1DT2H`, `PT0.5S`) are the primary format.
//! Plain humantime strings (`10s`, `1m 30s`) are accepted as a fallback.

use std::time::Duration;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 60.0 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: f64 = 24.0 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: f64 = 7.0 * SECONDS_PER_DAY;
// Calendar units have no fixed length; use the nominal values.
const SECONDS_PER_MONTH: f64 = 30.0 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("invalid duration '{input}': expected an ISO 8601 duration such as PT10S")]
pub struct DurationParseError {
    pub input: String,
}

impl core::error::Error for DurationParseError {}

/// Parse a duration string.
///
/// # Errors
///
/// - [`DurationParseError`] if the value is neither ISO 8601 nor humantime
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if let Some(duration) = parse_iso8601(trimmed) {
        return Ok(duration);
    }
    humantime::parse_duration(trimmed).map_err(|_| DurationParseError {
        input: input.to_string(),
    })
}

/// Designator order is fixed: `Y M W D` in the date part, `H M S` in the time part.
fn designator_rank(in_time: bool, designator: char) -> Option<(u8, f64)> {
    match (in_time, designator) {
        (false, 'Y') => Some((1, SECONDS_PER_YEAR)),
        (false, 'M') => Some((2, SECONDS_PER_MONTH)),
        (false, 'W') => Some((3, SECONDS_PER_WEEK)),
        (false, 'D') => Some((4, SECONDS_PER_DAY)),
        (true, 'H') => Some((5, SECONDS_PER_HOUR)),
        (true, 'M') => Some((6, SECONDS_PER_MINUTE)),
        (true, 'S') => Some((7, 1.0)),
        _ => None,
    }
}

fn parse_iso8601(input: &str) -> Option<Duration> {
    let upper = input.to_ascii_uppercase();
    let body = upper.strip_prefix('P')?;

    let mut total_secs = 0.0_f64;
    let mut in_time = false;
    let mut last_rank = 0_u8;
    let mut components = 0_usize;
    let mut number = String::new();

    for c in body.chars() {
        match c {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' | '.' => number.push(c),
            ',' => number.push('.'),
            designator => {
                let (rank, unit_secs) = designator_rank(in_time, designator)?;
                if rank <= last_rank {
                    return None;
                }
                let value: f64 = number.parse().ok()?;
                number.clear();
                last_rank = rank;
                components += 1;
                total_secs += value * unit_secs;
            }
        }
    }

    // A trailing number without designator, a bare "P" or a "PT" with no time part.
    if !number.is_empty() || components == 0 || (in_time && last_rank < 5) {
        return None;
    }

    Duration::try_from_secs_f64(total_secs).ok()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn parses_seconds() {
        assert_eq!(parse_duration("PT10S").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn parses_combined_date_and_time() {
        assert_eq!(
            parse_duration("P1DT2H3M4S").unwrap(),
            Duration::from_secs(86_400 + 2 * 3_600 + 3 * 60 + 4)
        );
        assert_eq!(parse_duration("P2W").unwrap(), Duration::from_secs(14 * 86_400));
    }

    #[test]
    fn parses_fractions_and_lowercase() {
        assert_eq!(parse_duration("PT0.5S").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("pt1,5m").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn month_in_date_part_differs_from_minute_in_time_part() {
        assert_eq!(parse_duration("PT1M").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("P1M").unwrap(), Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn zero_duration_is_parsed() {
        assert_eq!(parse_duration("PT0S").unwrap(), Duration::ZERO);
    }

    #[test]
    fn falls_back_to_humantime() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        for input in ["bogus", "", "P", "PT", "PT10", "P1H", "PT1S2M", "P1D1D", "PTS", "P-1D"] {
            let err = parse_duration(input).expect_err(input);
            assert_eq!(err.input, input);
        }
    }
}
