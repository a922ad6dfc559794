//! Typed microsecond durations and the timecode grammar.
//!
//! Every time-valued parameter in esrender is a microsecond count. Users may
//! write either a plain integer (`20000`) or a timecode (`0:00:12.5`); this
//! module owns both the parsing and the unit-aware formatting used when
//! durations are embedded in derived file names.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

const US_PER_SECOND: u64 = 1_000_000;
const US_PER_MINUTE: u64 = 60 * US_PER_SECOND;
const US_PER_HOUR: u64 = 60 * US_PER_MINUTE;

/// A non-negative duration in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Micros(pub u64);

impl Micros {
    /// Parses a plain digit string (microseconds) or an `H:MM:SS[.ffffff]`
    /// timecode. Fractional seconds shorter than six digits are padded with
    /// zeros; longer fractions are rounded (half away from zero) to six.
    pub fn parse(value: &str) -> CoreResult<Self> {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            return value
                .parse::<u64>()
                .map(Micros)
                .map_err(|_| CoreError::InvalidDuration(value.to_string()));
        }

        let invalid = || CoreError::InvalidDuration(value.to_string());
        let mut fields = value.split(':');
        let (hours, minutes, rest) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(h), Some(m), Some(s), None) => (h, m, s),
            _ => return Err(invalid()),
        };
        let (seconds, fraction) = match rest.split_once('.') {
            Some((s, f)) => (s, Some(f)),
            None => (rest, None),
        };

        let field = |text: &str| -> CoreResult<u64> {
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            text.parse::<u64>().map_err(|_| invalid())
        };

        let mut total = field(hours)? * US_PER_HOUR
            + field(minutes)? * US_PER_MINUTE
            + field(seconds)? * US_PER_SECOND;
        if let Some(fraction) = fraction {
            total += parse_fraction(fraction).ok_or_else(invalid)?;
        }
        Ok(Micros(total))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Renders the duration with the coarsest unit that represents it
    /// exactly: seconds, then milliseconds, then microseconds.
    #[must_use]
    pub fn compact(self) -> String {
        if self.0 % US_PER_SECOND == 0 {
            format!("{}s", self.0 / US_PER_SECOND)
        } else if self.0 % 1_000 == 0 {
            format!("{}ms", self.0 / 1_000)
        } else {
            format!("{}us", self.0)
        }
    }

    /// Renders the duration as an `HH:MM:SS.ffffff` timecode.
    #[must_use]
    pub fn timecode(self) -> String {
        let hours = self.0 / US_PER_HOUR;
        let minutes = (self.0 % US_PER_HOUR) / US_PER_MINUTE;
        let seconds = (self.0 % US_PER_MINUTE) / US_PER_SECOND;
        let fraction = self.0 % US_PER_SECOND;
        format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:06}")
    }
}

impl fmt::Display for Micros {
    /// Displays as a raw microsecond count, the form child tools accept.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Micros {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Micros::parse(s)
    }
}

/// Converts a fractional-seconds digit string to microseconds, padding to or
/// rounding at six digits. Returns `None` for empty or non-digit input.
fn parse_fraction(fraction: &str) -> Option<u64> {
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction.len() <= 6 {
        let mut padded = fraction.to_string();
        while padded.len() < 6 {
            padded.push('0');
        }
        return padded.parse::<u64>().ok();
    }
    let mut micros = fraction[..6].parse::<u64>().ok()?;
    // Half-away-from-zero on the first dropped digit.
    if fraction.as_bytes()[6] >= b'5' {
        micros += 1;
    }
    Some(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers_verbatim() {
        assert_eq!(Micros::parse("0").unwrap(), Micros(0));
        assert_eq!(Micros::parse("20000").unwrap(), Micros(20_000));
        assert_eq!(Micros::parse("123456789").unwrap(), Micros(123_456_789));
    }

    #[test]
    fn parses_timecodes() {
        assert_eq!(Micros::parse("0:00:00").unwrap(), Micros(0));
        assert_eq!(Micros::parse("0:00:01").unwrap(), Micros(1_000_000));
        assert_eq!(Micros::parse("0:01:00").unwrap(), Micros(60_000_000));
        assert_eq!(Micros::parse("1:00:00").unwrap(), Micros(3_600_000_000));
        assert_eq!(
            Micros::parse("12:34:56.789000").unwrap(),
            Micros(12 * 3_600_000_000 + 34 * 60_000_000 + 56 * 1_000_000 + 789_000)
        );
    }

    #[test]
    fn pads_short_fractions_with_zeros() {
        assert_eq!(Micros::parse("0:00:00.5").unwrap(), Micros(500_000));
        assert_eq!(Micros::parse("0:00:00.042").unwrap(), Micros(42_000));
        assert_eq!(Micros::parse("0:00:00.123456").unwrap(), Micros(123_456));
    }

    #[test]
    fn rounds_long_fractions_to_six_digits() {
        assert_eq!(Micros::parse("0:00:00.1234564").unwrap(), Micros(123_456));
        assert_eq!(Micros::parse("0:00:00.1234565").unwrap(), Micros(123_457));
        assert_eq!(Micros::parse("0:00:00.9999999").unwrap(), Micros(1_000_000));
    }

    #[test]
    fn rejects_malformed_durations() {
        for text in [
            "", " ", "-1", "1.5", "0:00", "0:00:00:00", "a:00:00", "0:0a:00",
            "0:00:00.", "0:00:00.12a", "12:34", "1h", "--begin",
        ] {
            assert!(
                matches!(Micros::parse(text), Err(CoreError::InvalidDuration(_))),
                "expected InvalidDuration for {text:?}"
            );
        }
    }

    #[test]
    fn compact_prefers_the_coarsest_exact_unit() {
        assert_eq!(Micros(2_000_000).compact(), "2s");
        assert_eq!(Micros(20_000).compact(), "20ms");
        assert_eq!(Micros(200_000).compact(), "200ms");
        assert_eq!(Micros(123_456).compact(), "123456us");
        assert_eq!(Micros(0).compact(), "0s");
    }

    #[test]
    fn timecode_rendering_round_trips() {
        let value = Micros(3_723_000_042);
        assert_eq!(value.timecode(), "01:02:03.000042");
        assert_eq!(Micros::parse(&value.timecode()).unwrap(), value);
    }
}
