//! Well-known types with a special JSON mapping.
//!
//! `google.protobuf.Timestamp` and `google.protobuf.Duration` are never
//! generated, every schema that references them uses these types instead.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::{DecodeError, EncodeError};
use crate::json::{decode, Value};
use crate::message::{BinaryCodec, JsonCodec, Message};
use crate::reader::Reader;
use crate::writer::Writer;

/// 0001-01-01T00:00:00Z
const TIMESTAMP_MIN_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const TIMESTAMP_MAX_SECONDS: i64 = 253_402_300_799;
/// Roughly 10,000 years.
const DURATION_MAX_SECONDS: i64 = 315_576_000_000;
const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// A point in time, independent of any time zone, as seconds and nanoseconds
/// since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    /// Non-negative fractions of a second, `0..=999_999_999`.
    pub nanos: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampPartial {
    pub seconds: Option<i64>,
    pub nanos: Option<i32>,
}

/// A signed span of time.
///
/// `seconds` and `nanos` must have the same sign, `-1.5s` is
/// `{ seconds: -1, nanos: -500_000_000 }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationPartial {
    pub seconds: Option<i64>,
    pub nanos: Option<i32>,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Timestamp { seconds, nanos }
    }

    fn is_valid(&self) -> bool {
        (TIMESTAMP_MIN_SECONDS..=TIMESTAMP_MAX_SECONDS).contains(&self.seconds)
            && (0..NANOS_PER_SECOND).contains(&self.nanos)
    }

    /// Formats as RFC 3339 in UTC, e.g. `1972-01-01T10:00:20.021Z`.
    pub fn to_rfc3339(&self) -> Result<String, EncodeError> {
        let out_of_range = || EncodeError::TimestampOutOfRange {
            seconds: self.seconds,
            nanos: self.nanos,
        };
        if !self.is_valid() {
            return Err(out_of_range());
        }

        let date_time =
            OffsetDateTime::from_unix_timestamp(self.seconds).map_err(|_| out_of_range())?;
        let whole = date_time
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]"
            ))
            .map_err(|_| out_of_range())?;

        // N.B. Checked non-negative by `is_valid`.
        Ok(format!("{whole}{}Z", fraction(self.nanos.unsigned_abs())))
    }

    /// Parses an RFC 3339 timestamp. Any offset is accepted and normalized to
    /// UTC.
    ///
    /// Only the canonical shape is accepted: an uppercase `T`, at most nine
    /// fractional digits and a `Z` or `±HH:MM` suffix.
    pub fn from_rfc3339(text: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidTimestamp {
            value: text.to_owned(),
        };
        if !has_canonical_shape(text) {
            return Err(invalid());
        }
        let date_time = OffsetDateTime::parse(text, &Rfc3339).map_err(|_| invalid())?;

        let timestamp = Timestamp {
            seconds: date_time.unix_timestamp(),
            nanos: i32::try_from(date_time.nanosecond()).map_err(|_| invalid())?,
        };
        if !timestamp.is_valid() {
            return Err(invalid());
        }
        Ok(timestamp)
    }
}

/// Checks what `time` is lenient about: the separator, the fraction length and
/// the offset suffix. The date and clock fields are left to the parser.
fn has_canonical_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 20 || bytes[10] != b'T' {
        return false;
    }

    let mut rest = &bytes[19..];
    if let Some(fraction) = rest.strip_prefix(b".") {
        let digits = fraction.iter().take_while(|b| b.is_ascii_digit()).count();
        if !(1..=9).contains(&digits) {
            return false;
        }
        rest = &fraction[digits..];
    }

    match rest {
        [b'Z'] => true,
        [b'+' | b'-', h1, h2, b':', m1, m2] => {
            [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

impl Duration {
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Duration { seconds, nanos }
    }

    fn is_valid(&self) -> bool {
        let same_sign = (self.seconds >= 0 && self.nanos >= 0)
            || (self.seconds <= 0 && self.nanos <= 0);
        (-DURATION_MAX_SECONDS..=DURATION_MAX_SECONDS).contains(&self.seconds)
            && self.nanos.abs() < NANOS_PER_SECOND
            && same_sign
    }

    /// Formats as `"<seconds>[.<fraction>]s"`, e.g. `-1.500s`.
    pub fn to_json_string(&self) -> Result<String, EncodeError> {
        if !self.is_valid() {
            return Err(EncodeError::DurationOutOfRange {
                seconds: self.seconds,
                nanos: self.nanos,
            });
        }

        let sign = if self.seconds < 0 || self.nanos < 0 {
            "-"
        } else {
            ""
        };
        Ok(format!(
            "{sign}{}{}s",
            self.seconds.unsigned_abs(),
            fraction(self.nanos.unsigned_abs())
        ))
    }

    pub fn from_json_string(text: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidDuration {
            value: text.to_owned(),
        };

        let body = text.strip_suffix('s').ok_or_else(invalid)?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (body, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || frac.len() > 9 || !all_digits(frac) {
            return Err(invalid());
        }
        if body.ends_with('.') {
            return Err(invalid());
        }

        let seconds: i64 = whole.parse().map_err(|_| invalid())?;
        let nanos: i32 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<9}").parse().map_err(|_| invalid())?
        };

        // N.B. The sign applies to both parts, so "-0.5s" keeps its sign in
        // `nanos` even though `seconds` is zero.
        let duration = if negative {
            Duration {
                seconds: -seconds,
                nanos: -nanos,
            }
        } else {
            Duration { seconds, nanos }
        };
        if !duration.is_valid() {
            return Err(invalid());
        }
        Ok(duration)
    }
}

/// Shortest of 0, 3, 6 or 9 fractional digits that represents `nanos` exactly.
fn fraction(nanos: u32) -> String {
    if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    }
}

macro_rules! seconds_and_nanos {
    ($ty:ident, $partial:ident, $name:literal, $to_json:ident, $from_json:ident) => {
        impl Message for $ty {
            const NAME: &'static str = $name;
            type Partial = $partial;

            fn initialize(partial: $partial) -> Self {
                $ty {
                    seconds: partial.seconds.unwrap_or_default(),
                    nanos: partial.nanos.unwrap_or_default(),
                }
            }
        }

        impl BinaryCodec for $ty {
            fn encode_fields(&self, writer: &mut Writer) {
                if self.seconds != 0 {
                    writer.write_int64(1, self.seconds);
                }
                if self.nanos != 0 {
                    writer.write_int32(2, self.nanos);
                }
            }

            fn merge_fields(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
                while reader.next_field()? {
                    match reader.field_number() {
                        1 => self.seconds = reader.read_int64()?,
                        2 => self.nanos = reader.read_int32()?,
                        _ => reader.skip_field()?,
                    }
                }
                Ok(())
            }
        }

        impl JsonCodec for $ty {
            fn to_json(&self) -> Result<Value, EncodeError> {
                Ok(Value::String(self.$to_json()?))
            }

            fn merge_json(&mut self, value: &Value) -> Result<(), DecodeError> {
                let text = decode::string(value)?;
                *self = $ty::$from_json(&text)?;
                Ok(())
            }
        }
    };
}

seconds_and_nanos!(
    Timestamp,
    TimestampPartial,
    "google.protobuf.Timestamp",
    to_rfc3339,
    from_rfc3339
);
seconds_and_nanos!(
    Duration,
    DurationPartial,
    "google.protobuf.Duration",
    to_json_string,
    from_json_string
);

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_timestamp_format() {
        #[track_caller]
        fn test_case(seconds: i64, nanos: i32, expected: &str) {
            let timestamp = Timestamp::new(seconds, nanos);
            assert_eq!(timestamp.to_rfc3339().unwrap(), expected);
            assert_eq!(Timestamp::from_rfc3339(expected).unwrap(), timestamp);
        }

        test_case(0, 0, "1970-01-01T00:00:00Z");
        test_case(63_108_020, 21_000_000, "1972-01-01T10:00:20.021Z");
        test_case(1, 10_000, "1970-01-01T00:00:01.000010Z");
        test_case(1, 1, "1970-01-01T00:00:01.000000001Z");
        test_case(TIMESTAMP_MIN_SECONDS, 0, "0001-01-01T00:00:00Z");
        test_case(TIMESTAMP_MAX_SECONDS, 999_999_999, "9999-12-31T23:59:59.999999999Z");
    }

    #[test]
    fn test_timestamp_offsets_normalize_to_utc() {
        let timestamp = Timestamp::from_rfc3339("1970-01-01T01:00:00+01:00").unwrap();
        assert_eq!(timestamp, Timestamp::new(0, 0));
    }

    #[test]
    fn test_timestamp_out_of_range() {
        assert!(Timestamp::new(TIMESTAMP_MAX_SECONDS + 1, 0).to_rfc3339().is_err());
        assert!(Timestamp::new(TIMESTAMP_MIN_SECONDS - 1, 0).to_rfc3339().is_err());
        assert!(Timestamp::new(0, -1).to_rfc3339().is_err());
        assert!(Timestamp::new(0, NANOS_PER_SECOND).to_rfc3339().is_err());
        assert!(Timestamp::from_rfc3339("not a timestamp").is_err());
    }

    #[test]
    fn test_timestamp_shape() {
        #[track_caller]
        fn rejected(text: &str) {
            assert_eq!(
                Timestamp::from_rfc3339(text),
                Err(DecodeError::InvalidTimestamp {
                    value: text.to_string()
                })
            );
        }

        rejected("1970-01-01t00:00:00Z");
        rejected("1970-01-01T00:00:00z");
        rejected("1970-01-01 00:00:00Z");
        rejected("1970-01-01T00:00:00.0000000001Z");
        rejected("1970-01-01T00:00:00.Z");
        rejected("1970-01-01T00:00:00");
        rejected("1970-01-01T00:00:00+0100");

        assert_eq!(
            Timestamp::from_rfc3339("1970-01-01T00:00:00.000000001Z"),
            Ok(Timestamp::new(0, 1))
        );
        assert_eq!(
            Timestamp::from_rfc3339("1970-01-01T00:00:00-00:30"),
            Ok(Timestamp::new(1800, 0))
        );
    }

    #[test]
    fn test_duration_format() {
        #[track_caller]
        fn test_case(seconds: i64, nanos: i32, expected: &str) {
            let duration = Duration::new(seconds, nanos);
            assert_eq!(duration.to_json_string().unwrap(), expected);
            assert_eq!(Duration::from_json_string(expected).unwrap(), duration);
        }

        test_case(0, 0, "0s");
        test_case(1, 0, "1s");
        test_case(-1, -500_000_000, "-1.500s");
        test_case(0, -500_000_000, "-0.500s");
        test_case(0, 10_000, "0.000010s");
        test_case(3, 1, "3.000000001s");
        test_case(DURATION_MAX_SECONDS, 999_999_999, "315576000000.999999999s");
    }

    #[test]
    fn test_duration_parse() {
        assert_eq!(
            Duration::from_json_string("-0.5s").unwrap(),
            Duration::new(0, -500_000_000)
        );
        assert_eq!(
            Duration::from_json_string("1.5s").unwrap(),
            Duration::new(1, 500_000_000)
        );

        for bad in ["1", "s", "-s", "1.s", ".5s", "1.0000000001s", "1e3s", "315576000001s"] {
            assert!(Duration::from_json_string(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn test_duration_sign_mismatch() {
        assert!(Duration::new(1, -1).to_json_string().is_err());
        assert!(Duration::new(-1, 1).to_json_string().is_err());
    }

    #[test]
    fn test_binary_and_json() {
        let duration = Duration::new(-3, -1_000);
        let decoded = Duration::decode_binary(&duration.encode_binary()).unwrap();
        assert_eq!(decoded, duration);
        assert_eq!(duration.encode_json().unwrap(), "\"-3.000001s\"");

        assert!(Timestamp::default().encode_binary().is_empty());
        assert_eq!(
            Timestamp::decode_json("\"1970-01-01T00:00:01Z\"").unwrap(),
            Timestamp::new(1, 0)
        );
    }

    proptest! {
        #[test]
        fn proptest_duration_text_roundtrip(
            seconds in -DURATION_MAX_SECONDS..=DURATION_MAX_SECONDS,
            nanos in 0..NANOS_PER_SECOND,
        ) {
            let nanos = if seconds < 0 { -nanos } else { nanos };
            let duration = Duration::new(seconds, nanos);
            let text = duration.to_json_string().unwrap();
            prop_assert_eq!(Duration::from_json_string(&text).unwrap(), duration);
        }
    }
}
