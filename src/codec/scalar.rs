//! Text encoding of single field values
//!
//! Decoding is deliberately forgiving: text that does not parse as the
//! field's kind yields the kind's zero value.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};

/// A value that maps to one piece of text inside a tag.
pub trait Scalar: Default {
    /// Whether attribute values of this kind are quoted when the binding
    /// does not say otherwise.
    const QUOTED: bool = false;

    fn parse(text: &str) -> Self;

    fn format(&self) -> String;

    fn is_zero(&self) -> bool;
}

impl Scalar for bool {
    fn parse(text: &str) -> Self {
        !matches!(text, "" | "NO" | "FALSE")
    }

    fn format(&self) -> String {
        String::from(if *self { "YES" } else { "NO" })
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

macro_rules! integer_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            fn parse(text: &str) -> Self {
                text.trim().parse().unwrap_or_default()
            }

            fn format(&self) -> String {
                self.to_string()
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

integer_scalar!(u32, u64, i64);

impl Scalar for f64 {
    fn parse(text: &str) -> Self {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or_default()
    }

    fn format(&self) -> String {
        self.to_string()
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Scalar for String {
    const QUOTED: bool = true;

    fn parse(text: &str) -> Self {
        text.to_string()
    }

    fn format(&self) -> String {
        self.clone()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Comma separated list, e.g. `CODECS="avc1.4d401e,mp4a.40.2"`
impl Scalar for Vec<String> {
    const QUOTED: bool = true;

    fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Vec::new();
        }
        text.split(',').map(str::to_string).collect()
    }

    fn format(&self) -> String {
        self.join(",")
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Decimal seconds, e.g. `9.009`
impl Scalar for Duration {
    fn parse(text: &str) -> Self {
        parse_seconds(text)
    }

    fn format(&self) -> String {
        format_seconds(*self)
    }

    fn is_zero(&self) -> bool {
        *self == Duration::ZERO
    }
}

/// RFC 3339 with as many fractional digits as needed
impl Scalar for Option<DateTime<FixedOffset>> {
    const QUOTED: bool = true;

    fn parse(text: &str) -> Self {
        DateTime::parse_from_rfc3339(text.trim()).ok()
    }

    fn format(&self) -> String {
        self.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            .unwrap_or_default()
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// Parse decimal seconds. Negative, non-finite or malformed input is zero.
pub fn parse_seconds(text: &str) -> Duration {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or_default()
}

pub fn format_seconds(d: Duration) -> String {
    d.as_secs_f64().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool() {
        assert!(bool::parse("YES"));
        assert!(bool::parse("anything"));
        assert!(!bool::parse("NO"));
        assert!(!bool::parse("FALSE"));
        assert!(!bool::parse(""));
        assert_eq!(true.format(), "YES");
        assert_eq!(false.format(), "NO");
    }

    #[test]
    fn test_numbers_are_lenient() {
        assert_eq!(u64::parse("648224"), 648224);
        assert_eq!(u64::parse("12.5"), 0);
        assert_eq!(u32::parse("junk"), 0);
        assert_eq!(i64::parse("-3"), -3);
        assert_eq!(f64::parse("29.970"), 29.97);
        assert_eq!(f64::parse("NaN"), 0.0);
        assert_eq!(29.97f64.format(), "29.97");
    }

    #[test]
    fn test_seconds() {
        assert_eq!(parse_seconds("10"), Duration::from_secs(10));
        assert_eq!(parse_seconds("10.0"), Duration::from_secs(10));
        assert_eq!(parse_seconds("2.5"), Duration::from_millis(2500));
        assert_eq!(parse_seconds("-1"), Duration::ZERO);
        assert_eq!(parse_seconds(""), Duration::ZERO);
        assert_eq!(format_seconds(Duration::from_secs(10)), "10");
        assert_eq!(format_seconds(Duration::from_millis(8500)), "8.5");
    }

    #[test]
    fn test_list() {
        assert_eq!(
            Vec::<String>::parse("avc1.4d401e,mp4a.40.2"),
            vec!["avc1.4d401e", "mp4a.40.2"]
        );
        assert!(Vec::<String>::parse("").is_empty());
        assert_eq!(vec!["a".to_string(), "b".to_string()].format(), "a,b");
    }

    #[test]
    fn test_timestamp() {
        let t = Option::<DateTime<FixedOffset>>::parse("2021-01-11T07:59:41.005Z");
        assert!(t.is_some());
        assert_eq!(t.format(), "2021-01-11T07:59:41.005Z");
        assert_eq!(Option::<DateTime<FixedOffset>>::parse("yesterday"), None);
    }
}
