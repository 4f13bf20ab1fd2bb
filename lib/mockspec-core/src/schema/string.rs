use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat};
use rand::{Rng, RngCore};
use serde_json::Value;

use super::Schema;
use super::evolve::Evolution;
use crate::MockError;

/// Length of generated strings without `minLength`.
const DEFAULT_STRING_LENGTH: usize = 10;

/// Upper bound for unbounded repetitions (`*`, `+`) in patterns.
const MAX_PATTERN_REPEAT: u32 = 8;

/// Latest generated date, `2100-01-01T00:00:00Z` in milliseconds.
const MAX_TIMESTAMP_MILLIS: i64 = 4_102_444_800_000;

const TOP_LEVEL_DOMAINS: [&str; 6] = ["com", "net", "org", "io", "dev", "info"];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

impl Evolution<'_> {
    pub(super) fn evolve_string(&mut self, schema: &Schema) -> Result<Value, MockError> {
        if let Some(pattern) = &schema.pattern {
            return self.from_pattern(pattern).map(Value::String);
        }

        if let Some(value) = schema
            .format
            .as_deref()
            .and_then(|format| self.from_format(&format.to_ascii_lowercase(), schema))
        {
            return Ok(Value::String(value));
        }

        if let Some(values) = &schema.enum_values
            && let Some(value) = self.random.pick(values.len()).and_then(|index| values.get(index))
        {
            return Ok(value.clone());
        }

        let length = schema.min_length.unwrap_or(DEFAULT_STRING_LENGTH);
        let mut value = self.random.token(length);
        if let Some(max_length) = schema.max_length {
            value.truncate(max_length);
        }
        Ok(Value::String(value))
    }

    fn from_pattern(&mut self, pattern: &str) -> Result<String, MockError> {
        let invalid = |message: String| MockError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        };

        let unanchored = strip_anchors(pattern);
        let regex = rand_regex::Regex::compile(unanchored, MAX_PATTERN_REPEAT)
            .map_err(|err| invalid(err.to_string()))?;
        let bytes: Vec<u8> = self.random.rng().sample(&regex);
        String::from_utf8(bytes).map_err(|err| invalid(err.to_string()))
    }

    fn from_format(&mut self, format: &str, schema: &Schema) -> Option<String> {
        let value = match format {
            "byte" => {
                let raw = self.random.token(DEFAULT_STRING_LENGTH);
                STANDARD.encode(raw)
            }
            "binary" => self
                .random
                .bytes(4)
                .iter()
                .map(|octet| format!("{octet:b}"))
                .collect::<Vec<_>>()
                .join(" "),
            "uuid" => {
                let mut bytes = [0; 16];
                self.random.rng().fill_bytes(&mut bytes);
                uuid::Builder::from_random_bytes(bytes)
                    .into_uuid()
                    .to_string()
            }
            "email" => format!(
                "{}.{}@{}",
                self.random.word(),
                self.random.word(),
                self.domain_name()
            ),
            "password" => self.alphanumeric(15),
            "date" => self.date_time(schema).format("%Y-%m-%d").to_string(),
            "date-time" => self
                .date_time(schema)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            "uri" => format!("https://{}", self.domain_name()),
            "hostname" => self.domain_name(),
            "ipv4" => self
                .random
                .bytes(4)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("."),
            "ipv6" => (0..8)
                .map(|_| format!("{:04x}", self.random.uniform_int(0, 0xffff)))
                .collect::<Vec<_>>()
                .join(":"),
            "creditcard" => self.credit_card_number(),
            _ => return None,
        };
        Some(value)
    }

    fn date_time(&mut self, schema: &Schema) -> DateTime<chrono::Utc> {
        #[allow(clippy::cast_possible_truncation)]
        let max = schema
            .maximum
            .map_or(MAX_TIMESTAMP_MILLIS, |max| max as i64)
            .max(0);
        let millis = self.random.uniform_int(0, max);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }

    fn domain_name(&mut self) -> String {
        let tld = self
            .random
            .pick(TOP_LEVEL_DOMAINS.len())
            .and_then(|index| TOP_LEVEL_DOMAINS.get(index))
            .copied()
            .unwrap_or("com");
        format!("{}.{tld}", self.random.word())
    }

    fn alphanumeric(&mut self, length: usize) -> String {
        (0..length)
            .filter_map(|_| {
                let index = self.random.pick(ALPHANUMERIC.len())?;
                ALPHANUMERIC.get(index).copied().map(char::from)
            })
            .collect()
    }

    /// A 16 digit card number with a valid Luhn check digit.
    fn credit_card_number(&mut self) -> String {
        let mut digits = vec![4];
        digits.extend((0..14).map(|_| self.random.uniform_int(0, 9)));
        digits.push(luhn_check_digit(&digits));
        digits.iter().map(ToString::to_string).collect()
    }
}

fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}

fn luhn_check_digit(digits: &[i64]) -> i64 {
    let sum: i64 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(index, digit)| {
            if index % 2 == 0 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                *digit
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use regex::Regex;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::SchemaEvolver;

    static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+?Z$").expect("a valid regex")
    });

    fn evolve_string(schema: Value) -> String {
        let schema = Schema::from_value(schema).expect("should be a valid schema");
        let value = SchemaEvolver::seeded(11)
            .evolve(&schema)
            .expect("should evolve")
            .expect("should produce a value");
        value.as_str().expect("should be a string").to_string()
    }

    #[rstest]
    #[case::uuid("uuid", r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")]
    #[case::email("email", r"^[a-z]+\.[a-z]+@[a-z]+\.[a-z]+$")]
    #[case::password("password", r"^[A-Za-z0-9]{15}$")]
    #[case::date("date", r"^\d{4}-\d{2}-\d{2}$")]
    #[case::uri("uri", r"^https://[a-z]+\.[a-z]+$")]
    #[case::hostname("hostname", r"^[a-z]+\.[a-z]+$")]
    #[case::ipv4("ipv4", r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$")]
    #[case::ipv6("ipv6", r"^([0-9a-f]{4}:){7}[0-9a-f]{4}$")]
    #[case::binary("binary", r"^[01]+ [01]+ [01]+ [01]+$")]
    #[case::creditcard("creditcard", r"^4\d{15}$")]
    #[case::byte("byte", r"^[A-Za-z0-9+/]+=*$")]
    #[case::uppercase("UUID", r"^[0-9a-f]{8}-")]
    fn should_generate_known_formats(#[case] format: &str, #[case] expected: &str) {
        let value = evolve_string(json!({"type": "string", "format": format}));

        let regex = Regex::new(expected).expect("a valid regex");
        assert!(regex.is_match(&value), "{format}: {value}");
    }

    #[test]
    fn should_generate_iso_date_time() {
        let value = evolve_string(json!({"type": "string", "format": "date-time"}));

        assert!(DATE_TIME.is_match(&value), "{value}");
    }

    #[test]
    fn should_generate_luhn_valid_card_numbers() {
        let value = evolve_string(json!({"type": "string", "format": "creditcard"}));
        let digits = value
            .chars()
            .filter_map(|ch| ch.to_digit(10).map(i64::from))
            .collect::<Vec<_>>();

        let (payload, check) = digits.split_at(15);
        assert_eq!(check, [luhn_check_digit(payload)]);
    }

    #[test]
    fn should_decode_byte_format() {
        let value = evolve_string(json!({"type": "string", "format": "byte"}));
        let decoded = STANDARD.decode(value).expect("should be base64");

        assert_eq!(decoded.len(), DEFAULT_STRING_LENGTH);
    }

    #[rstest]
    #[case::digits(r"^\d{3}-\d{4}$")]
    #[case::unanchored("[A-Z]{2}[0-9]+")]
    #[case::alternation("^(cat|dog|bird)$")]
    #[case::escaped_dollar(r"^price: \d+\$")]
    fn should_match_pattern_in_full(#[case] pattern: &str) {
        let value = evolve_string(json!({"type": "string", "pattern": pattern, "format": "uuid"}));

        let anchored = format!("^(?:{})$", strip_anchors(pattern));
        let regex = Regex::new(&anchored).expect("a valid regex");
        assert!(regex.is_match(&value), "{pattern}: {value}");
    }

    #[test]
    fn should_reject_invalid_pattern() {
        let schema = Schema::from_value(json!({"type": "string", "pattern": "(unclosed"}))
            .expect("should be a valid schema");
        let error = SchemaEvolver::seeded(1)
            .evolve(&schema)
            .expect_err("should fail");

        assert!(matches!(error, MockError::InvalidPattern { .. }), "{error}");
    }

    #[test]
    fn should_pick_enum_member() {
        let value = evolve_string(json!({"type": "string", "enum": ["red", "green", "blue"]}));

        assert!(["red", "green", "blue"].contains(&value.as_str()));
    }

    #[test]
    fn should_prefer_format_over_enum() {
        let value = evolve_string(json!({"type": "string", "format": "ipv4", "enum": ["x"]}));

        assert_ne!(value, "x");
    }

    #[rstest]
    #[case::default(json!({"type": "string"}), 10, 10)]
    #[case::min(json!({"type": "string", "minLength": 24}), 24, 24)]
    #[case::max(json!({"type": "string", "maxLength": 4}), 0, 4)]
    #[case::both(json!({"type": "string", "minLength": 3, "maxLength": 6}), 3, 6)]
    fn should_honour_length_constraints(#[case] schema: Value, #[case] min: usize, #[case] max: usize) {
        let value = evolve_string(schema);

        assert!((min..=max).contains(&value.len()), "{value}");
        assert!(!value.chars().any(char::is_whitespace));
    }

    #[test]
    fn should_bound_dates_by_maximum() {
        let value = evolve_string(json!({"type": "string", "format": "date", "maximum": 86_400_000}));

        assert!(value == "1970-01-01" || value == "1970-01-02", "{value}");
    }

    #[test]
    fn should_strip_anchors() {
        assert_eq!(strip_anchors("^abc$"), "abc");
        assert_eq!(strip_anchors(r"abc\$"), r"abc\$");
        assert_eq!(strip_anchors("abc"), "abc");
    }
}
