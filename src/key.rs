use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of positions per mode on the wheel.
pub const WHEEL_SIZE: u8 = 12;

/// Seed key used whenever a caller gives none, or untrusted input fails to parse.
pub const DEFAULT_KEY: OpenKey = OpenKey {
    number: 8,
    mode: Mode::Minor,
};

/// Open Key mode. `m` marks minor keys and `d` marks major keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "m")]
    Minor,
    #[serde(rename = "d")]
    Major,
}

impl Mode {
    pub fn letter(self) -> char {
        match self {
            Self::Minor => 'm',
            Self::Major => 'd',
        }
    }

    /// Canonical letters plus the Camelot `a`/`b` aliases, any case.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'm' | 'a' => Some(Self::Minor),
            'd' | 'b' => Some(Self::Major),
            _ => None,
        }
    }
}

/// A position on the 24-slot Open Key wheel.
///
/// `number` is always in `1..=12`: every constructor wraps it with 1-based
/// modular arithmetic, and deserialization rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct OpenKey {
    number: u8,
    #[serde(rename = "letter")]
    mode: Mode,
}

#[derive(Deserialize)]
struct RawKey {
    number: i64,
    letter: Mode,
}

impl TryFrom<RawKey> for OpenKey {
    type Error = String;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        if !(1..=WHEEL_SIZE as i64).contains(&raw.number) {
            return Err(format!("key number {} out of range 1-12", raw.number));
        }
        Ok(Self {
            number: raw.number as u8,
            mode: raw.letter,
        })
    }
}

impl OpenKey {
    /// Build a key, wrapping `number` onto the wheel (`0` becomes `12`, `13` becomes `1`).
    pub const fn new(number: i32, mode: Mode) -> Self {
        Self {
            number: wrap_number(number),
            mode,
        }
    }

    pub const fn minor(number: i32) -> Self {
        Self::new(number, Mode::Minor)
    }

    pub const fn major(number: i32) -> Self {
        Self::new(number, Mode::Major)
    }

    pub fn number(self) -> u8 {
        self.number
    }

    pub fn mode(self) -> Mode {
        self.mode
    }

    /// Move `delta` positions around the wheel, keeping the mode.
    pub fn shift(self, delta: i32) -> Self {
        Self::new(self.number as i32 + delta, self.mode)
    }

    /// Same number, other letter.
    pub fn with_mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    pub fn parse(text: &str) -> Option<Self> {
        parse_key(text)
    }
}

impl fmt::Display for OpenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode.letter())
    }
}

const fn wrap_number(value: i32) -> u8 {
    let size = WHEEL_SIZE as i32;
    ((value - 1).rem_euclid(size) + 1) as u8
}

/// Parse `"8m"`, `"12d"`, or the Camelot forms `"8A"`/`"8b"`.
///
/// Input longer than three bytes is rejected before trimming, so `" 8m"`
/// parses but `" 8m "` does not.
pub fn parse_key(text: &str) -> Option<OpenKey> {
    if text.is_empty() || text.len() > 3 {
        return None;
    }
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next_back()?;
    let digits = chars.as_str();
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mode = Mode::from_letter(letter)?;
    let number: u8 = digits.parse().ok()?;
    if !(1..=WHEEL_SIZE).contains(&number) {
        return None;
    }
    Some(OpenKey { number, mode })
}

pub fn format_key(key: OpenKey) -> String {
    key.to_string()
}

/// Structural check for keys rehydrated from untyped JSON:
/// `{"number": 1..=12, "letter": "m" | "d"}`.
pub fn is_key(value: &serde_json::Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let number_ok = object
        .get("number")
        .and_then(serde_json::Value::as_i64)
        .is_some_and(|n| (1..=WHEEL_SIZE as i64).contains(&n));
    let letter_ok = matches!(
        object.get("letter").and_then(serde_json::Value::as_str),
        Some("m" | "d")
    );
    number_ok && letter_ok
}

/// Accept either a structurally valid key object or parsable key text.
pub fn key_from_value(value: &serde_json::Value) -> Option<OpenKey> {
    if is_key(value) {
        return serde_json::from_value(value.clone()).ok();
    }
    value.as_str().and_then(parse_key)
}

/// All 24 keys: `1m..12m`, then `1d..12d`.
pub fn all_keys() -> Vec<OpenKey> {
    [Mode::Minor, Mode::Major]
        .into_iter()
        .flat_map(|mode| (1..=WHEEL_SIZE as i32).map(move |number| OpenKey::new(number, mode)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_canonical_and_camelot_letters() {
        assert_eq!(parse_key("8m"), Some(OpenKey::minor(8)));
        assert_eq!(parse_key("12d"), Some(OpenKey::major(12)));
        assert_eq!(parse_key("8A"), Some(OpenKey::minor(8)));
        assert_eq!(parse_key("8b"), Some(OpenKey::major(8)));
        assert_eq!(parse_key("1M"), Some(OpenKey::minor(1)));
        assert_eq!(parse_key("01d"), Some(OpenKey::major(1)));
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "0d", "13m", "d1", "8x", "m", "123", "8mm", "  8m", "8m  ", "１m"] {
            assert_eq!(parse_key(text), None, "expected {text:?} to be rejected");
        }
    }

    #[test]
    fn trims_within_length_bound() {
        assert_eq!(parse_key(" 8m"), Some(OpenKey::minor(8)));
        assert_eq!(parse_key("9d "), Some(OpenKey::major(9)));
    }

    #[test]
    fn format_round_trips_every_key() {
        for key in all_keys() {
            let text = format_key(key);
            assert_eq!(text, text.to_lowercase());
            assert_eq!(parse_key(&text), Some(key), "round trip failed for {text}");
        }
    }

    #[test]
    fn all_keys_groups_minor_then_major() {
        let keys = all_keys();
        assert_eq!(keys.len(), 24);
        assert!(keys[..12].iter().all(|k| k.mode() == Mode::Minor));
        assert!(keys[12..].iter().all(|k| k.mode() == Mode::Major));
        let numbers: Vec<u8> = keys[..12].iter().map(|k| k.number()).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn constructors_wrap_around_the_wheel() {
        assert_eq!(OpenKey::minor(0).number(), 12);
        assert_eq!(OpenKey::minor(13).number(), 1);
        assert_eq!(OpenKey::major(-3).number(), 9);
        assert_eq!(OpenKey::minor(12).shift(1), OpenKey::minor(1));
        assert_eq!(OpenKey::minor(1).shift(-1), OpenKey::minor(12));
        assert_eq!(OpenKey::minor(8).shift(7), OpenKey::minor(3));
    }

    #[test]
    fn is_key_checks_shape() {
        assert!(is_key(&json!({ "number": 8, "letter": "m" })));
        assert!(is_key(&json!({ "number": 12, "letter": "d" })));
        assert!(!is_key(&json!({ "number": 13, "letter": "m" })));
        assert!(!is_key(&json!({ "number": 8, "letter": "a" })));
        assert!(!is_key(&json!({ "number": "8", "letter": "m" })));
        assert!(!is_key(&json!({ "letter": "m" })));
        assert!(!is_key(&json!("8m")));
        assert!(!is_key(&json!(null)));
    }

    #[test]
    fn key_from_value_accepts_object_or_text() {
        assert_eq!(
            key_from_value(&json!({ "number": 3, "letter": "d" })),
            Some(OpenKey::major(3))
        );
        assert_eq!(key_from_value(&json!("3A")), Some(OpenKey::minor(3)));
        assert_eq!(key_from_value(&json!(42)), None);
        assert_eq!(key_from_value(&json!("nope")), None);
    }

    #[test]
    fn serde_uses_number_and_letter() {
        let value = serde_json::to_value(OpenKey::minor(8)).unwrap();
        assert_eq!(value, json!({ "number": 8, "letter": "m" }));
        let back: OpenKey = serde_json::from_value(value).unwrap();
        assert_eq!(back, OpenKey::minor(8));
        assert!(serde_json::from_value::<OpenKey>(json!({ "number": 0, "letter": "m" })).is_err());
    }
}
