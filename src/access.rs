//! Typed reads and writes on a [`KeyFile`].
//!
//! Values are stored as text. Reading coerces the text to the requested
//! type through [`FromValueText`]; writing renders through [`ToValueText`].
//! Both are implemented for `i64`, `u64`, `i32`, `u32`, `f64`, `f32`,
//! `bool` and `String`.
//!
//! Coercion is strict: the whole text must parse, and a number outside the
//! target range is reported as [`KeyconfError::Overflow`] instead of being
//! truncated.
//!
//! Every getter has an `_or` twin taking a default. The default is returned
//! only when the group or key is missing; a present but malformed value is
//! still an error.

use std::num::IntErrorKind;

use crate::error::{KeyconfError, Result};
use crate::keyfile::{Entry, KeyFile, validate_group, validate_key};
use crate::scan::needs_quotes;
use crate::types::Value;

/// Why a stored text could not become the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceError {
    NotBoolean,
    NotNumber,
    OutOfRange,
}

/// Parse a stored value text.
pub trait FromValueText: Sized {
    /// Type name used in error messages.
    const TYPE_NAME: &'static str;

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError>;
}

/// Render a value as text for storage.
pub trait ToValueText {
    fn to_value_text(&self) -> String;
}

const TRUE_WORDS: [&str; 4] = ["true", "yes", "on", "1"];
const FALSE_WORDS: [&str; 4] = ["false", "no", "off", "0"];

fn int_error(e: &std::num::ParseIntError) -> CoerceError {
    match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CoerceError::OutOfRange,
        _ => CoerceError::NotNumber,
    }
}

fn spells_infinity(text: &str) -> bool {
    let bare = text.trim_start_matches(['+', '-']);
    bare.eq_ignore_ascii_case("inf") || bare.eq_ignore_ascii_case("infinity")
}

impl FromValueText for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        text.trim().parse::<i64>().map_err(|e| int_error(&e))
    }
}

impl FromValueText for u64 {
    const TYPE_NAME: &'static str = "u64";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let t = text.trim();
        if let Some(magnitude) = t.strip_prefix('-') {
            return match magnitude.parse::<u64>() {
                Ok(0) => Ok(0),
                Ok(_) => Err(CoerceError::OutOfRange),
                Err(e) => Err(int_error(&e)),
            };
        }
        t.parse::<u64>().map_err(|e| int_error(&e))
    }
}

impl FromValueText for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let wide = i64::from_value_text(text)?;
        i32::try_from(wide).map_err(|_| CoerceError::OutOfRange)
    }
}

impl FromValueText for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let wide = u64::from_value_text(text)?;
        u32::try_from(wide).map_err(|_| CoerceError::OutOfRange)
    }
}

impl FromValueText for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let t = text.trim();
        let v: f64 = t.parse().map_err(|_| CoerceError::NotNumber)?;
        if v.is_infinite() && !spells_infinity(t) {
            return Err(CoerceError::OutOfRange);
        }
        Ok(v)
    }
}

impl FromValueText for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let t = text.trim();
        let v: f32 = t.parse().map_err(|_| CoerceError::NotNumber)?;
        if v.is_infinite() && !spells_infinity(t) {
            return Err(CoerceError::OutOfRange);
        }
        Ok(v)
    }
}

impl FromValueText for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        let t = text.trim();
        if TRUE_WORDS.iter().any(|w| t.eq_ignore_ascii_case(w)) {
            Ok(true)
        } else if FALSE_WORDS.iter().any(|w| t.eq_ignore_ascii_case(w)) {
            Ok(false)
        } else {
            Err(CoerceError::NotBoolean)
        }
    }
}

impl FromValueText for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value_text(text: &str) -> std::result::Result<Self, CoerceError> {
        Ok(text.to_string())
    }
}

macro_rules! display_to_text {
    ($($t:ty),*) => {
        $(impl ToValueText for $t {
            fn to_value_text(&self) -> String {
                self.to_string()
            }
        })*
    };
}

display_to_text!(i64, u64, i32, u32, bool, String, &str);

// `{:?}` is the shortest representation that parses back to the same bits.
impl ToValueText for f64 {
    fn to_value_text(&self) -> String {
        format!("{self:?}")
    }
}

impl ToValueText for f32 {
    fn to_value_text(&self) -> String {
        format!("{self:?}")
    }
}

fn coerce_error(e: CoerceError, group: &str, key: &str, value: &str, target: &'static str) -> KeyconfError {
    let (group, key, value) = (group.to_string(), key.to_string(), value.to_string());
    match e {
        CoerceError::NotBoolean => KeyconfError::WrongBooleanValue { group, key, value },
        CoerceError::NotNumber => KeyconfError::InvalidNumber {
            group,
            key,
            value,
            target,
        },
        CoerceError::OutOfRange => KeyconfError::Overflow {
            group,
            key,
            value,
            target,
        },
    }
}

macro_rules! typed_accessors {
    ($($t:ty => $get:ident, $get_or:ident, $set:ident;)*) => {
        impl KeyFile {
            $(
                #[doc = concat!("Read `(group, key)` as `", stringify!($t), "`.")]
                pub fn $get(&self, group: &str, key: &str) -> Result<$t> {
                    self.get::<$t>(group, key)
                }

                #[doc = concat!("Like [`KeyFile::", stringify!($get), "`], returning `default` for a missing group or key.")]
                pub fn $get_or(&self, group: &str, key: &str, default: $t) -> Result<$t> {
                    self.get_or::<$t>(group, key, default)
                }

                #[doc = concat!("Store a `", stringify!($t), "` under `(group, key)`.")]
                pub fn $set(&mut self, group: &str, key: &str, value: $t) -> Result<()> {
                    self.set(group, key, value)
                }
            )*
        }
    };
}

typed_accessors! {
    i64 => get_int, get_int_or, set_int;
    u64 => get_uint, get_uint_or, set_uint;
    f64 => get_float, get_float_or, set_float;
    i32 => get_int32, get_int32_or, set_int32;
    u32 => get_uint32, get_uint32_or, set_uint32;
    f32 => get_float32, get_float32_or, set_float32;
    bool => get_bool, get_bool_or, set_bool;
}

impl KeyFile {
    /// Read `(group, key)` as any [`FromValueText`] type.
    pub fn get<T: FromValueText>(&self, group: &str, key: &str) -> Result<T> {
        let entry = self.entry(group, key)?;
        T::from_value_text(entry.value())
            .map_err(|e| coerce_error(e, group, key, entry.value(), T::TYPE_NAME))
    }

    /// Like [`KeyFile::get`], but a missing group or key yields `default`.
    /// Every other error still propagates.
    pub fn get_or<T: FromValueText>(&self, group: &str, key: &str, default: T) -> Result<T> {
        match self.get(group, key) {
            Err(e) if e.is_missing_entry() => Ok(default),
            other => other,
        }
    }

    /// Store any [`ToValueText`] value.
    ///
    /// An existing entry is rewritten in place; a new one is appended to its
    /// group (creating the group if needed). Fails only for group or key
    /// names that could not be written back.
    pub fn set<T: ToValueText>(&mut self, group: &str, key: &str, value: T) -> Result<()> {
        validate_group(group)?;
        validate_key(key, self.comment_marker())?;
        let text = value.to_value_text();
        // Multi-line text is quoted by preference, not necessity.
        let quote = text.contains('\n') || needs_quotes(&text, self.comment_marker());
        match self.find_mut(group, key) {
            Some(entry) => {
                let quoted = entry.is_quoted() || quote;
                entry.set_text(text, quoted);
            }
            None => {
                self.upsert(group, Entry::new(key.to_string(), text, quote, 0));
            }
        }
        Ok(())
    }

    pub fn get_string(&self, group: &str, key: &str) -> Result<String> {
        self.get::<String>(group, key)
    }

    /// Borrowing variant of [`KeyFile::get_string`].
    pub fn get_str(&self, group: &str, key: &str) -> Result<&str> {
        Ok(self.entry(group, key)?.value())
    }

    pub fn get_string_or(&self, group: &str, key: &str, default: &str) -> Result<String> {
        self.get_or::<String>(group, key, default.to_string())
    }

    pub fn set_string(&mut self, group: &str, key: &str, value: &str) -> Result<()> {
        self.set(group, key, value)
    }

    /// Store a [`Value`], dispatching on its variant. Non-negative integers
    /// are stored through the unsigned path, negative ones through the
    /// signed path.
    pub fn set_value(&mut self, group: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        match value.into() {
            Value::Int(v) => match u64::try_from(v) {
                Ok(u) => self.set_uint(group, key, u),
                Err(_) => self.set_int(group, key, v),
            },
            Value::UInt(v) => self.set_uint(group, key, v),
            Value::Float(v) => self.set_float(group, key, v),
            Value::Bool(v) => self.set_bool(group, key, v),
            Value::String(v) => self.set_string(group, key, &v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::test::EXAMPLE;
    use crate::parse::parse_str;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn example() -> KeyFile {
        parse_str(EXAMPLE, '=', '#').unwrap()
    }

    fn with_value(text: &str) -> KeyFile {
        parse_str(&format!("[G]\nk = {text}\n"), '=', '#').unwrap()
    }

    #[test]
    fn reads_typed_values_from_example() {
        let kf = example();
        assert_eq!(kf.get_int("Group", "Bla").unwrap(), 12311);
        assert_eq!(kf.get_uint("Group", "Answer").unwrap(), 42);
        assert_eq!(kf.get_string("Group", "Name").unwrap(), "A quoted\tname");
        assert!(kf.get_bool("First Group", "Enabled").unwrap());
        assert_eq!(kf.get_float("Another Group", "Ratio").unwrap(), 0.5);
        assert_eq!(kf.get_str("", "Welcome").unwrap(), "Hello");
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("yes", true)]
    #[case("On", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("No", false)]
    #[case("off", false)]
    #[case("0", false)]
    #[case("\" yes \"", true)]
    fn boolean_vocabulary(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(with_value(text).get_bool("G", "k").unwrap(), expected);
    }

    #[rstest]
    #[case("maybe")]
    #[case("2")]
    #[case("truee")]
    fn boolean_rejects_other_words(#[case] text: &str) {
        let err = with_value(text).get_bool("G", "k").unwrap_err();
        assert!(matches!(err, KeyconfError::WrongBooleanValue { .. }));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[rstest]
    #[case("99999999999999999999")]
    #[case("-99999999999999999999")]
    fn int_overflow(#[case] text: &str) {
        let err = with_value(text).get_int("G", "k").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[rstest]
    #[case("12abc")]
    #[case("1.5")]
    #[case("0x10")]
    #[case("\"\"")]
    fn int_rejects_trailing_garbage(#[case] text: &str) {
        let err = with_value(text).get_int("G", "k").unwrap_err();
        assert!(matches!(err, KeyconfError::InvalidNumber { target: "i64", .. }));
    }

    #[test]
    fn unsigned_rejects_negative_as_overflow() {
        let err = with_value("-5").get_uint("G", "k").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(with_value("-0").get_uint("G", "k").unwrap(), 0);
        assert_eq!(
            with_value("18446744073709551615").get_uint("G", "k").unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn narrow_types_are_range_checked() {
        let kf = with_value("4294967296");
        assert_eq!(kf.get_uint("G", "k").unwrap(), 4_294_967_296);
        assert_eq!(kf.get_uint32("G", "k").unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(kf.get_int32("G", "k").unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(with_value("-2147483648").get_int32("G", "k").unwrap(), i32::MIN);
        assert_eq!(
            with_value("1e39").get_float32("G", "k").unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn float_overflow_vs_spelled_infinity() {
        assert_eq!(
            with_value("1e400").get_float("G", "k").unwrap_err().kind(),
            ErrorKind::Overflow
        );
        assert!(with_value("-inf").get_float("G", "k").unwrap().is_infinite());
    }

    #[test]
    fn missing_group_or_key_is_not_found() {
        let kf = example();
        let err = kf.get_int("NoSuchGroup", "k").unwrap_err();
        assert!(matches!(err, KeyconfError::NoGroup(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = kf.get_int("Group", "missing").unwrap_err();
        assert!(matches!(err, KeyconfError::NoKey { .. }));
    }

    #[test]
    fn defaults_absorb_only_missing_entries() {
        let kf = example();
        assert_eq!(kf.get_int_or("NoSuchGroup", "k", 7).unwrap(), 7);
        assert_eq!(kf.get_int_or("Group", "missing", 8).unwrap(), 8);
        assert_eq!(kf.get_int_or("Group", "Bla", 0).unwrap(), 12311);
        assert_eq!(kf.get_string_or("Group", "nope", "dflt").unwrap(), "dflt");
        assert!(kf.get_bool_or("NoSuchGroup", "k", true).unwrap());

        // Present but malformed still fails.
        let err = kf.get_bool_or("", "Welcome", false).unwrap_err();
        assert!(matches!(err, KeyconfError::WrongBooleanValue { .. }));
        let err = kf.get_uint_or("", "Welcome", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn setters_round_trip() {
        let mut kf = KeyFile::new_ini();
        kf.set_int("N", "neg", i64::MIN).unwrap();
        kf.set_uint("N", "big", u64::MAX).unwrap();
        kf.set_float("N", "tiny", 1e-300).unwrap();
        kf.set_float("N", "third", 1.0 / 3.0).unwrap();
        kf.set_float32("N", "f32", 0.1).unwrap();
        kf.set_bool("N", "flag", true).unwrap();
        kf.set_string("N", "text", "  spaced\nout \"q\" ").unwrap();
        kf.set_int32("N", "i32", -7).unwrap();
        kf.set_uint32("N", "u32", u32::MAX).unwrap();

        assert_eq!(kf.get_int("N", "neg").unwrap(), i64::MIN);
        assert_eq!(kf.get_uint("N", "big").unwrap(), u64::MAX);
        assert_eq!(kf.get_float("N", "tiny").unwrap().to_bits(), 1e-300f64.to_bits());
        assert_eq!(kf.get_float("N", "third").unwrap(), 1.0 / 3.0);
        assert_eq!(kf.get_float32("N", "f32").unwrap(), 0.1f32);
        assert!(kf.get_bool("N", "flag").unwrap());
        assert_eq!(kf.get_string("N", "text").unwrap(), "  spaced\nout \"q\" ");
        assert_eq!(kf.get_int32("N", "i32").unwrap(), -7);
        assert_eq!(kf.get_uint32("N", "u32").unwrap(), u32::MAX);
    }

    #[test]
    fn set_existing_keeps_position() {
        let mut kf = example();
        kf.set_int("Group", "Bla", 1).unwrap();
        assert_eq!(kf.keys("Group").unwrap(), vec!["Bla", "Answer", "Name"]);
        assert_eq!(kf.get_int("Group", "Bla").unwrap(), 1);
    }

    #[test]
    fn set_new_key_appends() {
        let mut kf = example();
        kf.set_string("Group", "Extra", "x").unwrap();
        kf.set_string("Brand New", "k", "v").unwrap();
        assert_eq!(kf.keys("Group").unwrap().last(), Some(&"Extra"));
        assert_eq!(kf.groups().unwrap().last(), Some(&"Brand New"));
    }

    #[test]
    fn set_quotes_only_when_needed() {
        let mut kf = KeyFile::new_ini();
        kf.set_string("G", "plain", "value").unwrap();
        kf.set_string("G", "empty", "").unwrap();
        kf.set_string("G", "padded", " x").unwrap();
        kf.set_string("G", "commented", "80 # http").unwrap();
        kf.set_string("G", "color", "#fff").unwrap();
        assert!(!kf.entry("G", "plain").unwrap().is_quoted());
        assert!(kf.entry("G", "empty").unwrap().is_quoted());
        assert!(kf.entry("G", "padded").unwrap().is_quoted());
        assert!(kf.entry("G", "commented").unwrap().is_quoted());
        assert!(!kf.entry("G", "color").unwrap().is_quoted());
    }

    #[test]
    fn rewrite_keeps_quoted_style() {
        let mut kf = example();
        kf.set_string("Group", "Name", "plain").unwrap();
        assert!(kf.entry("Group", "Name").unwrap().is_quoted());
    }

    #[test]
    fn set_rejects_unwritable_names() {
        let mut kf = KeyFile::new_ini();
        assert_eq!(kf.set_int("G", "", 1).unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(kf.set_int("G]", "k", 1).unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(kf.set_int("G", "#k", 1).unwrap_err().kind(), ErrorKind::Usage);
        assert!(kf.is_empty());
    }

    #[test]
    fn set_value_dispatches_on_variant() {
        let mut kf = KeyFile::new_ini();
        kf.set_value("G", "neg", -3i64).unwrap();
        kf.set_value("G", "pos", 3i64).unwrap();
        kf.set_value("G", "float", 2.5f64).unwrap();
        kf.set_value("G", "flag", false).unwrap();
        kf.set_value("G", "name", "text").unwrap();

        assert_eq!(kf.get_int("G", "neg").unwrap(), -3);
        assert_eq!(kf.get_uint("G", "pos").unwrap(), 3);
        assert_eq!(kf.get_float("G", "float").unwrap(), 2.5);
        assert!(!kf.get_bool("G", "flag").unwrap());
        assert_eq!(kf.get_string("G", "name").unwrap(), "text");
    }

    #[test]
    fn set_value_from_serde_source() {
        let values: Vec<Value> = serde_json::from_str(r#"[-1, 18446744073709551615, 0.25, true, "s"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(-1),
                Value::UInt(u64::MAX),
                Value::Float(0.25),
                Value::Bool(true),
                Value::String("s".into()),
            ]
        );

        let mut kf = KeyFile::new_ini();
        for (i, v) in values.into_iter().enumerate() {
            kf.set_value("J", &format!("k{i}"), v).unwrap();
        }
        assert_eq!(kf.get_uint("J", "k1").unwrap(), u64::MAX);
        assert!(kf.get_bool("J", "k3").unwrap());
    }

    #[test]
    fn unsupported_serde_shapes_are_rejected() {
        assert!(serde_json::from_str::<Value>("null").is_err());
        assert!(serde_json::from_str::<Value>("[1, 2]").is_err());
        assert!(serde_json::from_str::<Value>(r#"{"a": 1}"#).is_err());
    }
}
