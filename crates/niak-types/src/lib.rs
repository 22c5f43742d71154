//! Validated primitives shared by the NIAK option crates.
//!
//! - [`Label`]: a session, scan or subject name.
//! - [`Flag`]: an on/off switch stored as the integer `0` or `1`.
//! - [`Real`]: a float parameter that may be `+Inf`, written on the wire as [`INF_SENTINEL`].
//! - [`number`]: serialisers writing whole-valued floats as integers.

use serde::de::{self, Visitor};
use std::fmt;

/// Wire string standing in for positive infinity.
pub const INF_SENTINEL: &str = "_Inf_";

/// Errors that can occur when creating a [`Label`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LabelError {
    /// The input was empty or contained only whitespace
    #[error("label cannot be empty")]
    Empty,
    #[error("label exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    #[error("label '{0}' contains invalid characters (only alphanumeric, '_', '-' allowed)")]
    InvalidCharacters(String),
}

/// A non-empty name for a session (`session1`), a scan (`motor`, `rest`) or a subject
/// (`subject1`, `sub-0001`).
///
/// The input is trimmed on construction and restricted to ASCII alphanumerics, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    pub const MAX_LEN: usize = 64;

    /// Creates a new `Label`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError`] if the trimmed input is empty, longer than [`Label::MAX_LEN`],
    /// or contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(input: impl AsRef<str>) -> Result<Self, LabelError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LabelError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(LabelError::TooLong { max: Self::MAX_LEN });
        }
        let ok = trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'));
        if !ok {
            return Err(LabelError::InvalidCharacters(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Builds a label from a hard-coded name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid label.
    pub fn from_static(name: &'static str) -> Self {
        match Self::new(name) {
            Ok(label) => label,
            Err(err) => panic!("invalid static label {name:?}: {err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the label can be used as an Octave struct field name.
    pub fn is_octave_identifier(&self) -> bool {
        is_octave_identifier(&self.0)
    }
}

/// Octave field names start with a letter and continue with letters, digits or `_`.
pub fn is_octave_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        _ => false,
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Label::new(&s).map_err(de::Error::custom)
    }
}

/// An on/off processing switch.
///
/// NIAK reads flags as numbers, so a `Flag` always serialises as `0` or `1`. Booleans are
/// accepted when reading so hand-written YAML can say `true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag(bool);

impl Flag {
    pub const ON: Flag = Flag(true);
    pub const OFF: Flag = Flag(false);

    pub fn is_on(self) -> bool {
        self.0
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Flag(value)
    }
}

impl serde::Serialize for Flag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(u8::from(self.0))
    }
}

struct FlagVisitor;

impl Visitor<'_> for FlagVisitor {
    type Value = Flag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0, 1, true or false")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Flag, E> {
        Ok(Flag(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Flag, E> {
        match v {
            0 => Ok(Flag::OFF),
            1 => Ok(Flag::ON),
            other => Err(E::invalid_value(de::Unexpected::Unsigned(other), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Flag, E> {
        match v {
            0 => Ok(Flag::OFF),
            1 => Ok(Flag::ON),
            other => Err(E::invalid_value(de::Unexpected::Signed(other), &self)),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Flag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(FlagVisitor)
    }
}

/// `serialize_with` helpers for plain `f64` parameters.
///
/// Whole values are written as integers, so `6.0` goes out as `6` and `[3.0, 3.0, 3.0]` as
/// `[3, 3, 3]`. Reading is unaffected since integers deserialise into `f64`.
pub mod number {
    use serde::ser::{Serialize, SerializeTuple, Serializer};

    /// Largest magnitude below which every whole `f64` is an exact `i64`.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    struct Whole(f64);

    impl Serialize for Whole {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serialize(&self.0, serializer)
        }
    }

    pub fn serialize_array<S: Serializer, const N: usize>(
        values: &[f64; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for value in values {
            tuple.serialize_element(&Whole(*value))?;
        }
        tuple.end()
    }
}

/// Errors that can occur when creating a [`Real`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RealError {
    #[error("value is not a number")]
    NotANumber,
    #[error("negative infinity is not supported")]
    NegativeInfinity,
}

/// A float parameter that may be positive infinity (for example a low-pass cut-off that
/// disables the filter).
///
/// Finite values serialise as numbers and `+Inf` serialises as [`INF_SENTINEL`], so the value
/// survives JSON, which has no infinity literal.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Real(f64);

impl Real {
    pub const INFINITY: Real = Real(f64::INFINITY);

    /// Creates a new `Real`.
    ///
    /// # Errors
    ///
    /// Returns [`RealError`] for NaN or negative infinity.
    pub fn new(value: f64) -> Result<Self, RealError> {
        if value.is_nan() {
            return Err(RealError::NotANumber);
        }
        if value == f64::NEG_INFINITY {
            return Err(RealError::NegativeInfinity);
        }
        Ok(Self(value))
    }

    /// Builds a `Real` from a hard-coded value.
    ///
    /// # Panics
    ///
    /// Panics on NaN or negative infinity.
    pub fn from_static(value: f64) -> Self {
        match Self::new(value) {
            Ok(real) => real,
            Err(err) => panic!("invalid static real {value}: {err}"),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self.0.is_infinite()
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str(INF_SENTINEL)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl serde::Serialize for Real {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.is_infinite() {
            serializer.serialize_str(INF_SENTINEL)
        } else {
            number::serialize(&self.0, serializer)
        }
    }
}

struct RealVisitor;

impl Visitor<'_> for RealVisitor {
    type Value = Real;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a number or the string \"{INF_SENTINEL}\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Real, E> {
        Real::new(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Real, E> {
        Ok(Real(v as f64))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Real, E> {
        Ok(Real(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Real, E> {
        if v == INF_SENTINEL {
            Ok(Real::INFINITY)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

impl<'de> serde::Deserialize<'de> for Real {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(RealVisitor)
    }
}
