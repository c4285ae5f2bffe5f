//! Typed settings applier: untyped text in, typed field write out.
//!
//! [`apply_raw`] interprets one raw query-string value against one field of
//! the [`Settings`] record:
//!
//! | Field kind              | Raw value present                        | Raw value absent |
//! |-------------------------|------------------------------------------|------------------|
//! | integer / float / double | parse, write on success, else `ParseFailed` | `Skipped`     |
//! | text                    | assigned verbatim                         | `Skipped`        |
//! | boolean                 | `true` iff it equals `ON` ignoring case   | `Skipped`        |
//!
//! # Legacy 0/1 contract
//!
//! Older callers only understood "0 = nothing supplied, 1 = change attempted".
//! In that contract an unparseable number still answered 1 even though the
//! field kept its old value.  [`ApplyOutcome::legacy_code`] reproduces those
//! codes for callers that still depend on them; new code matches on
//! [`ApplyOutcome`] directly.

use serde::Serialize;
use thiserror::Error;

use super::fields::{Accessor, FieldDescriptor};
use super::schema::Settings;

/// Result of applying one raw value to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The field was written.
    Applied,
    /// No value was supplied; the field was not touched.
    Skipped,
    /// A value was supplied but could not be parsed as the field's type; the
    /// field kept its previous value.
    ParseFailed,
}

impl ApplyOutcome {
    /// The legacy 0/1 code: `0` only when no value was supplied.
    pub fn legacy_code(self) -> u8 {
        match self {
            ApplyOutcome::Skipped => 0,
            ApplyOutcome::Applied | ApplyOutcome::ParseFailed => 1,
        }
    }

    pub fn is_applied(self) -> bool {
        self == ApplyOutcome::Applied
    }
}

/// Errors raised when addressing settings by name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown settings field: {0}")]
    UnknownField(String),
}

/// Applies `raw` to `field` inside `settings`.
pub fn apply_raw(settings: &mut Settings, field: &FieldDescriptor, raw: Option<&str>) -> ApplyOutcome {
    let Some(raw) = raw else {
        return ApplyOutcome::Skipped;
    };

    match field.accessor {
        Accessor::Integer { set, .. } => match raw.trim().parse::<i32>() {
            Ok(v) => {
                set(settings, v);
                ApplyOutcome::Applied
            }
            Err(_) => ApplyOutcome::ParseFailed,
        },
        Accessor::Float { set, .. } => match parse_finite::<f32>(raw) {
            Some(v) => {
                set(settings, v);
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::ParseFailed,
        },
        Accessor::Double { set, .. } => match parse_finite::<f64>(raw) {
            Some(v) => {
                set(settings, v);
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::ParseFailed,
        },
        Accessor::Text { set, .. } => {
            set(settings, raw.to_string());
            ApplyOutcome::Applied
        }
        Accessor::Boolean { set, .. } => {
            set(settings, raw.eq_ignore_ascii_case("on"));
            ApplyOutcome::Applied
        }
    }
}

/// Parses a floating-point value, rejecting NaN and infinities.
///
/// `str::parse` is locale-independent: the decimal separator is always `.`.
fn parse_finite<T>(raw: &str) -> Option<T>
where
    T: std::str::FromStr + Into<f64> + Copy,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|v| (*v).into().is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
