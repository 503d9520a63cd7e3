//! Field checks shared by the form (before anything leaves the client) and the
//! gateway route (on the inbound payload).
//!
//! The two sides do not check the same thing. The form requires every scalar
//! field to be non-empty. The gateway only checks the five claim fields, and
//! uses JavaScript truthiness because the payload is arbitrary JSON: `0`,
//! `false`, `null` and `""` all count as missing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::draft::{ClaimDraft, ClaimField};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(ClaimField),

    #[error("Invalid estimatedAmount: {value:?} must be {rule}")]
    InvalidAmount { value: String, rule: AmountRule },
}

/// What `estimatedAmount` has to look like beyond being present.
///
/// `Any` keeps the historical behaviour: a present value is accepted even if it
/// is negative or not a number at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmountRule {
    #[default]
    Any,
    NonNegative,
    Positive,
}

impl AmountRule {
    pub fn check(&self, raw: &str, amount: Option<f64>) -> Result<(), ValidationError> {
        let ok = match self {
            AmountRule::Any => true,
            AmountRule::NonNegative => amount.is_some_and(|a| a.is_finite() && a >= 0.0),
            AmountRule::Positive => amount.is_some_and(|a| a.is_finite() && a > 0.0),
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidAmount {
                value: raw.to_string(),
                rule: *self,
            })
        }
    }
}

impl fmt::Display for AmountRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountRule::Any => f.write_str("any value"),
            AmountRule::NonNegative => f.write_str("a non-negative number"),
            AmountRule::Positive => f.write_str("a positive number"),
        }
    }
}

impl FromStr for AmountRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(AmountRule::Any),
            "non-negative" | "non_negative" | "nonnegative" => Ok(AmountRule::NonNegative),
            "positive" => Ok(AmountRule::Positive),
            other => Err(format!("unknown amount rule: {other}")),
        }
    }
}

/// Parse the leading decimal number of `raw`, the way `parseFloat` does.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `"12abc"` is
/// `12`. Returns `None` when there is no numeric prefix.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            mantissa_digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// `parseFloat` applied to an arbitrary JSON value
pub fn amount_from_value(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    };
    amount.filter(|a| !a.is_nan())
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Local gate run by the form before any network call
pub fn check_draft(draft: &ClaimDraft, rule: AmountRule) -> Result<(), ValidationError> {
    if let Some(field) = ClaimField::REQUIRED
        .into_iter()
        .find(|f| draft.get(*f).is_empty())
    {
        return Err(ValidationError::MissingField(field));
    }
    rule.check(
        &draft.estimated_amount,
        parse_amount(&draft.estimated_amount),
    )
}

/// Gateway-side check of an inbound payload. Stops at the first missing field.
pub fn check_payload(payload: &Value, rule: AmountRule) -> Result<(), ValidationError> {
    for field in ClaimField::SERVER_REQUIRED {
        if !payload.get(field.wire_name()).is_some_and(is_truthy) {
            return Err(ValidationError::MissingField(field));
        }
    }

    let raw = &payload[ClaimField::EstimatedAmount.wire_name()];
    let display = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    rule.check(&display, amount_from_value(raw))
}
