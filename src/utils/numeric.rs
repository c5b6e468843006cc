use ethers::types::U256;
use serde_json::Value;
use thiserror::Error;

/// Exponents beyond this are rejected instead of expanded digit by digit.
const MAX_EXPONENT: u64 = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("value is empty")]
    Empty,
    #[error("'{0}' is not a number")]
    Malformed(String),
    #[error("'{0}' is negative")]
    Negative(String),
    #[error("'{0}' is not an integer")]
    Fractional(String),
    #[error("'{0}' is out of range")]
    Overflow(String),
    #[error("expected a number or a numeric string")]
    NotNumeric,
}

/// A number expanded into plain decimal digits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Expanded {
    negative: bool,
    integral: String,
    fractional: String,
}

impl Expanded {
    fn is_zero(&self) -> bool {
        self.integral == "0" && self.fractional.is_empty()
    }

    fn is_integer(&self) -> bool {
        self.fractional.is_empty()
    }

    fn is_non_negative(&self) -> bool {
        !self.negative || self.is_zero()
    }
}

impl std::fmt::Display for Expanded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negative && !self.is_zero() {
            f.write_str("-")?;
        }
        f.write_str(&self.integral)?;
        if !self.fractional.is_empty() {
            write!(f, ".{}", self.fractional)?;
        }
        Ok(())
    }
}

fn expand(input: &str) -> Result<Expanded, NumericError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NumericError::Empty);
    }
    let malformed = || NumericError::Malformed(trimmed.to_string());

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => {
            let exponent = unsigned[idx + 1..]
                .parse::<i64>()
                .map_err(|_| malformed())?;
            (&unsigned[..idx], exponent)
        }
        None => (unsigned, 0),
    };
    if exponent.unsigned_abs() > MAX_EXPONENT {
        return Err(NumericError::Overflow(trimmed.to_string()));
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(malformed());
    }

    let digits = format!("{int_part}{frac_part}");
    let point = int_part.len() as i64 + exponent;

    let (integral, fractional) = if point <= 0 {
        let zeros = "0".repeat(point.unsigned_abs() as usize);
        ("0".to_string(), format!("{zeros}{digits}"))
    } else if point as usize >= digits.len() {
        let zeros = "0".repeat(point as usize - digits.len());
        (format!("{digits}{zeros}"), String::new())
    } else {
        let (i, f) = digits.split_at(point as usize);
        (i.to_string(), f.to_string())
    };

    let integral = match integral.trim_start_matches('0') {
        "" => "0".to_string(),
        rest => rest.to_string(),
    };
    let fractional = fractional.trim_end_matches('0').to_string();

    Ok(Expanded {
        negative,
        integral,
        fractional,
    })
}

/// Resolves scientific notation into a plain decimal string, e.g. `2e3` into `2000`.
pub fn to_non_scientific(input: &str) -> Result<String, NumericError> {
    expand(input).map(|expanded| expanded.to_string())
}

/// Textual form of a JSON number or numeric string.
pub fn numeric_text(value: &Value) -> Result<String, NumericError> {
    match value {
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => Ok(text.clone()),
        _ => Err(NumericError::NotNumeric),
    }
}

fn expand_integer(value: &Value) -> Result<(String, Expanded), NumericError> {
    let text = numeric_text(value)?;
    let expanded = expand(&text)?;
    if !expanded.is_non_negative() {
        return Err(NumericError::Negative(text));
    }
    if !expanded.is_integer() {
        return Err(NumericError::Fractional(text));
    }
    Ok((text, expanded))
}

pub fn is_non_negative_integer(value: &Value) -> bool {
    expand_integer(value).is_ok()
}

/// Converts a validated non-negative integer value into base units.
pub fn to_integer(value: &Value) -> Result<U256, NumericError> {
    let (text, expanded) = expand_integer(value)?;
    U256::from_dec_str(&expanded.integral).map_err(|_| NumericError::Overflow(text))
}

pub fn to_u64(value: &Value) -> Result<u64, NumericError> {
    let (text, expanded) = expand_integer(value)?;
    expanded
        .integral
        .parse::<u64>()
        .map_err(|_| NumericError::Overflow(text))
}

pub trait U256Ext {
    /// Nearest `f64` to the integer value.
    fn to_f64(&self) -> f64;
}

impl U256Ext for U256 {
    fn to_f64(&self) -> f64 {
        // decimal digits always parse
        self.to_string().parse::<f64>().unwrap_or(f64::INFINITY)
    }
}
