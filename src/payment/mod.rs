//! Parsing and validation of payment options.
//!
//! Every supported `{currency, method}` pair has its own parsed type; the
//! [`ParsedPaymentOptions`] enum selects one from the tags of a raw request
//! and forwards the shared operation set to it.

pub mod bitcoin;
pub mod ether;
pub mod nimiq;

pub use bitcoin::ParsedBitcoinDirectPaymentOptions;
pub use ether::ParsedEtherDirectPaymentOptions;
pub use nimiq::ParsedNimiqDirectPaymentOptions;

use crate::types::{Currency, FiatFeeError, PaymentMethod, RawPaymentOptions, ValidationError};
use crate::utils::numeric::{to_integer, to_u64, U256Ext};
use ethers::types::U256;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedPaymentOptions {
    Nimiq(ParsedNimiqDirectPaymentOptions),
    Bitcoin(ParsedBitcoinDirectPaymentOptions),
    Ether(ParsedEtherDirectPaymentOptions),
}

impl ParsedPaymentOptions {
    pub fn parse(raw: &RawPaymentOptions) -> Result<Self, ValidationError> {
        match (raw.currency, raw.method) {
            (Currency::Nim, PaymentMethod::Direct) => {
                ParsedNimiqDirectPaymentOptions::parse(raw).map(Self::Nimiq)
            }
            (Currency::Btc, PaymentMethod::Direct) => {
                ParsedBitcoinDirectPaymentOptions::parse(raw).map(Self::Bitcoin)
            }
            (Currency::Eth, PaymentMethod::Direct) => {
                ParsedEtherDirectPaymentOptions::parse(raw).map(Self::Ether)
            }
        }
    }

    pub fn currency(&self) -> Currency {
        match self {
            Self::Nimiq(_) => ParsedNimiqDirectPaymentOptions::CURRENCY,
            Self::Bitcoin(_) => ParsedBitcoinDirectPaymentOptions::CURRENCY,
            Self::Ether(_) => ParsedEtherDirectPaymentOptions::CURRENCY,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Nimiq(_) => ParsedNimiqDirectPaymentOptions::METHOD,
            Self::Bitcoin(_) => ParsedBitcoinDirectPaymentOptions::METHOD,
            Self::Ether(_) => ParsedEtherDirectPaymentOptions::METHOD,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Self::Nimiq(_) => ParsedNimiqDirectPaymentOptions::DECIMALS,
            Self::Bitcoin(_) => ParsedBitcoinDirectPaymentOptions::DECIMALS,
            Self::Ether(_) => ParsedEtherDirectPaymentOptions::DECIMALS,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            Self::Nimiq(options) => options.amount(),
            Self::Bitcoin(options) => options.amount(),
            Self::Ether(options) => options.amount(),
        }
    }

    pub fn expires(&self) -> Option<u64> {
        match self {
            Self::Nimiq(options) => options.expires(),
            Self::Bitcoin(options) => options.expires(),
            Self::Ether(options) => options.expires(),
        }
    }

    pub fn fee(&self) -> U256 {
        match self {
            Self::Nimiq(options) => options.fee(),
            Self::Bitcoin(options) => options.fee(),
            Self::Ether(options) => options.fee(),
        }
    }

    pub fn total(&self) -> U256 {
        match self {
            Self::Nimiq(options) => options.total(),
            Self::Bitcoin(options) => options.total(),
            Self::Ether(options) => options.total(),
        }
    }

    /// Merges `raw` into these options. Fails without modifying anything if
    /// `raw` is invalid or describes another currency or method.
    pub fn update(&mut self, raw: &RawPaymentOptions) -> Result<(), ValidationError> {
        match self {
            Self::Nimiq(options) => options.update(raw),
            Self::Bitcoin(options) => options.update(raw),
            Self::Ether(options) => options.update(raw),
        }
    }

    pub fn fiat_fee(&self, fiat_amount: f64) -> Result<f64, FiatFeeError> {
        fiat_fee(self.amount(), self.fee(), fiat_amount)
    }

    pub fn raw(&self) -> RawPaymentOptions {
        match self {
            Self::Nimiq(options) => options.raw(),
            Self::Bitcoin(options) => options.raw(),
            Self::Ether(options) => options.raw(),
        }
    }
}

/// Values that count as "unset" during `update` when they are zero or empty.
pub(crate) trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for U256 {
    fn is_truthy(&self) -> bool {
        !self.is_zero()
    }
}

impl Truthy for u64 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for u32 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

pub(crate) fn prefer<T: Truthy>(new: Option<T>, old: Option<T>) -> Option<T> {
    new.filter(Truthy::is_truthy).or(old)
}

pub(crate) fn ensure_variant(
    raw: &RawPaymentOptions,
    currency: Currency,
    method: PaymentMethod,
) -> Result<(), ValidationError> {
    if raw.currency != currency || raw.method != method {
        return Err(ValidationError::VariantMismatch {
            expected_currency: currency,
            expected_method: method,
            currency: raw.currency,
            method: raw.method,
        });
    }
    Ok(())
}

pub(crate) fn protocol_specifics<T: DeserializeOwned>(
    raw: &RawPaymentOptions,
) -> Result<T, ValidationError> {
    let value = match &raw.protocol_specific {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(ValidationError::MalformedProtocolSpecific)
}

pub(crate) fn parse_amount(value: &Value) -> Result<U256, ValidationError> {
    to_integer(value).map_err(ValidationError::InvalidAmount)
}

pub(crate) fn optional_integer(
    value: Option<&Value>,
    error: ValidationError,
) -> Result<Option<U256>, ValidationError> {
    value.map(|v| to_integer(v).map_err(|_| error)).transpose()
}

pub(crate) fn optional_u64(
    value: Option<&Value>,
    error: ValidationError,
) -> Result<Option<u64>, ValidationError> {
    value.map(|v| to_u64(v).map_err(|_| error)).transpose()
}

pub(crate) fn optional_string(
    value: Option<&Value>,
    error: ValidationError,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(error),
    }
}

/// Builds a `protocolSpecific` object, leaving out absent fields.
pub(crate) fn specifics_object<const N: usize>(fields: [(&str, Option<Value>); N]) -> Value {
    let object = fields
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name.to_string(), value)))
        .collect::<Map<_, _>>();
    Value::Object(object)
}

/// Fee converted into fiat, given the fiat value of the full `amount`.
///
/// The fiat amount is scaled to an integer by its own number of decimals so
/// the ratio can be computed on integers. The division truncates before the
/// result is scaled back, so e.g. `105.525` fiat cents come back as `1.05`.
pub(crate) fn fiat_fee(amount: U256, fee: U256, fiat_amount: f64) -> Result<f64, FiatFeeError> {
    if amount.is_zero() || fiat_amount == 0.0 || fiat_amount.is_nan() {
        return Err(FiatFeeError::MissingAmount);
    }
    if !fiat_amount.is_finite() || fiat_amount < 0.0 {
        return Err(FiatFeeError::InvalidFiatAmount(fiat_amount));
    }

    if fee.is_zero() {
        return Ok(0.0);
    }

    let decimal_count = fiat_decimal_count(fiat_amount);
    let conversion_factor = 10f64.powi(decimal_count as i32);
    let scaled = (fiat_amount * conversion_factor).round();
    // finite and non-negative here, so only the width can be exceeded
    let scaled = U256::from_dec_str(&format!("{scaled:.0}"))
        .map_err(|_| FiatFeeError::FiatFeeOverflow)?;

    let fee_in_fiat_units = fee
        .checked_mul(scaled)
        .ok_or(FiatFeeError::FiatFeeOverflow)?
        / amount;

    Ok(fee_in_fiat_units.to_f64() / conversion_factor)
}

/// Number of digits after the decimal point of the plain (non-scientific)
/// representation of `value`.
fn fiat_decimal_count(value: f64) -> usize {
    let text = value.to_string();
    let trailing_digits = text.bytes().rev().take_while(|b| b.is_ascii_digit()).count();
    if trailing_digits == text.len() {
        0
    } else {
        trailing_digits
    }
}
