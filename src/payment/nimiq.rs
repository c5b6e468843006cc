use crate::payment::{
    ensure_variant, fiat_fee, optional_integer, optional_string, optional_u64, parse_amount,
    prefer, protocol_specifics, specifics_object, Truthy,
};
use crate::types::{Currency, FiatFeeError, PaymentMethod, RawPaymentOptions, ValidationError};
use ethers::types::U256;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NimiqSpecifics {
    #[serde(default)]
    pub fee: Option<Value>,
    #[serde(default)]
    pub fee_per_byte: Option<Value>,
    #[serde(default)]
    pub extra_data: Option<Value>,
    #[serde(default)]
    pub validity_duration: Option<Value>,
    #[serde(default)]
    pub recipient: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedNimiqSpecifics {
    /// Absolute fee in luna.
    pub fee: Option<U256>,
    pub fee_per_byte: Option<u64>,
    pub extra_data: Option<String>,
    /// Number of blocks the transaction stays valid for.
    pub validity_duration: Option<u32>,
    pub recipient: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedNimiqDirectPaymentOptions {
    amount: U256,
    expires: Option<u64>,
    protocol_specific: ParsedNimiqSpecifics,
}

impl ParsedNimiqDirectPaymentOptions {
    pub const CURRENCY: Currency = Currency::Nim;
    pub const METHOD: PaymentMethod = PaymentMethod::Direct;
    pub const DECIMALS: u8 = 5;

    pub fn parse(raw: &RawPaymentOptions) -> Result<Self, ValidationError> {
        ensure_variant(raw, Self::CURRENCY, Self::METHOD)?;
        let specifics: NimiqSpecifics = protocol_specifics(raw)?;

        let validity_duration = optional_u64(
            specifics.validity_duration.as_ref(),
            ValidationError::InvalidValidityDuration,
        )?
        .map(u32::try_from)
        .transpose()
        .map_err(|_| ValidationError::InvalidValidityDuration)?;

        let options = ParsedNimiqDirectPaymentOptions {
            amount: parse_amount(&raw.amount)?,
            expires: raw.expires,
            protocol_specific: ParsedNimiqSpecifics {
                fee: optional_integer(specifics.fee.as_ref(), ValidationError::InvalidFee)?,
                fee_per_byte: optional_u64(
                    specifics.fee_per_byte.as_ref(),
                    ValidationError::InvalidFeePerByte,
                )?,
                extra_data: optional_string(
                    specifics.extra_data.as_ref(),
                    ValidationError::InvalidExtraData,
                )?,
                validity_duration,
                recipient: optional_string(
                    specifics.recipient.as_ref(),
                    ValidationError::InvalidRecipient,
                )?,
            },
        };
        options.checked_total()?;
        Ok(options)
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn expires(&self) -> Option<u64> {
        self.expires
    }

    pub fn protocol_specific(&self) -> &ParsedNimiqSpecifics {
        &self.protocol_specific
    }

    fn checked_total(&self) -> Result<U256, ValidationError> {
        self.amount
            .checked_add(self.fee())
            .ok_or(ValidationError::FeeOverflow)
    }

    pub fn fee(&self) -> U256 {
        self.protocol_specific.fee.unwrap_or_default()
    }

    pub fn total(&self) -> U256 {
        self.checked_total().unwrap_or(U256::MAX)
    }

    pub fn update(&mut self, raw: &RawPaymentOptions) -> Result<(), ValidationError> {
        let new = Self::parse(raw)?;
        let (specifics, old) = (new.protocol_specific, &self.protocol_specific);

        let merged = ParsedNimiqDirectPaymentOptions {
            amount: if new.amount.is_truthy() {
                new.amount
            } else {
                self.amount
            },
            expires: prefer(new.expires, self.expires),
            protocol_specific: ParsedNimiqSpecifics {
                fee: prefer(specifics.fee, old.fee),
                fee_per_byte: prefer(specifics.fee_per_byte, old.fee_per_byte),
                extra_data: prefer(specifics.extra_data, old.extra_data.clone()),
                validity_duration: prefer(specifics.validity_duration, old.validity_duration),
                recipient: prefer(specifics.recipient, old.recipient.clone()),
            },
        };
        merged.checked_total()?;

        *self = merged;
        Ok(())
    }

    pub fn fiat_fee(&self, fiat_amount: f64) -> Result<f64, FiatFeeError> {
        fiat_fee(self.amount, self.fee(), fiat_amount)
    }

    pub fn raw(&self) -> RawPaymentOptions {
        let specifics = &self.protocol_specific;
        RawPaymentOptions {
            currency: Self::CURRENCY,
            method: Self::METHOD,
            expires: self.expires,
            amount: Value::String(self.amount.to_string()),
            protocol_specific: specifics_object([
                ("fee", specifics.fee.map(|fee| Value::String(fee.to_string()))),
                ("feePerByte", specifics.fee_per_byte.map(Value::from)),
                ("extraData", specifics.extra_data.clone().map(Value::String)),
                ("validityDuration", specifics.validity_duration.map(Value::from)),
                ("recipient", specifics.recipient.clone().map(Value::String)),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_options(amount: Value, protocol_specific: Value) -> RawPaymentOptions {
        serde_json::from_value(json!({
            "currency": "nim",
            "type": "direct",
            "expires": 1_650_000_000_000u64,
            "amount": amount,
            "protocolSpecific": protocol_specific,
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_and_round_trip() {
        let input = raw_options(
            json!("500000"),
            json!({
                "fee": "138",
                "feePerByte": 1,
                "extraData": "order #1234",
                "validityDuration": 120,
                "recipient": "NQ07 0000 0000 0000 0000 0000 0000 0000 0000",
            }),
        );
        let options = ParsedNimiqDirectPaymentOptions::parse(&input).unwrap();

        assert_eq!(options.fee(), U256::from(138));
        assert_eq!(options.total(), U256::from(500_138));
        assert_eq!(options.protocol_specific().validity_duration, Some(120));
        assert_eq!(options.raw(), input);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let result = ParsedNimiqDirectPaymentOptions::parse(&raw_options(
            json!("1"),
            json!({ "extraData": 5 }),
        ));
        assert!(matches!(result, Err(ValidationError::InvalidExtraData)));

        let result = ParsedNimiqDirectPaymentOptions::parse(&raw_options(
            json!("1"),
            json!({ "validityDuration": "5e9" }),
        ));
        assert!(matches!(result, Err(ValidationError::InvalidValidityDuration)));
    }

    #[test]
    fn test_update_merges_extra_data() {
        let mut options = ParsedNimiqDirectPaymentOptions::parse(&raw_options(
            json!("500000"),
            json!({ "extraData": "first" }),
        ))
        .unwrap();

        options
            .update(&raw_options(json!("600000"), json!({ "extraData": "", "fee": 2 })))
            .unwrap();
        assert_eq!(options.amount(), U256::from(600_000));
        assert_eq!(options.protocol_specific().extra_data.as_deref(), Some("first"));
        assert_eq!(options.fee(), U256::from(2));

        options
            .update(&raw_options(json!("600000"), json!({ "extraData": "second" })))
            .unwrap();
        assert_eq!(options.protocol_specific().extra_data.as_deref(), Some("second"));
        assert_eq!(options.fiat_fee(3.0), Ok(0.0));
    }
}
