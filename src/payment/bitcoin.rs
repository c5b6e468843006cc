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
pub struct BitcoinSpecifics {
    #[serde(default)]
    pub fee: Option<Value>,
    #[serde(default)]
    pub fee_per_byte: Option<Value>,
    #[serde(default)]
    pub recipient: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedBitcoinSpecifics {
    /// Absolute fee in satoshis.
    pub fee: Option<U256>,
    pub fee_per_byte: Option<u64>,
    pub recipient: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedBitcoinDirectPaymentOptions {
    amount: U256,
    expires: Option<u64>,
    protocol_specific: ParsedBitcoinSpecifics,
}

impl ParsedBitcoinDirectPaymentOptions {
    pub const CURRENCY: Currency = Currency::Btc;
    pub const METHOD: PaymentMethod = PaymentMethod::Direct;
    pub const DECIMALS: u8 = 8;

    pub fn parse(raw: &RawPaymentOptions) -> Result<Self, ValidationError> {
        ensure_variant(raw, Self::CURRENCY, Self::METHOD)?;
        let specifics: BitcoinSpecifics = protocol_specifics(raw)?;

        let options = ParsedBitcoinDirectPaymentOptions {
            amount: parse_amount(&raw.amount)?,
            expires: raw.expires,
            protocol_specific: ParsedBitcoinSpecifics {
                fee: optional_integer(specifics.fee.as_ref(), ValidationError::InvalidFee)?,
                fee_per_byte: optional_u64(
                    specifics.fee_per_byte.as_ref(),
                    ValidationError::InvalidFeePerByte,
                )?,
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

    pub fn protocol_specific(&self) -> &ParsedBitcoinSpecifics {
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
        let old = &self.protocol_specific;

        let merged = ParsedBitcoinDirectPaymentOptions {
            amount: if new.amount.is_truthy() {
                new.amount
            } else {
                self.amount
            },
            expires: prefer(new.expires, self.expires),
            protocol_specific: ParsedBitcoinSpecifics {
                fee: prefer(new.protocol_specific.fee, old.fee),
                fee_per_byte: prefer(new.protocol_specific.fee_per_byte, old.fee_per_byte),
                recipient: prefer(new.protocol_specific.recipient, old.recipient.clone()),
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
            "currency": "btc",
            "type": "direct",
            "amount": amount,
            "protocolSpecific": protocol_specific,
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_and_fee() {
        let options = ParsedBitcoinDirectPaymentOptions::parse(&raw_options(
            json!("150000"),
            json!({ "fee": "2e3", "feePerByte": 8, "recipient": "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq" }),
        ))
        .unwrap();

        assert_eq!(options.fee(), U256::from(2000));
        assert_eq!(options.total(), U256::from(152_000));
        assert_eq!(options.protocol_specific().fee_per_byte, Some(8));
        assert_eq!(options.expires(), None);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let result =
            ParsedBitcoinDirectPaymentOptions::parse(&raw_options(json!("1"), json!({ "fee": "-1" })));
        assert!(matches!(result, Err(ValidationError::InvalidFee)));

        let result = ParsedBitcoinDirectPaymentOptions::parse(&raw_options(
            json!("1"),
            json!({ "feePerByte": 1.5 }),
        ));
        assert!(matches!(result, Err(ValidationError::InvalidFeePerByte)));

        let result = ParsedBitcoinDirectPaymentOptions::parse(&raw_options(
            json!("1"),
            json!({ "recipient": 1 }),
        ));
        assert!(matches!(result, Err(ValidationError::InvalidRecipient)));
    }

    #[test]
    fn test_update_and_raw() {
        let mut options =
            ParsedBitcoinDirectPaymentOptions::parse(&raw_options(json!(1000), json!({ "fee": 10 })))
                .unwrap();
        options
            .update(&raw_options(json!(0), json!({ "feePerByte": 3 })))
            .unwrap();

        assert_eq!(options.amount(), U256::from(1000));
        assert_eq!(options.fee(), U256::from(10));
        assert_eq!(
            serde_json::to_value(options.raw()).unwrap(),
            json!({
                "currency": "btc",
                "type": "direct",
                "amount": "1000",
                "protocolSpecific": { "fee": "10", "feePerByte": 3 },
            })
        );
    }
}
