use crate::payment::{
    ensure_variant, fiat_fee, optional_integer, optional_string, optional_u64, parse_amount,
    prefer, protocol_specifics, specifics_object, Truthy,
};
use crate::types::{Currency, FiatFeeError, PaymentMethod, RawPaymentOptions, ValidationError};
use ethers::types::U256;
use serde::Deserialize;
use serde_json::Value;

/// Ether specific request fields, as received.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtherSpecifics {
    #[serde(default)]
    pub gas_limit: Option<Value>,
    #[serde(default)]
    pub gas_price: Option<Value>,
    #[serde(default)]
    pub recipient: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedEtherSpecifics {
    pub gas_limit: Option<u64>,
    /// Wei per unit of gas.
    pub gas_price: Option<U256>,
    pub recipient: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedEtherDirectPaymentOptions {
    amount: U256,
    expires: Option<u64>,
    protocol_specific: ParsedEtherSpecifics,
}

impl ParsedEtherDirectPaymentOptions {
    pub const CURRENCY: Currency = Currency::Eth;
    pub const METHOD: PaymentMethod = PaymentMethod::Direct;
    pub const DECIMALS: u8 = 18;

    pub fn parse(raw: &RawPaymentOptions) -> Result<Self, ValidationError> {
        ensure_variant(raw, Self::CURRENCY, Self::METHOD)?;
        let specifics: EtherSpecifics = protocol_specifics(raw)?;

        let amount = parse_amount(&raw.amount)?;
        let gas_limit = optional_u64(specifics.gas_limit.as_ref(), ValidationError::InvalidGasLimit)?;
        let gas_price =
            optional_integer(specifics.gas_price.as_ref(), ValidationError::InvalidGasPrice)?;
        let recipient =
            optional_string(specifics.recipient.as_ref(), ValidationError::InvalidRecipient)?;

        let options = ParsedEtherDirectPaymentOptions {
            amount,
            expires: raw.expires,
            protocol_specific: ParsedEtherSpecifics {
                gas_limit,
                gas_price,
                recipient,
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

    pub fn protocol_specific(&self) -> &ParsedEtherSpecifics {
        &self.protocol_specific
    }

    fn checked_fee(&self) -> Option<U256> {
        match (self.protocol_specific.gas_price, self.protocol_specific.gas_limit) {
            (Some(gas_price), Some(gas_limit)) => gas_price.checked_mul(U256::from(gas_limit)),
            _ => Some(U256::zero()),
        }
    }

    fn checked_total(&self) -> Result<U256, ValidationError> {
        self.checked_fee()
            .and_then(|fee| self.amount.checked_add(fee))
            .ok_or(ValidationError::FeeOverflow)
    }

    /// `gasPrice * gasLimit`, or zero if either is unset.
    pub fn fee(&self) -> U256 {
        // bounds are checked whenever the options change
        self.checked_fee().unwrap_or(U256::MAX)
    }

    pub fn total(&self) -> U256 {
        self.checked_total().unwrap_or(U256::MAX)
    }

    /// Overwrites every field for which `raw` carries a non-zero, non-empty value.
    pub fn update(&mut self, raw: &RawPaymentOptions) -> Result<(), ValidationError> {
        let new = Self::parse(raw)?;
        let old = &self.protocol_specific;

        let merged = ParsedEtherDirectPaymentOptions {
            amount: if new.amount.is_truthy() {
                new.amount
            } else {
                self.amount
            },
            expires: prefer(new.expires, self.expires),
            protocol_specific: ParsedEtherSpecifics {
                gas_limit: prefer(new.protocol_specific.gas_limit, old.gas_limit),
                gas_price: prefer(new.protocol_specific.gas_price, old.gas_price),
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
                ("gasLimit", specifics.gas_limit.map(Value::from)),
                (
                    "gasPrice",
                    specifics.gas_price.map(|price| Value::String(price.to_string())),
                ),
                ("recipient", specifics.recipient.clone().map(Value::String)),
            ]),
        }
    }
}
