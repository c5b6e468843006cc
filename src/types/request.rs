use crate::types::{Currency, PaymentMethod};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payment options as they arrive from a requesting site.
///
/// `amount` and the members of `protocol_specific` are left loosely typed;
/// the parser of the matching variant decides whether they are acceptable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPaymentOptions {
    pub currency: Currency,
    #[serde(rename = "type")]
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    pub amount: Value,
    #[serde(default = "empty_object")]
    pub protocol_specific: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
