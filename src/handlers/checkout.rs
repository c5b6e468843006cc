use crate::payment::ParsedPaymentOptions;
use crate::types::{ApiError, Currency, PaymentMethod, RawPaymentOptions};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validated view of a set of payment options.
///
/// Integer quantities are rendered as decimal strings since they routinely
/// exceed what a JSON number can hold exactly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub currency: Currency,
    #[serde(rename = "type")]
    pub method: PaymentMethod,
    pub decimals: u8,
    pub amount: String,
    pub fee: String,
    pub total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    pub options: RawPaymentOptions,
}

impl From<&ParsedPaymentOptions> for CheckoutSummary {
    fn from(options: &ParsedPaymentOptions) -> Self {
        Self {
            currency: options.currency(),
            method: options.method(),
            decimals: options.decimals(),
            amount: options.amount().to_string(),
            fee: options.fee().to_string(),
            total: options.total().to_string(),
            expires: options.expires(),
            options: options.raw(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub current: RawPaymentOptions,
    pub update: RawPaymentOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatFeeRequest {
    pub options: RawPaymentOptions,
    pub fiat_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatFeeResponse {
    pub fiat_fee: f64,
}

pub async fn parse_options(
    Json(raw): Json<RawPaymentOptions>,
) -> Result<Json<CheckoutSummary>, ApiError> {
    let options = ParsedPaymentOptions::parse(&raw)?;
    debug!(
        "parsed {} {} options, total {}",
        options.currency(),
        options.method(),
        options.total()
    );
    Ok(Json(CheckoutSummary::from(&options)))
}

pub async fn update_options(
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CheckoutSummary>, ApiError> {
    let mut options = ParsedPaymentOptions::parse(&request.current)?;
    options.update(&request.update)?;
    Ok(Json(CheckoutSummary::from(&options)))
}

pub async fn fiat_fee(
    Json(request): Json<FiatFeeRequest>,
) -> Result<Json<FiatFeeResponse>, ApiError> {
    let options = ParsedPaymentOptions::parse(&request.options)?;
    let fiat_fee = options.fiat_fee(request.fiat_amount)?;
    Ok(Json(FiatFeeResponse { fiat_fee }))
}
