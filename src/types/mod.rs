pub mod currency;
pub mod error;
pub mod permission;
pub mod request;

pub use currency::{Currency, PaymentMethod};
pub use error::{ApiError, ConfigError, FiatFeeError, StoreError, ValidationError};
pub use permission::{Grant, Permission};
pub use request::RawPaymentOptions;
