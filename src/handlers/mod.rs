pub mod accounts;
pub mod checkout;
pub mod permissions;

pub use accounts::accounts_handler;
