//! Limit configuration: validated ceilings, error taxonomy, outcome types.

pub mod types;
pub mod validator;

pub use types::*;
pub use validator::validated_limits;
