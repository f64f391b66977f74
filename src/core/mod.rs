pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{parse_parameter, validate_parameters};
