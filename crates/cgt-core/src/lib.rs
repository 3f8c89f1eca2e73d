pub mod aggregator;
pub mod calculator;
pub mod config;
pub mod dsl;
pub mod error;
pub mod exemption;
pub mod formatting;
pub mod matcher;
pub mod models;
pub mod ordering;
pub mod parser;
pub mod splits;
pub mod validation;

pub use config::Config;
pub use error::CgtError;
pub use exemption::get_exemption;
pub use models::*;
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate};
