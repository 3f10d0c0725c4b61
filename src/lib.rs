pub mod error;
pub mod indicators;
pub mod rates;
pub mod schedule;
pub mod simulation;
pub mod types;

pub use error::MortgageError;
pub use types::*;

/// Standard result type for all mortgage-core operations
pub type MortgageResult<T> = Result<T, MortgageError>;
