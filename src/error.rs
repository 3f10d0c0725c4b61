use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageError {
    /// The selected rate convention arrived without its companion value(s).
    /// Fatal: no partial schedule is produced. All other input validation
    /// happens upstream of this crate.
    #[error("Missing rate input: {rate_type} requires {missing}")]
    MissingRateInput {
        rate_type: &'static str,
        missing: &'static str,
    },
}
