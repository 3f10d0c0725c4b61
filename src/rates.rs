//! Rate convention conversions.
//!
//! Normalizes an annual rate of either supported convention — TEA (annual
//! effective) or TNA (annual nominal with explicit compounding) — to the
//! single monthly effective rate (TEM) that drives every period-level
//! calculation downstream.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageError;
use crate::types::Rate;
use crate::MortgageResult;

pub(crate) const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Annual rate convention tag, as supplied by callers using the flat
/// tag-plus-optionals input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateType {
    /// TEA — annual effective rate.
    AnnualEffective,
    /// TNA — annual nominal rate, paired with a compounding frequency.
    AnnualNominal,
}

/// An annual rate carrying only the fields that apply to its convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rate_type", rename_all = "snake_case")]
pub enum RateBasis {
    /// Annual effective rate (TEA).
    AnnualEffective { rate: Rate },
    /// Annual nominal rate (TNA) with its compounding periods per year.
    AnnualNominal {
        rate: Rate,
        compounding_per_year: u32,
    },
}

impl RateBasis {
    /// Assemble from the flat tag-plus-optionals shape used on the wire.
    ///
    /// The selected convention must arrive with its companion value(s); this
    /// is the only validation the engine performs, everything else is
    /// checked upstream.
    pub fn from_parts(
        rate_type: RateType,
        annual_effective: Option<Rate>,
        annual_nominal: Option<Rate>,
        compounding_per_year: Option<u32>,
    ) -> MortgageResult<Self> {
        match rate_type {
            RateType::AnnualEffective => match annual_effective {
                Some(rate) => Ok(RateBasis::AnnualEffective { rate }),
                None => Err(MortgageError::MissingRateInput {
                    rate_type: "TEA",
                    missing: "annual effective rate",
                }),
            },
            RateType::AnnualNominal => match (annual_nominal, compounding_per_year) {
                (Some(rate), Some(per_year)) => Ok(RateBasis::AnnualNominal {
                    rate,
                    compounding_per_year: per_year,
                }),
                _ => Err(MortgageError::MissingRateInput {
                    rate_type: "TNA",
                    missing: "annual nominal rate and compounding periods per year",
                }),
            },
        }
    }

    /// Equivalent annual effective rate (TEA) for this convention.
    ///
    /// Nominal rates compound first: `(1 + TNA/m)^m - 1`.
    pub fn annual_effective(&self) -> Rate {
        match *self {
            RateBasis::AnnualEffective { rate } => rate,
            RateBasis::AnnualNominal {
                rate,
                compounding_per_year,
            } => {
                let m = Decimal::from(compounding_per_year);
                (Decimal::ONE + rate / m).powd(m) - Decimal::ONE
            }
        }
    }

    /// Monthly effective rate (TEM) for this convention.
    pub fn monthly_effective(&self) -> Rate {
        monthly_from_annual(self.annual_effective())
    }
}

/// Convert an annual effective rate to its monthly equivalent:
/// `(1 + TEA)^(1/12) - 1`.
pub fn monthly_from_annual(tea: Rate) -> Rate {
    (Decimal::ONE + tea).powd(Decimal::ONE / MONTHS_PER_YEAR) - Decimal::ONE
}

/// Annualize a monthly effective rate: `(1 + TEM)^12 - 1`.
pub fn annual_from_monthly(tem: Rate) -> Rate {
    (Decimal::ONE + tem).powd(MONTHS_PER_YEAR) - Decimal::ONE
}

/// Flat-shape conversion straight to the monthly rate.
pub fn monthly_effective_rate(
    rate_type: RateType,
    annual_effective: Option<Rate>,
    annual_nominal: Option<Rate>,
    compounding_per_year: Option<u32>,
) -> MortgageResult<Rate> {
    RateBasis::from_parts(
        rate_type,
        annual_effective,
        annual_nominal,
        compounding_per_year,
    )
    .map(|basis| basis.monthly_effective())
}
