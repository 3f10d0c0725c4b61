//! Loan simulation entry point.
//!
//! Single orchestration point for one calculation: applies the subsidy
//! deduction to the principal, normalizes the rate, builds the schedule and
//! derives the indicators. Each call is a pure transformation of its input;
//! independent simulations are safe to run concurrently without
//! coordination.

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::{summarize, IndicatorSummary};
use crate::rates::{RateBasis, RateType};
use crate::schedule::{build_schedule, GracePolicy, ScheduleEntry, ScheduleParams};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::MortgageResult;

/// Caller-supplied loan parameters.
///
/// Pre-validated upstream (ranges, required fields, bonus normalization)
/// except for the rate-type / companion-value consistency check, which is
/// enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub principal: Money,
    pub currency: Currency,
    /// Which annual rate convention the companion fields follow.
    pub rate_type: RateType,
    /// TEA, required when `rate_type` is `AnnualEffective`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_effective_rate: Option<Rate>,
    /// TNA, required when `rate_type` is `AnnualNominal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_nominal_rate: Option<Rate>,
    /// Compounding periods per year, required alongside the TNA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compounding_per_year: Option<u32>,
    pub term_months: u32,
    pub grace_policy: GracePolicy,
    pub grace_months: u32,
    pub start_date: NaiveDate,
    /// Whether the housing subsidy is deducted from the disbursed principal.
    pub apply_bonus: bool,
    /// Subsidy amount, already normalized by the caller (may be zero).
    pub bonus_amount: Money,
    /// Monthly life-insurance rate on the outstanding balance.
    pub life_insurance_rate_monthly: Rate,
    /// Annual risk-insurance rate on the original principal.
    pub risk_insurance_rate_annual: Rate,
    /// Fixed monthly fee.
    pub fees_monthly: Money,
}

/// Public result pair: summary indicators plus the full schedule.
///
/// Entries come back already in period order; the caller attaches
/// identifiers, persists both structures, and re-sorts by period on display
/// if its storage does not preserve order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub summary: IndicatorSummary,
    pub schedule: Vec<ScheduleEntry>,
}

/// Run one full simulation: subsidy deduction, rate normalization, schedule
/// build, indicator derivation.
pub fn simulate(input: &SimulationInput) -> MortgageResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let basis = RateBasis::from_parts(
        input.rate_type,
        input.annual_effective_rate,
        input.annual_nominal_rate,
        input.compounding_per_year,
    )?;
    let monthly_rate = basis.monthly_effective();

    let adjusted_principal = if input.apply_bonus {
        input.principal - input.bonus_amount
    } else {
        input.principal
    };

    let schedule = build_schedule(&ScheduleParams {
        principal: adjusted_principal,
        monthly_rate,
        term_months: input.term_months,
        grace_policy: input.grace_policy,
        grace_months: input.grace_months,
        start_date: input.start_date,
        life_insurance_rate_monthly: input.life_insurance_rate_monthly,
        risk_insurance_rate_annual: input.risk_insurance_rate_annual,
        fees_monthly: input.fees_monthly,
        insured_principal: input.principal,
    });

    let summary = summarize(
        &schedule,
        adjusted_principal,
        monthly_rate,
        input.grace_months,
        &mut warnings,
    );

    let output = SimulationOutput { summary, schedule };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "French-method amortization with TEM normalization and TCEA/VAN/TIR indicators",
        &serde_json::json!({
            "currency": input.currency,
            "term_months": input.term_months,
            "grace_policy": input.grace_policy,
            "grace_months": input.grace_months,
            "monthly_rate": monthly_rate.to_string(),
            "adjusted_principal": adjusted_principal.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
