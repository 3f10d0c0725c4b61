//! Summary indicators over a finished schedule.
//!
//! Column totals, the representative monthly installment, the net present
//! value (VAN) of the installment stream at the monthly rate, and the two
//! iteratively-derived annual rates: effective annual cost (TCEA) and
//! internal rate of return (TIR). The two coincide here because the
//! installment series already embeds every cost component, so they share one
//! Newton-Raphson solve.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::rates::annual_from_monthly;
use crate::schedule::ScheduleEntry;
use crate::types::{Money, Rate};

const IRR_INITIAL_GUESS: Rate = dec!(0.01);
const IRR_MAX_ITERATIONS: u32 = 100;
const IRR_TOLERANCE: Decimal = dec!(0.0001);
/// Clamp window keeping the monthly rate solve away from divergence.
const IRR_MIN_RATE: Rate = dec!(-0.5);
const IRR_MAX_RATE: Rate = dec!(1.0);

/// Summary financial indicators for one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    /// Monthly effective rate (TEM) that drove the schedule.
    pub monthly_rate: Rate,
    /// Representative installment: mean over post-grace periods.
    pub monthly_payment: Money,
    /// Effective annual cost rate (TCEA).
    pub effective_annual_cost_rate: Rate,
    /// Net present value (VAN) of the installment stream at the monthly
    /// rate, net of the disbursed principal.
    pub net_present_value: Money,
    /// Annualized internal rate of return (TIR).
    pub internal_rate_of_return: Rate,
    pub total_interest: Money,
    /// Disbursed principal plus interest, both insurances and fees.
    pub total_cost: Money,
}

/// Derive the indicator summary from a finished schedule.
///
/// `principal` is the bonus-adjusted disbursement. Root-finding trouble is
/// reported through `warnings`; the clamped best-effort estimate is still
/// returned rather than an error.
pub fn summarize(
    schedule: &[ScheduleEntry],
    principal: Money,
    monthly_rate: Rate,
    grace_months: u32,
    warnings: &mut Vec<String>,
) -> IndicatorSummary {
    let total_interest: Money = schedule.iter().map(|e| e.interest).sum();
    let total_life: Money = schedule.iter().map(|e| e.life_insurance).sum();
    let total_risk: Money = schedule.iter().map(|e| e.risk_insurance).sum();
    let total_fees: Money = schedule.iter().map(|e| e.fees).sum();
    let total_cost = principal + total_interest + total_life + total_risk + total_fees;

    let monthly_payment = representative_payment(schedule, grace_months);

    let installments: Vec<Money> = schedule.iter().map(|e| e.installment).collect();
    let net_present_value = npv(&installments, monthly_rate, principal);

    let monthly_irr = solve_monthly_irr(&installments, principal, warnings);
    let annual_irr = annual_from_monthly(monthly_irr);

    IndicatorSummary {
        monthly_rate,
        monthly_payment,
        effective_annual_cost_rate: annual_irr,
        net_present_value,
        internal_rate_of_return: annual_irr,
        total_interest,
        total_cost,
    }
}

/// Mean installment over periods strictly after the grace phase; zero when
/// no such periods exist.
fn representative_payment(schedule: &[ScheduleEntry], grace_months: u32) -> Money {
    let post_grace = &schedule[schedule.len().min(grace_months as usize)..];
    if post_grace.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Money = post_grace.iter().map(|e| e.installment).sum();
    sum / Decimal::from(post_grace.len())
}

/// Discount the installment stream back to period zero at `rate`, using the
/// 1-based period index as the exponent, net of the disbursed principal.
pub fn npv(installments: &[Money], rate: Rate, principal: Money) -> Money {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut value = -principal;
    for cash_flow in installments {
        discount *= one_plus_r;
        value += cash_flow / discount;
    }
    value
}

/// Newton-Raphson solve for the monthly rate equating the discounted
/// installment stream to the disbursed principal.
///
/// At most `IRR_MAX_ITERATIONS` passes, clamping the rate to
/// `[IRR_MIN_RATE, IRR_MAX_RATE]` after every update. Hitting the cap or a
/// flat derivative is reported through `warnings`, never as an error; the
/// current estimate is returned as-is.
fn solve_monthly_irr(
    installments: &[Money],
    principal: Money,
    warnings: &mut Vec<String>,
) -> Rate {
    let mut rate = IRR_INITIAL_GUESS;

    for _ in 0..IRR_MAX_ITERATIONS {
        let mut npv_val = -principal;
        let mut dnpv = Decimal::ZERO;
        let one_plus_r = Decimal::ONE + rate;

        for (i, cash_flow) in installments.iter().enumerate() {
            let t = Decimal::from(i + 1);
            let factor = one_plus_r.powd(t);
            if factor.is_zero() {
                continue;
            }
            npv_val += cash_flow / factor;
            dnpv -= cash_flow * t / (factor * one_plus_r);
        }

        if npv_val.abs() < IRR_TOLERANCE {
            return rate;
        }

        if dnpv.is_zero() {
            warnings.push(format!(
                "IRR solve stalled on a flat derivative at monthly rate {rate}; keeping the current estimate"
            ));
            return rate;
        }

        rate = (rate - npv_val / dnpv).clamp(IRR_MIN_RATE, IRR_MAX_RATE);
    }

    warnings.push(format!(
        "IRR solve hit the {IRR_MAX_ITERATIONS}-iteration cap; returning the clamped estimate {rate}"
    ));
    rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::monthly_from_annual;
    use crate::schedule::{build_schedule, GracePolicy, ScheduleParams};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn clean_loan_params() -> ScheduleParams {
        ScheduleParams {
            principal: dec!(100_000),
            monthly_rate: monthly_from_annual(dec!(0.085)),
            term_months: 12,
            grace_policy: GracePolicy::None,
            grace_months: 0,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            life_insurance_rate_monthly: Decimal::ZERO,
            risk_insurance_rate_annual: Decimal::ZERO,
            fees_monthly: Decimal::ZERO,
            insured_principal: dec!(100_000),
        }
    }

    fn loaded_loan_params() -> ScheduleParams {
        let mut params = clean_loan_params();
        params.life_insurance_rate_monthly = dec!(0.0005);
        params.risk_insurance_rate_annual = dec!(0.012);
        params.fees_monthly = dec!(15);
        params
    }

    #[test]
    fn test_totals_and_total_cost() {
        let params = loaded_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        let interest: Money = schedule.iter().map(|e| e.interest).sum();
        let life: Money = schedule.iter().map(|e| e.life_insurance).sum();
        let risk: Money = schedule.iter().map(|e| e.risk_insurance).sum();
        let fees: Money = schedule.iter().map(|e| e.fees).sum();

        assert_eq!(summary.total_interest, interest);
        assert_eq!(summary.total_cost, dec!(100_000) + interest + life + risk + fees);
        assert_eq!(fees, dec!(180));
    }

    #[test]
    fn test_monthly_payment_is_post_grace_mean() {
        let mut params = loaded_loan_params();
        params.grace_policy = GracePolicy::PartialInterestOnly;
        params.grace_months = 3;

        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 3, &mut warnings);

        let post_grace: Money = schedule[3..].iter().map(|e| e.installment).sum();
        assert_eq!(summary.monthly_payment, post_grace / dec!(9));
    }

    #[test]
    fn test_monthly_payment_zero_when_grace_covers_term() {
        let mut params = clean_loan_params();
        params.grace_policy = GracePolicy::PartialInterestOnly;
        params.grace_months = 12;

        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 12, &mut warnings);

        assert_eq!(summary.monthly_payment, Decimal::ZERO);
    }

    #[test]
    fn test_npv_near_zero_without_extra_charges() {
        // Discounting pure French installments at the schedule's own TEM
        // must recover the principal.
        let params = clean_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        assert!(
            summary.net_present_value.abs() < dec!(0.05),
            "VAN should be ~0, got {}",
            summary.net_present_value
        );
    }

    #[test]
    fn test_npv_round_trip_matches_reported_value() {
        let params = loaded_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        let installments: Vec<Money> = schedule.iter().map(|e| e.installment).collect();
        let recomputed = npv(&installments, summary.monthly_rate, dec!(100_000));
        assert_eq!(summary.net_present_value, recomputed);
    }

    #[test]
    fn test_tir_recovers_the_contract_rate() {
        // With no insurance or fees the installment stream prices back to
        // the contract TEA.
        let params = clean_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        assert!(
            (summary.internal_rate_of_return - dec!(0.085)).abs() < dec!(0.001),
            "TIR should be ~8.5%, got {}",
            summary.internal_rate_of_return
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_tcea_exceeds_tea_when_costs_are_loaded() {
        let params = loaded_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        assert!(
            summary.effective_annual_cost_rate > dec!(0.085),
            "TCEA with charges should exceed the contract TEA, got {}",
            summary.effective_annual_cost_rate
        );
    }

    #[test]
    fn test_tcea_and_tir_share_one_solve() {
        let params = loaded_loan_params();
        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 0, &mut warnings);

        assert_eq!(
            summary.effective_annual_cost_rate,
            summary.internal_rate_of_return
        );
    }

    #[test]
    fn test_flat_derivative_is_a_warning_not_an_error() {
        // A total-grace-only schedule has an all-zero installment stream:
        // the derivative is flat from the first iteration.
        let mut params = clean_loan_params();
        params.grace_policy = GracePolicy::TotalCapitalizing;
        params.grace_months = 12;

        let schedule = build_schedule(&params);
        let mut warnings = Vec::new();
        let summary = summarize(&schedule, dec!(100_000), params.monthly_rate, 12, &mut warnings);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("flat derivative"), "{}", warnings[0]);
        // Best-effort estimate: the untouched initial guess, annualized.
        assert_eq!(
            summary.internal_rate_of_return,
            annual_from_monthly(dec!(0.01))
        );
    }

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let flows = vec![dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(&flows, Decimal::ZERO, dec!(100)), dec!(50));
    }
}
