//! Amortization schedule construction.
//!
//! Two phases concatenated in period order: an optional grace phase driven by
//! the grace policy, then the French (fixed-installment) phase over the
//! remaining term. The running balance is threaded through folds as an
//! explicit accumulator, so each period function is a pure transformation of
//! the prior state.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::rates::MONTHS_PER_YEAR;
use crate::types::{Money, Rate};

/// Grace-period policy applied before amortization begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GracePolicy {
    /// No grace rows are emitted; the configured grace-month count still
    /// shortens the amortization phase.
    None,
    /// Interest, insurance and fees are paid each grace period; the
    /// principal is untouched.
    PartialInterestOnly,
    /// Nothing is paid; interest capitalizes into the balance.
    TotalCapitalizing,
}

/// One row of the amortization table.
///
/// Invariant: `closing_balance = opening_balance - principal` plus the
/// capitalized interest during a total-grace period; the final row always
/// closes at exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based period number, contiguous across grace and amortization.
    pub period: u32,
    /// Start date advanced by `period - 1` calendar months.
    pub due_date: NaiveDate,
    pub opening_balance: Money,
    pub interest: Money,
    /// Capital amortized this period.
    pub principal: Money,
    pub life_insurance: Money,
    pub risk_insurance: Money,
    pub fees: Money,
    /// Total charged to the borrower this period.
    pub installment: Money,
    pub closing_balance: Money,
}

/// Parameters for one schedule build.
#[derive(Debug, Clone)]
pub struct ScheduleParams {
    /// Balance to amortize, already net of any subsidy.
    pub principal: Money,
    /// Monthly effective rate (TEM).
    pub monthly_rate: Rate,
    pub term_months: u32,
    pub grace_policy: GracePolicy,
    pub grace_months: u32,
    pub start_date: NaiveDate,
    /// Monthly life-insurance rate, applied to the outstanding balance.
    pub life_insurance_rate_monthly: Rate,
    /// Annual risk-insurance rate, applied to the insured principal.
    pub risk_insurance_rate_annual: Rate,
    pub fees_monthly: Money,
    /// Original pre-subsidy principal. Risk insurance is always charged on
    /// this amount, never on the amortizing balance.
    pub insured_principal: Money,
}

/// Accumulator threaded through the period folds.
#[derive(Debug)]
struct BuildState {
    balance: Money,
    entries: Vec<ScheduleEntry>,
}

impl BuildState {
    fn new(balance: Money, capacity: usize) -> Self {
        BuildState {
            balance,
            entries: Vec::with_capacity(capacity),
        }
    }
}

/// Build the full amortization table: grace phase (if any) followed by the
/// fixed-installment French phase. Entries come back in period order.
///
/// When the grace phase consumes the entire term the grace-only schedule is
/// returned as-is; a zero-length amortization phase is not an error.
pub fn build_schedule(params: &ScheduleParams) -> Vec<ScheduleEntry> {
    let state = BuildState::new(params.principal, params.term_months as usize);

    // Grace rows exist only under an active grace policy, but the configured
    // grace months always come off the amortization phase.
    let (state, emitted_grace) = match params.grace_policy {
        GracePolicy::None => (state, 0),
        GracePolicy::PartialInterestOnly => (
            (1..=params.grace_months)
                .fold(state, |st, period| partial_grace_period(params, st, period)),
            params.grace_months,
        ),
        GracePolicy::TotalCapitalizing => (
            (1..=params.grace_months)
                .fold(state, |st, period| total_grace_period(params, st, period)),
            params.grace_months,
        ),
    };

    let remaining = params.term_months.saturating_sub(params.grace_months);
    if remaining == 0 {
        return state.entries;
    }

    let base_payment = french_payment(state.balance, params.monthly_rate, remaining);
    let state = (1..=remaining).fold(state, |st, offset| {
        amortization_period(params, st, base_payment, emitted_grace, offset, remaining)
    });

    state.entries
}

/// Fixed base installment (principal + interest only) over `months` periods:
/// `balance * r / (1 - (1 + r)^(-n))`. Degrades to straight-line
/// `balance / n` when the rate is zero.
pub fn french_payment(balance: Money, rate: Rate, months: u32) -> Money {
    let n = Decimal::from(months);
    if rate.is_zero() {
        return balance / n;
    }
    balance * rate / (Decimal::ONE - (Decimal::ONE + rate).powd(-n))
}

fn due_date(start: NaiveDate, period: u32) -> NaiveDate {
    start + Months::new(period - 1)
}

fn monthly_risk_premium(params: &ScheduleParams) -> Money {
    params.insured_principal * params.risk_insurance_rate_annual / MONTHS_PER_YEAR
}

/// Total grace: interest accrues into the balance, nothing is paid. The
/// accrued interest is recorded; the paid columns stay at zero.
fn total_grace_period(params: &ScheduleParams, mut st: BuildState, period: u32) -> BuildState {
    let opening = st.balance;
    let interest = opening * params.monthly_rate;
    let closing = opening * (Decimal::ONE + params.monthly_rate);

    st.entries.push(ScheduleEntry {
        period,
        due_date: due_date(params.start_date, period),
        opening_balance: opening,
        interest,
        principal: Decimal::ZERO,
        life_insurance: Decimal::ZERO,
        risk_insurance: Decimal::ZERO,
        fees: Decimal::ZERO,
        installment: Decimal::ZERO,
        closing_balance: closing,
    });
    st.balance = closing;
    st
}

/// Partial grace: interest, insurance and fees are paid; the balance is
/// carried unchanged into the next period.
fn partial_grace_period(params: &ScheduleParams, mut st: BuildState, period: u32) -> BuildState {
    let opening = st.balance;
    let interest = opening * params.monthly_rate;
    let life_insurance = opening * params.life_insurance_rate_monthly;
    let risk_insurance = monthly_risk_premium(params);
    let installment = interest + life_insurance + risk_insurance + params.fees_monthly;

    st.entries.push(ScheduleEntry {
        period,
        due_date: due_date(params.start_date, period),
        opening_balance: opening,
        interest,
        principal: Decimal::ZERO,
        life_insurance,
        risk_insurance,
        fees: params.fees_monthly,
        installment,
        closing_balance: opening,
    });
    st
}

/// One French-method period.
///
/// The final period pays the opening balance exactly and re-derives the base
/// installment as principal + interest, absorbing any rounding drift so the
/// schedule closes at zero. The balance clamps at zero should rounding ever
/// push it negative.
fn amortization_period(
    params: &ScheduleParams,
    mut st: BuildState,
    base_payment: Money,
    emitted_grace: u32,
    offset: u32,
    remaining: u32,
) -> BuildState {
    let period = emitted_grace + offset;
    let opening = st.balance;
    let interest = opening * params.monthly_rate;

    let (principal, base) = if offset == remaining {
        (opening, opening + interest)
    } else {
        (base_payment - interest, base_payment)
    };

    let closing = (opening - principal).max(Decimal::ZERO);

    let life_insurance = opening * params.life_insurance_rate_monthly;
    let risk_insurance = monthly_risk_premium(params);
    let installment = base + life_insurance + risk_insurance + params.fees_monthly;

    st.entries.push(ScheduleEntry {
        period,
        due_date: due_date(params.start_date, period),
        opening_balance: opening,
        interest,
        principal,
        life_insurance,
        risk_insurance,
        fees: params.fees_monthly,
        installment,
        closing_balance: closing,
    });
    st.balance = closing;
    st
}
