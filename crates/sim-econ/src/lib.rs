#![deny(warnings)]

//! Economic models: sampling, yearly accounting and discounting.
//!
//! This module provides validated utilities for:
//! - Triangular draws via the inverse CDF
//! - Per-hectare yearly accounting with zero tax on loss years
//! - Geometric-mean discount rates and net present value

use rand::Rng;
use sim_core::{validate_assumption, Assumption, ValidationError, Variable};
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// The triple cannot describe a triangular distribution.
    #[error(transparent)]
    InvalidAssumption(#[from] ValidationError),
    /// A rate or cashflow series had no elements.
    #[error("empty series")]
    EmptySeries,
}

/// Map a uniform `u` in [0, 1] through the triangular inverse CDF.
///
/// The triple is assumed valid; see [`sample`] for the checked entry point.
///
/// Example:
/// let a = Assumption::new(0.0, 5.0, 10.0);
/// assert_eq!(triangular_quantile(&a, 0.5), 5.0);
pub fn triangular_quantile(a: &Assumption, u: f64) -> f64 {
    let range = a.range();
    if range <= 0.0 {
        return a.min;
    }
    let left = a.likely - a.min;
    let right = a.max - a.likely;
    // c = left / range is the CDF at the mode
    if u * range < left {
        a.min + (u * range * left).sqrt()
    } else {
        a.max - ((1.0 - u) * range * right).sqrt()
    }
}

/// Draw one value from the triangular distribution described by `a`.
///
/// Always consumes exactly one uniform from `rng`, even for degenerate
/// triples, so stream positions do not depend on input variance.
pub fn sample<R: Rng + ?Sized>(
    variable: Variable,
    a: &Assumption,
    rng: &mut R,
) -> Result<f64, EconError> {
    validate_assumption(variable, a)?;
    Ok(draw_triangular(a, rng))
}

/// Unchecked draw for triples already validated, e.g. by `SimulationRun::new`.
pub fn draw_triangular<R: Rng + ?Sized>(a: &Assumption, rng: &mut R) -> f64 {
    let u: f64 = rng.gen();
    triangular_quantile(a, u).clamp(a.min, a.max)
}

/// Tax due on a year's pretax income. Loss years pay nothing and there is no
/// carryforward.
///
/// Example:
/// assert_eq!(loss_free_tax(1000.0, 5.0), 50.0);
/// assert_eq!(loss_free_tax(-1000.0, 5.0), 0.0);
pub fn loss_free_tax(pretax_income: f64, tax_rate_pct: f64) -> f64 {
    if pretax_income > 0.0 {
        pretax_income * tax_rate_pct / 100.0
    } else {
        0.0
    }
}

/// Realized inputs of one year, already scaled by cumulative growth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearDraw {
    pub production: f64,
    pub production_cost: f64,
    pub commodity_price: f64,
    pub currency_rate: f64,
    pub tax_rate: f64,
}

/// Accounting lines derived from a [`YearDraw`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearAccounts {
    pub revenue: f64,
    pub pretax_income: f64,
    pub taxes: f64,
    pub cashflow: f64,
}

impl YearAccounts {
    /// revenue = production x price x fx; cashflow = pretax income - tax.
    pub fn compute(d: &YearDraw) -> Self {
        let revenue = d.production * d.commodity_price * d.currency_rate;
        let pretax_income = revenue - d.production_cost;
        let taxes = loss_free_tax(pretax_income, d.tax_rate);
        Self {
            revenue,
            pretax_income,
            taxes,
            cashflow: pretax_income - taxes,
        }
    }
}

/// Geometric mean of a series of positive factors.
///
/// Computed in log space so long horizons do not overflow the running
/// product. Non-positive factors yield a non-finite or zero result.
pub fn geometric_mean(values: &[f64]) -> Result<f64, EconError> {
    if values.is_empty() {
        return Err(EconError::EmptySeries);
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    Ok((log_sum / values.len() as f64).exp())
}

/// Single discount rate equivalent to a sequence of yearly rates in percent.
///
/// Returns `geometric_mean(1 + r/100) - 1` as a fraction.
///
/// Example:
/// let r = discount_rate(&[10.0, 10.0]).unwrap();
/// assert!((r - 0.10).abs() < 1e-12);
pub fn discount_rate(rates_pct: &[f64]) -> Result<f64, EconError> {
    let factors: Vec<f64> = rates_pct.iter().map(|r| 1.0 + r / 100.0).collect();
    Ok(geometric_mean(&factors)? - 1.0)
}

/// Net present value with the first cashflow undiscounted (t = 0).
///
/// Example:
/// let v = npv(0.10, &[100.0, 100.0, 100.0]);
/// assert!((v - 273.553719).abs() < 1e-6);
pub fn npv(rate: f64, cashflows: &[f64]) -> f64 {
    let base = 1.0 + rate;
    let mut factor = 1.0;
    let mut total = 0.0;
    for cf in cashflows {
        total += cf / factor;
        factor *= base;
    }
    total
}
