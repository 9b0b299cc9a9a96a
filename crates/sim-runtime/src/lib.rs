#![deny(warnings)]

//! Monte Carlo runtime: years, timelines and the NPV aggregator.
//!
//! A single [`ChaCha8Rng`] is threaded by `&mut` through every layer, so a
//! fixed seed reproduces a run exactly.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::{
    AssumptionSet, SeedPolicy, SimulationRun, Timeline, ValidationError, Variable, YearRecord,
};
use sim_econ::{discount_rate, draw_triangular, npv, EconError, YearAccounts, YearDraw};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while running a simulation.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Econ(#[from] EconError),
}

/// Raw NPV collection of a run.
///
/// Non-finite NPVs are kept in `npvs` so its length always equals the number
/// of timelines; `non_finite` counts them.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationOutcome {
    pub npvs: Vec<f64>,
    pub non_finite: usize,
    /// The first simulated timeline, itemised year by year.
    pub example: Timeline,
}

/// Build the random stream for a seed policy.
pub fn make_rng(seed: SeedPolicy) -> ChaCha8Rng {
    match seed {
        SeedPolicy::Fixed(s) => ChaCha8Rng::seed_from_u64(s),
        SeedPolicy::Entropy => ChaCha8Rng::from_entropy(),
    }
}

// Triples are validated once per call of the public entry points.
fn draw(assumptions: &AssumptionSet, v: Variable, rng: &mut ChaCha8Rng) -> Result<f64, SimError> {
    let a = assumptions.require(v)?;
    Ok(draw_triangular(a, rng))
}

/// Simulate one year given the growth multiplier compounded up to and
/// including this year.
pub fn simulate_year(
    assumptions: &AssumptionSet,
    cumulative_growth: f64,
    rng: &mut ChaCha8Rng,
) -> Result<YearRecord, SimError> {
    assumptions.validate()?;
    year_from(assumptions, cumulative_growth, rng)
}

fn year_from(
    assumptions: &AssumptionSet,
    cumulative_growth: f64,
    rng: &mut ChaCha8Rng,
) -> Result<YearRecord, SimError> {
    let production = draw(assumptions, Variable::AnnualProduction, rng)?;
    let production_cost = draw(assumptions, Variable::ProductionCost, rng)?;
    let commodity_price = draw(assumptions, Variable::CommodityPrice, rng)?;
    let currency_rate = draw(assumptions, Variable::CurrencyRate, rng)?;
    let real_interest_rate = draw(assumptions, Variable::RealInterestRate, rng)?;
    let tax_rate = draw(assumptions, Variable::TaxRate, rng)?;

    let d = YearDraw {
        production: production * cumulative_growth,
        production_cost,
        commodity_price,
        currency_rate,
        tax_rate,
    };
    let acc = YearAccounts::compute(&d);
    Ok(YearRecord {
        production: d.production,
        cumulative_growth,
        commodity_price,
        currency_rate,
        revenue: acc.revenue,
        production_cost,
        pretax_income: acc.pretax_income,
        taxes: acc.taxes,
        cashflow: acc.cashflow,
        real_interest_rate,
    })
}

/// Simulate `horizon_years` consecutive years with compounding growth.
pub fn simulate_timeline(
    assumptions: &AssumptionSet,
    horizon_years: u32,
    rng: &mut ChaCha8Rng,
) -> Result<Timeline, SimError> {
    assumptions.validate()?;
    timeline_from(assumptions, horizon_years, rng)
}

fn timeline_from(
    assumptions: &AssumptionSet,
    horizon_years: u32,
    rng: &mut ChaCha8Rng,
) -> Result<Timeline, SimError> {
    let mut timeline = Vec::with_capacity(horizon_years as usize);
    let mut cumulative_growth = 1.0;
    for _ in 0..horizon_years {
        let growth_pct = draw(assumptions, Variable::AnnualProductionGrowth, rng)?;
        cumulative_growth *= 1.0 + growth_pct / 100.0;
        timeline.push(year_from(assumptions, cumulative_growth, rng)?);
    }
    Ok(timeline)
}

/// Discount a timeline at the geometric mean of its own yearly rates.
pub fn timeline_npv(timeline: &[YearRecord]) -> Result<f64, SimError> {
    let rates: Vec<f64> = timeline.iter().map(|y| y.real_interest_rate).collect();
    let cashflows: Vec<f64> = timeline.iter().map(|y| y.cashflow).collect();
    let r = discount_rate(&rates)?;
    Ok(npv(r, &cashflows))
}

/// Run the experiment with a stream built from the run's seed policy.
pub fn run(sim: &SimulationRun) -> Result<SimulationOutcome, SimError> {
    let mut rng = make_rng(sim.seed());
    run_with_rng(sim, &mut rng)
}

/// Run the experiment on a caller-supplied stream.
pub fn run_with_rng(
    sim: &SimulationRun,
    rng: &mut ChaCha8Rng,
) -> Result<SimulationOutcome, SimError> {
    let n = sim.number_of_timelines();
    let years = sim.years_per_timeline();
    info!(timelines = n, years, seed = ?sim.seed(), "starting monte carlo run");

    let mut npvs = Vec::with_capacity(n as usize);
    let mut non_finite = 0usize;
    let mut example = Timeline::new();
    for i in 0..n {
        let timeline = timeline_from(sim.assumptions(), years, rng)?;
        let value = timeline_npv(&timeline)?;
        if !value.is_finite() {
            non_finite += 1;
            warn!(timeline = i, npv = value, "non-finite npv kept in results");
        }
        debug!(timeline = i, npv = value, "timeline done");
        npvs.push(value);
        if i == 0 {
            example = timeline;
        }
    }

    info!(results = npvs.len(), non_finite, "monte carlo run finished");
    Ok(SimulationOutcome {
        npvs,
        non_finite,
        example,
    })
}
