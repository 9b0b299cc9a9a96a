#![deny(warnings)]

//! Core domain models and invariants for the land valuation engine.
//!
//! This crate defines the serializable input types of a Monte Carlo run
//! (assumption triples, run configuration) and the per-year records the
//! engine produces, with validation helpers that guarantee basic invariants
//! before any sampling happens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Default number of simulated timelines per run.
pub const DEFAULT_TIMELINES: i64 = 1000;
/// Default horizon of a timeline, in years.
pub const DEFAULT_YEARS: i64 = 20;

/// The model inputs drawn from a triangular distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Harvest in bags per hectare per year.
    AnnualProduction,
    /// Yearly growth of production, in percent.
    AnnualProductionGrowth,
    /// Production cost in local currency per hectare per year.
    ProductionCost,
    /// Commodity price in USD per bag.
    CommodityPrice,
    /// Exchange rate, local currency per USD.
    CurrencyRate,
    /// Real interest rate used for discounting, in percent per year.
    RealInterestRate,
    /// Tax rate on profit, in percent.
    TaxRate,
}

impl Variable {
    /// Every variable, in the order the engine draws them.
    pub const ALL: [Variable; 7] = [
        Variable::AnnualProduction,
        Variable::AnnualProductionGrowth,
        Variable::ProductionCost,
        Variable::CommodityPrice,
        Variable::CurrencyRate,
        Variable::RealInterestRate,
        Variable::TaxRate,
    ];

    /// Human-readable label with units.
    pub fn label(self) -> &'static str {
        match self {
            Variable::AnnualProduction => "Annual Production (Bags/Ha.Year)",
            Variable::AnnualProductionGrowth => "Annual Production Growth (% Yearly)",
            Variable::ProductionCost => "Production Cost (R$/Ha.Year)",
            Variable::CommodityPrice => "Commodity Price ($/Bag)",
            Variable::CurrencyRate => "Dollar Price (R$/$)",
            Variable::RealInterestRate => "Real Interest Rate (% Yearly)",
            Variable::TaxRate => "Tax Rate on Profit (%)",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A (min, most likely, max) triple describing a triangular distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    /// Lower bound.
    pub min: f64,
    /// Mode of the distribution.
    pub likely: f64,
    /// Upper bound.
    pub max: f64,
}

impl Assumption {
    pub const fn new(min: f64, likely: f64, max: f64) -> Self {
        Self { min, likely, max }
    }

    /// A degenerate triple that always yields `value`.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Width of the support.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Validation errors for run inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A triple is out of order or contains a non-finite bound.
    #[error("invalid assumption for {variable}: {reason}")]
    InvalidAssumption {
        variable: Variable,
        reason: &'static str,
    },
    /// A required variable has no triple.
    #[error("missing assumption: {0}")]
    MissingAssumption(Variable),
    /// Timeline count or horizon is not a positive integer.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Validate a single triple.
pub fn validate_assumption(variable: Variable, a: &Assumption) -> Result<(), ValidationError> {
    if !(a.min.is_finite() && a.likely.is_finite() && a.max.is_finite()) {
        return Err(ValidationError::InvalidAssumption {
            variable,
            reason: "bounds must be finite",
        });
    }
    if a.min > a.max {
        return Err(ValidationError::InvalidAssumption {
            variable,
            reason: "min exceeds max",
        });
    }
    if a.likely < a.min || a.likely > a.max {
        return Err(ValidationError::InvalidAssumption {
            variable,
            reason: "likely outside [min, max]",
        });
    }
    Ok(())
}

/// Mapping of every model variable to its triple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssumptionSet(BTreeMap<Variable, Assumption>);

impl AssumptionSet {
    /// An empty set; fill it with [`AssumptionSet::with`] or [`AssumptionSet::insert`].
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, variable: Variable, assumption: Assumption) -> Self {
        self.insert(variable, assumption);
        self
    }

    /// Insert or replace a triple, returning the previous one.
    pub fn insert(&mut self, variable: Variable, assumption: Assumption) -> Option<Assumption> {
        self.0.insert(variable, assumption)
    }

    pub fn get(&self, variable: Variable) -> Option<&Assumption> {
        self.0.get(&variable)
    }

    /// Like [`AssumptionSet::get`] but reports a missing variable as an error.
    pub fn require(&self, variable: Variable) -> Result<&Assumption, ValidationError> {
        self.get(variable)
            .ok_or(ValidationError::MissingAssumption(variable))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, &Assumption)> {
        self.0.iter().map(|(v, a)| (*v, a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every variable is present and every triple is well ordered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for v in Variable::ALL {
            let a = self.require(v)?;
            validate_assumption(v, a)?;
        }
        Ok(())
    }
}

impl Default for AssumptionSet {
    /// Reference assumptions for a soybean hectare priced in BRL.
    fn default() -> Self {
        Self::empty()
            .with(Variable::AnnualProduction, Assumption::new(25.0, 55.0, 70.0))
            .with(Variable::AnnualProductionGrowth, Assumption::new(0.0, 1.0, 1.5))
            .with(Variable::ProductionCost, Assumption::new(1800.0, 2500.0, 3200.0))
            .with(Variable::CommodityPrice, Assumption::new(9.2, 20.8, 40.0))
            .with(Variable::CurrencyRate, Assumption::new(3.0, 5.0, 12.0))
            .with(Variable::RealInterestRate, Assumption::new(2.0, 5.0, 15.0))
            .with(Variable::TaxRate, Assumption::fixed(5.0))
    }
}

/// Source of randomness for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedPolicy {
    /// Deterministic stream seeded from the given value.
    Fixed(u64),
    /// Seeded from operating system entropy.
    Entropy,
}

impl From<Option<u64>> for SeedPolicy {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(SeedPolicy::Entropy, SeedPolicy::Fixed)
    }
}

/// Unvalidated run configuration as supplied by a form or config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub assumptions: AssumptionSet,
    /// Number of Monte Carlo timelines.
    pub number_of_timelines: i64,
    /// Years per timeline.
    pub years_per_timeline: i64,
    /// Fixed seed; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            assumptions: AssumptionSet::default(),
            number_of_timelines: DEFAULT_TIMELINES,
            years_per_timeline: DEFAULT_YEARS,
            seed: None,
        }
    }
}

/// A validated Monte Carlo experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationRun {
    assumptions: AssumptionSet,
    number_of_timelines: u32,
    years_per_timeline: u32,
    seed: SeedPolicy,
}

impl SimulationRun {
    /// Validate inputs and build a run.
    pub fn new(
        assumptions: AssumptionSet,
        number_of_timelines: i64,
        years_per_timeline: i64,
        seed: SeedPolicy,
    ) -> Result<Self, ValidationError> {
        let number_of_timelines = positive_count("number_of_timelines", number_of_timelines)?;
        let years_per_timeline = positive_count("years_per_timeline", years_per_timeline)?;
        assumptions.validate()?;
        Ok(Self {
            assumptions,
            number_of_timelines,
            years_per_timeline,
            seed,
        })
    }

    pub fn assumptions(&self) -> &AssumptionSet {
        &self.assumptions
    }

    pub fn number_of_timelines(&self) -> u32 {
        self.number_of_timelines
    }

    pub fn years_per_timeline(&self) -> u32 {
        self.years_per_timeline
    }

    pub fn seed(&self) -> SeedPolicy {
        self.seed
    }
}

impl TryFrom<RunConfig> for SimulationRun {
    type Error = ValidationError;

    fn try_from(cfg: RunConfig) -> Result<Self, Self::Error> {
        SimulationRun::new(
            cfg.assumptions,
            cfg.number_of_timelines,
            cfg.years_per_timeline,
            cfg.seed.into(),
        )
    }
}

fn positive_count(field: &str, value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::InvalidConfiguration(format!(
            "{field} must be positive, got {value}"
        )));
    }
    u32::try_from(value).map_err(|_| {
        ValidationError::InvalidConfiguration(format!("{field} is too large: {value}"))
    })
}

/// One simulated year of accounting for a single hectare.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    /// Production after growth scaling, bags/ha.
    pub production: f64,
    /// Compounded growth multiplier applied to production.
    pub cumulative_growth: f64,
    pub commodity_price: f64,
    pub currency_rate: f64,
    pub revenue: f64,
    pub production_cost: f64,
    pub pretax_income: f64,
    pub taxes: f64,
    pub cashflow: f64,
    /// Real interest rate drawn for this year, in percent.
    pub real_interest_rate: f64,
}

/// Chronologically ordered years of one simulated path.
pub type Timeline = Vec<YearRecord>;
