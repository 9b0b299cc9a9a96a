#![deny(warnings)]

//! Headless CLI: load assumptions, run the Monte Carlo engine, print the NPV distribution.

use anyhow::{bail, Context, Result};
use sim_core::{RunConfig, SimulationRun, Variable, YearRecord};
use sim_report::{format_currency, EmpiricalDistribution};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CURRENCY: &str = "R$";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    timelines: Option<i64>,
    years: Option<i64>,
    seed: Option<u64>,
    bins: Option<usize>,
    json: bool,
    version: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => out.config = Some(value(&mut it, &arg)?.into()),
            "--timelines" => out.timelines = Some(parse_value(&mut it, &arg)?),
            "--years" => out.years = Some(parse_value(&mut it, &arg)?),
            "--seed" => out.seed = Some(parse_value(&mut it, &arg)?),
            "--bins" => out.bins = Some(parse_value(&mut it, &arg)?),
            "--json" => out.json = true,
            "--version" => out.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

fn value<I: Iterator<Item = String>>(it: &mut I, flag: &str) -> Result<String> {
    it.next()
        .with_context(|| format!("{flag} expects a value"))
}

fn parse_value<T, I>(it: &mut I, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    I: Iterator<Item = String>,
{
    let raw = value(it, flag)?;
    raw.parse()
        .with_context(|| format!("{flag}: cannot parse {raw:?}"))
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut cfg: RunConfig = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => RunConfig::default(),
    };
    if let Some(n) = args.timelines {
        cfg.number_of_timelines = n;
    }
    if let Some(y) = args.years {
        cfg.years_per_timeline = y;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    Ok(cfg)
}

/// `RUST_LOG` directives when present and parseable, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn print_example(example: &[YearRecord]) {
    println!("Example timeline (R$/ha)");
    println!(
        "{:>4} {:>10} {:>8} {:>8} {:>7} {:>12} {:>10} {:>12} {:>10} {:>12} {:>7}",
        "Year", "Prod.", "Growth", "Price", "FX", "Revenue", "Cost", "Pretax", "Taxes", "Cashflow", "Rate%"
    );
    for (i, y) in example.iter().enumerate() {
        println!(
            "{:>4} {:>10.2} {:>8.4} {:>8.2} {:>7.2} {:>12.2} {:>10.2} {:>12.2} {:>10.2} {:>12.2} {:>7.2}",
            i + 1,
            y.production,
            y.cumulative_growth,
            y.commodity_price,
            y.currency_rate,
            y.revenue,
            y.production_cost,
            y.pretax_income,
            y.taxes,
            y.cashflow,
            y.real_interest_rate
        );
    }
    println!();
}

fn print_text(cfg: &RunConfig, dist: &EmpiricalDistribution) {
    println!("{:<40} {:>10} {:>10} {:>10}", "Assumption", "Minimum", "Most Likely", "Maximum");
    for v in Variable::ALL {
        if let Some(a) = cfg.assumptions.get(v) {
            println!("{:<40} {:>10} {:>10} {:>10}", v.label(), a.min, a.likely, a.max);
        }
    }
    println!();

    let s = dist.summary();
    let money = |x: Option<f64>| x.map_or_else(|| "n/a".to_string(), |v| format_currency(CURRENCY, v));
    println!(
        "Timelines: {} x {} years | finite: {} | non-finite: {}",
        cfg.number_of_timelines, cfg.years_per_timeline, s.count, s.non_finite
    );
    println!("Average NPV: {}", money(s.mean));
    println!("Std. deviation: {}", money(s.std_dev));
    println!("Range: {} .. {}", money(s.min), money(s.max));
    if let Some(p) = s.probability_of_loss {
        println!("Probability of loss: {:.1}%", p * 100.0);
    }
    println!();
    println!("{:>6} {:>20} {:>28}", "pct", "NPV/ha", "P(at least this NPV)");
    for (pct, v) in &s.percentiles {
        println!(
            "{:>5}% {:>20} {:>27.1}%",
            pct,
            format_currency(CURRENCY, *v),
            dist.survival(*v) * 100.0
        );
    }
}

fn main() -> Result<()> {
    // Logging setup; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "landval {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(?args, "starting CLI");

    let cfg = load_config(&args)?;
    let run = SimulationRun::try_from(cfg.clone())?;
    let outcome = sim_runtime::run(&run)?;
    let dist = EmpiricalDistribution::from_samples(&outcome.npvs);

    if args.json {
        let report = dist.report(args.bins, &outcome.example);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_example(&outcome.example);
        print_text(&cfg, &dist);
    }
    info!(results = outcome.npvs.len(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Result<Args> {
        parse_args(v.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags_override_defaults() {
        let a = args(&["--timelines", "200", "--years", "10", "--seed", "7", "--json"]).unwrap();
        let cfg = load_config(&a).unwrap();
        assert_eq!(cfg.number_of_timelines, 200);
        assert_eq!(cfg.years_per_timeline, 10);
        assert_eq!(cfg.seed, Some(7));
        assert!(a.json);
    }

    #[test]
    fn log_level_follows_rust_log() {
        use tracing::level_filters::LevelFilter;
        use tracing_subscriber::{Layer, Registry};

        let hint = |f: EnvFilter| <EnvFilter as Layer<Registry>>::max_level_hint(&f);
        assert_eq!(hint(log_filter(None)), Some(LevelFilter::INFO));
        assert_eq!(hint(log_filter(Some("warn".into()))), Some(LevelFilter::WARN));
        assert_eq!(hint(log_filter(Some("sim_runtime=debug".into()))), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn json_report_includes_example_timeline() {
        let cfg = load_config(&args(&["--timelines", "4", "--years", "7", "--seed", "3"]).unwrap()).unwrap();
        let out = sim_runtime::run(&SimulationRun::try_from(cfg).unwrap()).unwrap();
        let report = EmpiricalDistribution::from_samples(&out.npvs).report(None, &out.example);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        let years = json["example_timeline"].as_array().unwrap();
        assert_eq!(years.len(), 7);
        assert!(years[0].get("cashflow").is_some());
    }

    #[test]
    fn bad_flags_are_errors() {
        assert!(args(&["--timelines"]).is_err());
        assert!(args(&["--timelines", "many"]).is_err());
        assert!(args(&["--frobnicate"]).is_err());
    }

    #[test]
    fn negative_count_is_rejected_by_validation() {
        let a = args(&["--timelines", "-5"]).unwrap();
        let cfg = load_config(&a).unwrap();
        assert!(SimulationRun::try_from(cfg).is_err());
    }

    #[test]
    fn yaml_config_parses() {
        let text = r#"
number_of_timelines: 25
years_per_timeline: 5
seed: 11
assumptions:
  annual_production: { min: 25, likely: 55, max: 70 }
  annual_production_growth: { min: 0, likely: 1, max: 1.5 }
  production_cost: { min: 1800, likely: 2500, max: 3200 }
  commodity_price: { min: 9.2, likely: 20.8, max: 40 }
  currency_rate: { min: 3, likely: 5, max: 12 }
  real_interest_rate: { min: 2, likely: 5, max: 15 }
  tax_rate: { min: 5, likely: 5, max: 5 }
"#;
        let cfg: RunConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(cfg.assumptions, sim_core::AssumptionSet::default());
        let run = SimulationRun::try_from(cfg).unwrap();
        let out = sim_runtime::run(&run).unwrap();
        assert_eq!(out.npvs.len(), 25);
    }

    #[test]
    fn bundled_assumptions_file_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/assumptions.yaml");
        let a = Args {
            config: Some(path),
            timelines: Some(10),
            ..Args::default()
        };
        let cfg = load_config(&a).unwrap();
        assert_eq!(cfg.number_of_timelines, 10);
        assert_eq!(cfg.years_per_timeline, 20);
        assert_eq!(cfg.seed, Some(42));
        SimulationRun::try_from(cfg).unwrap();
    }
}
