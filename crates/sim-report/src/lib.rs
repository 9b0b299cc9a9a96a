#![deny(warnings)]

//! Empirical summaries of an NPV sample for renderers.
//!
//! Everything here is non-parametric: statistics come from the sorted
//! finite samples. Non-finite values are counted but left out.

use serde::{Deserialize, Serialize};
use sim_core::{Timeline, YearRecord};

/// Percentiles reported in [`DistributionSummary`].
pub const SUMMARY_PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 75.0, 95.0];

/// Sorted finite samples of a distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct EmpiricalDistribution {
    sorted: Vec<f64>,
    non_finite: usize,
}

/// One equal-width histogram bin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// count / (n * width); integrates to 1 over all bins.
    pub density: f64,
}

/// A step of the complementary cumulative distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CcdfPoint {
    pub value: f64,
    /// P(X >= value).
    pub probability: f64,
}

/// Headline statistics of a distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub non_finite: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// (percent, value) pairs.
    pub percentiles: Vec<(f64, f64)>,
    pub probability_of_loss: Option<f64>,
}

/// Numeric series for a density chart and a complementary-CDF chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: DistributionSummary,
    pub histogram: Vec<HistogramBin>,
    pub ccdf: Vec<CcdfPoint>,
    /// One itemised timeline shown next to the distribution.
    #[serde(default)]
    pub example_timeline: Timeline,
}

impl EmpiricalDistribution {
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        let non_finite = samples.len() - sorted.len();
        Self { sorted, non_finite }
    }

    /// Number of finite samples.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn non_finite(&self) -> usize {
        self.non_finite
    }

    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.sorted.iter().sum::<f64>() / self.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let ss: f64 = self.sorted.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (n - 1) as f64).sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        self.sorted.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.sorted.last().copied()
    }

    /// Percentile `p` in [0, 100] with linear interpolation between ranks.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.is_empty() || !p.is_finite() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = p / 100.0 * (self.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        Some(self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac)
    }

    /// Empirical survival function P(X >= x).
    pub fn survival(&self, x: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let below = self.sorted.partition_point(|v| *v < x);
        (self.len() - below) as f64 / self.len() as f64
    }

    /// P(X < 0).
    pub fn probability_of_loss(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(1.0 - self.survival(0.0))
    }

    /// One point per distinct value, ascending.
    pub fn ccdf_series(&self) -> Vec<CcdfPoint> {
        let n = self.len() as f64;
        let mut out: Vec<CcdfPoint> = Vec::new();
        for (i, v) in self.sorted.iter().enumerate() {
            if out.last().is_some_and(|p| p.value == *v) {
                continue;
            }
            out.push(CcdfPoint {
                value: *v,
                probability: (self.len() - i) as f64 / n,
            });
        }
        out
    }

    /// Equal-width bins spanning [min, max].
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        let (Some(lo), Some(hi)) = (self.min(), self.max()) else {
            return Vec::new();
        };
        let bins = bins.max(1);
        let n = self.len() as f64;
        if hi <= lo {
            // all samples identical: a single unit-width bin centred on the value
            return vec![HistogramBin {
                lower: lo - 0.5,
                upper: lo + 0.5,
                count: self.len(),
                density: 1.0,
            }];
        }
        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in &self.sorted {
            let idx = ((v - lo) / width) as usize;
            counts[idx.min(bins - 1)] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lo + width * i as f64,
                upper: lo + width * (i + 1) as f64,
                count,
                density: count as f64 / (n * width),
            })
            .collect()
    }

    /// Histogram with Sturges' bin count.
    pub fn histogram_auto(&self) -> Vec<HistogramBin> {
        self.histogram(sturges_bins(self.len()))
    }

    pub fn summary(&self) -> DistributionSummary {
        DistributionSummary {
            count: self.len(),
            non_finite: self.non_finite,
            mean: self.mean(),
            std_dev: self.std_dev(),
            min: self.min(),
            max: self.max(),
            percentiles: SUMMARY_PERCENTILES
                .iter()
                .filter_map(|p| self.percentile(*p).map(|v| (*p, v)))
                .collect(),
            probability_of_loss: self.probability_of_loss(),
        }
    }

    /// Summary plus chart series; `bins = None` picks Sturges' rule.
    pub fn report(&self, bins: Option<usize>, example: &[YearRecord]) -> Report {
        Report {
            summary: self.summary(),
            histogram: match bins {
                Some(b) => self.histogram(b),
                None => self.histogram_auto(),
            },
            ccdf: self.ccdf_series(),
            example_timeline: example.to_vec(),
        }
    }
}

/// ceil(log2 n) + 1, at least one bin.
pub fn sturges_bins(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    (n as f64).log2().ceil() as usize + 1
}

/// Format an amount with thousands separators and two decimals, e.g. `R$1,234.00`.
pub fn format_currency(symbol: &str, value: f64) -> String {
    if !value.is_finite() {
        return format!("{symbol}{value}");
    }
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dist(v: &[f64]) -> EmpiricalDistribution {
        EmpiricalDistribution::from_samples(v)
    }

    #[test]
    fn mean_and_spread() {
        let d = dist(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(d.mean(), Some(2.5));
        let sd = d.std_dev().unwrap();
        assert!((sd - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(d.min(), Some(1.0));
        assert_eq!(d.max(), Some(4.0));
    }

    #[test]
    fn percentiles_interpolate() {
        let d = dist(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(d.percentile(0.0), Some(10.0));
        assert_eq!(d.percentile(50.0), Some(30.0));
        assert_eq!(d.percentile(100.0), Some(50.0));
        assert_eq!(d.percentile(62.5), Some(35.0));
        assert_eq!(dist(&[]).percentile(50.0), None);
    }

    #[test]
    fn survival_counts_ties() {
        let d = dist(&[-5.0, 0.0, 0.0, 10.0]);
        assert_eq!(d.survival(-10.0), 1.0);
        assert_eq!(d.survival(-5.0), 1.0);
        assert_eq!(d.survival(0.0), 0.75);
        assert_eq!(d.survival(1.0), 0.25);
        assert_eq!(d.survival(10.0), 0.25);
        assert_eq!(d.survival(11.0), 0.0);
        assert_eq!(d.probability_of_loss(), Some(0.25));
    }

    #[test]
    fn ccdf_collapses_duplicates() {
        let d = dist(&[3.0, 1.0, 3.0, 2.0]);
        let s = d.ccdf_series();
        let pairs: Vec<(f64, f64)> = s.iter().map(|p| (p.value, p.probability)).collect();
        assert_eq!(pairs, vec![(1.0, 1.0), (2.0, 0.75), (3.0, 0.5)]);
    }

    #[test]
    fn non_finite_samples_are_counted_not_used() {
        let d = dist(&[1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.non_finite(), 2);
        assert_eq!(d.mean(), Some(2.0));
        let s = d.summary();
        assert_eq!(s.count, 2);
        assert_eq!(s.non_finite, 2);
    }

    #[test]
    fn histogram_density_integrates_to_one() {
        let samples: Vec<f64> = (0..100).map(|i| (i * i) as f64).collect();
        let d = dist(&samples);
        let h = d.histogram(8);
        assert_eq!(h.len(), 8);
        assert_eq!(h.iter().map(|b| b.count).sum::<usize>(), 100);
        let area: f64 = h.iter().map(|b| b.density * (b.upper - b.lower)).sum();
        assert!((area - 1.0).abs() < 1e-9);
        assert_eq!(d.histogram_auto().len(), sturges_bins(100));
        assert_eq!(sturges_bins(100), 8);
    }

    #[test]
    fn histogram_of_constant_sample() {
        let h = dist(&[7.0, 7.0, 7.0]).histogram(10);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].count, 3);
        assert!(dist(&[]).histogram(10).is_empty());
    }

    #[test]
    fn summary_serializes() {
        let year = YearRecord {
            production: 50.0,
            cumulative_growth: 1.0,
            commodity_price: 20.0,
            currency_rate: 5.0,
            revenue: 5000.0,
            production_cost: 2000.0,
            pretax_income: 3000.0,
            taxes: 150.0,
            cashflow: 2850.0,
            real_interest_rate: 5.0,
        };
        let r = dist(&[1.0, 2.0, 3.0]).report(Some(2), &[year, year]);
        let s = serde_json::to_string(&r).unwrap();
        let back: Report = serde_json::from_str(&s).unwrap();
        assert_eq!(back.summary.count, 3);
        assert_eq!(back.summary.mean, Some(2.0));
        assert_eq!(back.histogram.len(), 2);
        assert_eq!(back.ccdf.len(), 3);
        assert_eq!(back.example_timeline, vec![year, year]);
        assert_eq!(back.summary.percentiles.len(), SUMMARY_PERCENTILES.len());
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency("R$", 1234.0), "R$1,234.00");
        assert_eq!(format_currency("R$", 12.346), "R$12.35");
        assert_eq!(format_currency("R$", -1234567.891), "-R$1,234,567.89");
        assert_eq!(format_currency("R$", 0.0), "R$0.00");
        assert_eq!(format_currency("R$", 999.999), "R$1,000.00");
    }

    proptest! {
        #[test]
        fn survival_is_non_increasing(xs in proptest::collection::vec(-1e6f64..1e6, 1..200)) {
            let d = dist(&xs);
            let mut xs = xs;
            xs.sort_by(f64::total_cmp);
            prop_assert_eq!(d.survival(xs[0]), 1.0);
            prop_assert!(d.survival(xs[xs.len() - 1]) >= 1.0 / xs.len() as f64);
            let mut prev = 1.0;
            for x in &xs {
                let s = d.survival(*x);
                prop_assert!(s <= prev);
                prev = s;
            }
        }
    }
}
