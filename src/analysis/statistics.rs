//! Two-sample comparison of defender rewards
//!
//! Effect size, Student t-test, seeded bootstrap percentile intervals and
//! post-hoc power from the noncentral t distribution.

use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF, Normal, StudentsT};
use statrs::statistics::{Data, Median, Statistics};

use crate::core::error::{AcpError, Result};
use crate::core::types::SimRng;

/// Floor applied to pooled standard deviations before dividing
pub const STD_FLOOR: f64 = 1e-10;

/// Simpson intervals used for the noncentral t integral (must be even)
const NCT_INTERVALS: usize = 2000;
/// Chi-square standard deviations covered on either side of the mean
const NCT_SPAN: f64 = 12.0;

/// Conventional magnitude bands for Cohen's d
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            EffectSize::Negligible
        } else if d < 0.5 {
            EffectSize::Small
        } else if d < 0.8 {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    pub p_value: f64,
    pub degrees_freedom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerAnalysis {
    pub alpha: f64,
    pub critical_t: f64,
    pub noncentrality: f64,
    pub achieved_power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapIntervals {
    pub mean_acp_ci: (f64, f64),
    pub mean_traditional_ci: (f64, f64),
    pub delta_ci: (f64, f64),
    pub cohens_d_ci: (f64, f64),
    pub confidence_level: f64,
    pub n_bootstrap: u32,
    pub random_seed: u64,
}

/// Full comparison of ACP rewards against traditional rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub acp: DescriptiveStats,
    pub traditional: DescriptiveStats,
    pub delta: f64,
    /// Delta relative to the traditional mean; None when that mean is zero
    pub percent_improvement: Option<f64>,
    pub cohens_d: f64,
    pub effect_size: EffectSize,
    pub t_test: TTestResult,
    pub significant: bool,
    pub power: PowerAnalysis,
    pub confidence_intervals: BootstrapIntervals,
}

fn require(samples: &[f64], min: usize, what: &str) -> Result<()> {
    if samples.len() < min {
        return Err(AcpError::InsufficientData(format!(
            "{} needs at least {} samples (got {})",
            what,
            min,
            samples.len()
        )));
    }
    Ok(())
}

fn distribution_error(e: impl std::fmt::Display) -> AcpError {
    AcpError::Distribution(e.to_string())
}

pub fn mean(samples: &[f64]) -> Result<f64> {
    require(samples, 1, "mean")?;
    Ok(samples.mean())
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std(samples: &[f64]) -> Result<f64> {
    require(samples, 2, "sample standard deviation")?;
    Ok(samples.std_dev())
}

pub fn median(samples: &[f64]) -> Result<f64> {
    require(samples, 1, "median")?;
    Ok(Data::new(samples.to_vec()).median())
}

pub fn describe(samples: &[f64]) -> Result<DescriptiveStats> {
    Ok(DescriptiveStats {
        n: samples.len(),
        mean: mean(samples)?,
        std: sample_std(samples)?,
        median: median(samples)?,
    })
}

/// Linear-interpolated percentile of already sorted data, `q` in [0, 100]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Cohen's d with pooled std `sqrt((s1² + s2²) / 2)`
pub fn cohens_d(a: &[f64], b: &[f64]) -> Result<f64> {
    let s1 = sample_std(a)?;
    let s2 = sample_std(b)?;
    let pooled = ((s1 * s1 + s2 * s2) / 2.0).sqrt().max(STD_FLOOR);
    Ok((mean(a)? - mean(b)?) / pooled)
}

/// Two-sided Student t-test assuming equal variances
pub fn t_test(a: &[f64], b: &[f64]) -> Result<TTestResult> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let s1 = sample_std(a)?;
    let s2 = sample_std(b)?;
    let diff = mean(a)? - mean(b)?;
    let df = n1 + n2 - 2.0;

    let pooled_var = ((n1 - 1.0) * s1 * s1 + (n2 - 1.0) * s2 * s2) / df;
    // Constant samples give se = 0; the floor keeps t finite
    let se = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt().max(STD_FLOOR);

    let t_statistic = diff / se;
    let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
    let p_value = (2.0 * (1.0 - dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0);

    Ok(TTestResult {
        t_statistic,
        p_value,
        degrees_freedom: df,
    })
}

/// CDF of the noncentral t distribution
///
/// Integrates `Φ(t·sqrt(x/ν) - δ)` against the χ²(ν) density with Simpson's
/// rule.
pub fn noncentral_t_cdf(t: f64, df: f64, ncp: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0).map_err(distribution_error)?;
    let chi = ChiSquared::new(df).map_err(distribution_error)?;

    let sd = (2.0 * df).sqrt();
    let lower = (df - NCT_SPAN * sd).max(0.0);
    let upper = df + NCT_SPAN * sd + 10.0;
    let h = (upper - lower) / NCT_INTERVALS as f64;

    let integrand = |x: f64| {
        let x = x.max(1e-12);
        normal.cdf(t * (x / df).sqrt() - ncp) * chi.pdf(x)
    };

    let mut total = integrand(lower) + integrand(upper);
    for i in 1..NCT_INTERVALS {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        total += weight * integrand(lower + i as f64 * h);
    }
    Ok((total * h / 3.0).clamp(0.0, 1.0))
}

/// Post-hoc power of the two-sided t-test for the observed effect
pub fn power_analysis(d: f64, n1: usize, n2: usize, alpha: f64) -> Result<PowerAnalysis> {
    if n1 < 2 || n2 < 2 {
        return Err(AcpError::InsufficientData(format!(
            "power analysis needs at least 2 samples per group (got {} and {})",
            n1, n2
        )));
    }
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let df = n1f + n2f - 2.0;
    let noncentrality = d.abs() * (n1f * n2f / (n1f + n2f)).sqrt();

    let critical_t = StudentsT::new(0.0, 1.0, df)
        .map_err(distribution_error)?
        .inverse_cdf(1.0 - alpha / 2.0);

    let achieved_power = (1.0 - noncentral_t_cdf(critical_t, df, noncentrality)?
        + noncentral_t_cdf(-critical_t, df, noncentrality)?)
    .clamp(0.0, 1.0);

    Ok(PowerAnalysis {
        alpha,
        critical_t,
        noncentrality,
        achieved_power,
    })
}

/// Percentile bootstrap intervals for both means, their delta and Cohen's d
///
/// Resamples use population variance for the pooled std; a resample with
/// zero spread gets d = 0.
pub fn bootstrap_confidence_intervals(
    acp: &[f64],
    traditional: &[f64],
    n_bootstrap: u32,
    confidence_level: f64,
    random_seed: u64,
) -> Result<BootstrapIntervals> {
    require(acp, 2, "bootstrap (acp)")?;
    require(traditional, 2, "bootstrap (traditional)")?;
    if n_bootstrap == 0 {
        return Err(AcpError::InsufficientData("bootstrap needs at least one resample".into()));
    }

    let mut rng = SimRng::seed_from_u64(random_seed);
    let capacity = n_bootstrap as usize;
    let mut boot_acp = Vec::with_capacity(capacity);
    let mut boot_trad = Vec::with_capacity(capacity);
    let mut boot_delta = Vec::with_capacity(capacity);
    let mut boot_d = Vec::with_capacity(capacity);

    let mut sample_a = vec![0.0; acp.len()];
    let mut sample_b = vec![0.0; traditional.len()];

    for _ in 0..n_bootstrap {
        for slot in sample_a.iter_mut() {
            *slot = acp[rng.gen_range(0..acp.len())];
        }
        for slot in sample_b.iter_mut() {
            *slot = traditional[rng.gen_range(0..traditional.len())];
        }

        let ma = sample_a.as_slice().mean();
        let mb = sample_b.as_slice().mean();
        let delta = ma - mb;
        let pooled =
            ((sample_a.as_slice().population_variance() + sample_b.as_slice().population_variance()) / 2.0)
                .sqrt();
        let d = if pooled > 0.0 { delta / pooled } else { 0.0 };

        boot_acp.push(ma);
        boot_trad.push(mb);
        boot_delta.push(delta);
        boot_d.push(d);
    }

    let alpha = 1.0 - confidence_level;
    let lower_q = alpha / 2.0 * 100.0;
    let upper_q = (1.0 - alpha / 2.0) * 100.0;
    let interval = |mut values: Vec<f64>| {
        values.sort_by(f64::total_cmp);
        (percentile_sorted(&values, lower_q), percentile_sorted(&values, upper_q))
    };

    Ok(BootstrapIntervals {
        mean_acp_ci: interval(boot_acp),
        mean_traditional_ci: interval(boot_trad),
        delta_ci: interval(boot_delta),
        cohens_d_ci: interval(boot_d),
        confidence_level,
        n_bootstrap,
        random_seed,
    })
}

/// Compare ACP rewards against traditional rewards
pub fn analyze(
    acp: &[f64],
    traditional: &[f64],
    confidence_level: f64,
    bootstrap_samples: u32,
    random_seed: u64,
) -> Result<StatisticalSummary> {
    let acp_stats = describe(acp)?;
    let trad_stats = describe(traditional)?;

    let delta = acp_stats.mean - trad_stats.mean;
    let percent_improvement = if trad_stats.mean == 0.0 {
        None
    } else {
        Some(delta / trad_stats.mean.abs() * 100.0)
    };

    let d = cohens_d(acp, traditional)?;
    let t = t_test(acp, traditional)?;
    let alpha = 1.0 - confidence_level;
    let power = power_analysis(d, acp.len(), traditional.len(), alpha)?;
    let confidence_intervals =
        bootstrap_confidence_intervals(acp, traditional, bootstrap_samples, confidence_level, random_seed)?;

    Ok(StatisticalSummary {
        acp: acp_stats,
        traditional: trad_stats,
        delta,
        percent_improvement,
        cohens_d: d,
        effect_size: EffectSize::from_cohens_d(d),
        significant: t.p_value < alpha,
        t_test: t,
        power,
        confidence_intervals,
    })
}
