//! Statistical comparison of experiment results

pub mod statistics;

pub use statistics::{
    analyze, bootstrap_confidence_intervals, cohens_d, power_analysis, t_test, BootstrapIntervals,
    DescriptiveStats, EffectSize, PowerAnalysis, StatisticalSummary, TTestResult,
};
