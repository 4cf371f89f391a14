pub mod aggregate;
pub mod classify;
pub mod normalize;
pub mod report;
pub mod standards;

use crate::engine::aggregate::{AggregateFailure, AggregationLaw};
use crate::engine::classify::Level;
use crate::engine::normalize::SubIndex;
use crate::engine::report::{BatchEntry, BatchReport};
use crate::engine::standards::Profile;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter name to measured value; `None` marks an explicit missing reading.
pub type MeasurementSet = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Root-mean-square of worst and weighted-average deviation; lower is better.
    #[default]
    Nemerow,
    /// Weighted geometric mean on a 0-100 scale; higher is better.
    Geometric,
}

impl Variant {
    /// Decimal places used when the index leaves the engine.
    pub fn precision(self) -> i32 {
        match self {
            Self::Nemerow => 3,
            Self::Geometric => 2,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nemerow => write!(f, "nemerow"),
            Self::Geometric => write!(f, "geometric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Ok,
    EmptyInput,
    InsufficientData,
    /// Geometric only: input was supplied but no parameter could be scored.
    NoUsableParameters,
    ZeroWeight,
    NonFiniteIndex,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::EmptyInput => "empty_input",
            Self::InsufficientData => "insufficient_data",
            Self::NoUsableParameters => "no_usable_parameters",
            Self::ZeroWeight => "zero_weight",
            Self::NonFiniteIndex => "non_finite_index",
        }
    }
}

/// Outcome of one assessment call. Holds unrounded values; rounding happens
/// in [`report::AssessmentView`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub variant: Variant,
    pub status: AssessmentStatus,
    pub message: Option<String>,
    pub index: Option<f64>,
    pub level: Level,
    pub si_max: Option<f64>,
    pub si_w_avg: Option<f64>,
    pub sub_indices: BTreeMap<String, SubIndex>,
}

impl Assessment {
    pub fn params_used(&self) -> usize {
        self.sub_indices.len()
    }

    fn without_index(
        variant: Variant,
        status: AssessmentStatus,
        message: String,
        sub_indices: BTreeMap<String, SubIndex>,
    ) -> Self {
        Self {
            variant,
            status,
            message: Some(message),
            index: None,
            level: Level::Unknown,
            si_max: None,
            si_w_avg: None,
            sub_indices,
        }
    }
}

/// Normalizes every known parameter, aggregates, and classifies. Every
/// well-typed input produces an `Assessment`; data problems show up in
/// `status`, never as an error.
pub fn assess(profile: &Profile, measurements: &MeasurementSet) -> Assessment {
    let variant = profile.variant;
    if measurements.is_empty() {
        return Assessment::without_index(
            variant,
            AssessmentStatus::EmptyInput,
            "no measurement data supplied".to_string(),
            BTreeMap::new(),
        );
    }

    let mut sub_indices = BTreeMap::new();
    for (param, value) in measurements {
        let Some(standard) = profile.standard(param) else {
            log::debug!("ignoring unknown parameter {param}");
            continue;
        };

        if let Some(sub_index) = normalize::normalize(param, *value, standard, variant) {
            sub_indices.insert(param.clone(), sub_index);
        }
    }

    let law = AggregationLaw::for_variant(variant);
    match aggregate::aggregate(law, &sub_indices, profile) {
        Ok(result) => Assessment {
            variant,
            status: AssessmentStatus::Ok,
            message: None,
            index: Some(result.index),
            level: classify::classify(Some(result.index), variant),
            si_max: result.si_max,
            si_w_avg: result.si_w_avg,
            sub_indices,
        },
        Err(AggregateFailure::InsufficientData { found: 0, .. })
            if variant == Variant::Geometric =>
        {
            log::debug!("no usable parameters in a non-empty measurement set");
            Assessment::without_index(
                variant,
                AssessmentStatus::NoUsableParameters,
                "no known parameter holds a usable value".to_string(),
                sub_indices,
            )
        }
        Err(failure @ AggregateFailure::InsufficientData { .. }) => {
            log::debug!("{failure}");
            Assessment::without_index(
                variant,
                AssessmentStatus::InsufficientData,
                failure.to_string(),
                sub_indices,
            )
        }
        Err(failure @ AggregateFailure::ZeroWeight) => {
            log::warn!("{failure}; check the configured weights");
            Assessment::without_index(
                variant,
                AssessmentStatus::ZeroWeight,
                failure.to_string(),
                sub_indices,
            )
        }
        Err(failure @ AggregateFailure::NonFinite) => {
            log::warn!("{failure}");
            Assessment::without_index(
                variant,
                AssessmentStatus::NonFiniteIndex,
                failure.to_string(),
                sub_indices,
            )
        }
    }
}

/// One input record for [`assess_batch`]. `data` is `Err` when the record
/// could not be read into a measurement set.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub source: Option<String>,
    pub data: Result<MeasurementSet, String>,
}

impl Record {
    pub fn new(source: Option<String>, data: MeasurementSet) -> Self {
        Self {
            source,
            data: Ok(data),
        }
    }

    pub fn malformed(source: Option<String>, error: impl Into<String>) -> Self {
        Self {
            source,
            data: Err(error.into()),
        }
    }
}

/// Assesses each record independently. A malformed record becomes an error
/// entry; it never stops the rest of the batch.
pub fn assess_batch(profile: &Profile, records: &[Record]) -> BatchReport {
    let entries = records
        .iter()
        .enumerate()
        .map(|(record, input)| match &input.data {
            Ok(measurements) => BatchEntry {
                record,
                source: input.source.clone(),
                assessment: Some(assess(profile, measurements)),
                error: None,
            },
            Err(error) => {
                log::warn!(
                    "skipping record {record}{}: {error}",
                    input
                        .source
                        .as_deref()
                        .map(|source| format!(" ({source})"))
                        .unwrap_or_default()
                );
                BatchEntry {
                    record,
                    source: input.source.clone(),
                    assessment: None,
                    error: Some(error.clone()),
                }
            }
        })
        .collect();

    BatchReport::new(profile.variant, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classify::SiLevel;
    use proptest::prelude::*;

    fn set(values: &[(&str, f64)]) -> MeasurementSet {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), Some(*value)))
            .collect()
    }

    fn healthy_coast() -> MeasurementSet {
        set(&[
            ("ph", 7.5),
            ("do_man", 10.0),
            ("luong_mua", 2000.0),
            ("nh3", 0.05),
            ("h2s", 0.005),
            ("nhiet_do_nuoc_bien", 25.0),
            ("bod5", 5.0),
            ("as", 2.0),
            ("cd", 0.1),
        ])
    }

    #[test]
    fn healthy_coast_is_very_safe() {
        let profile = Profile::builtin(Variant::Nemerow);
        let result = assess(profile, &healthy_coast());

        assert_eq!(result.status, AssessmentStatus::Ok);
        assert_eq!(result.params_used(), 9);
        assert_eq!(result.level, Level::Excellent);

        let index = result.index.expect("index");
        // si_max = 0.4 (sea temperature), weighted mean ~0.148
        assert!((index - 0.302).abs() < 0.0005, "{index}");
        assert!((result.si_max.expect("si_max") - 0.4).abs() < 1e-9);
        assert!((result.si_w_avg.expect("si_w_avg") - 0.148).abs() < 0.0005);
        assert_eq!(result.sub_indices["ph"].level, Some(SiLevel::Ideal));
    }

    #[test]
    fn sparse_nemerow_input_reports_partial_detail() {
        let profile = Profile::builtin(Variant::Nemerow);
        let result = assess(profile, &set(&[("ph", 12.0), ("nh3", 30.0), ("cd", 40.0)]));

        assert_eq!(result.status, AssessmentStatus::InsufficientData);
        assert_eq!(result.index, None);
        assert_eq!(result.level, Level::Unknown);
        assert_eq!(result.params_used(), 3);
        assert_eq!(result.sub_indices["cd"].level, Some(SiLevel::HighDanger));
    }

    #[test]
    fn unknown_and_missing_parameters_do_not_count() {
        let profile = Profile::builtin(Variant::Nemerow);
        let mut measurements = set(&[("ph", 7.5), ("nh3", 0.1), ("cd", 0.2), ("station_depth", 4.0)]);
        measurements.insert("as".to_string(), None);

        let result = assess(profile, &measurements);
        assert_eq!(result.status, AssessmentStatus::InsufficientData);
        assert_eq!(result.params_used(), 3);
        assert!(!result.sub_indices.contains_key("station_depth"));
    }

    #[test]
    fn empty_input_is_reported() {
        let result = assess(Profile::builtin(Variant::Geometric), &MeasurementSet::new());
        assert_eq!(result.status, AssessmentStatus::EmptyInput);
        assert_eq!(result.index, None);
    }

    #[test]
    fn geometric_profile_scores_single_parameter() {
        let profile = Profile::builtin(Variant::Geometric);
        let result = assess(profile, &set(&[("ph", 7.5)]));
        assert_eq!(result.status, AssessmentStatus::Ok);
        assert!((result.index.expect("index") - 101.0).abs() < 1e-9);
        assert_eq!(result.level, Level::Good);

        let result = assess(profile, &set(&[("nh3", 4.0)]));
        assert_eq!(result.sub_indices["nh3"].score, 0.0);
        assert!((result.index.expect("index") - 1.0).abs() < 1e-12);
        assert_eq!(result.level, Level::Bad);
    }

    #[test]
    fn geometric_profile_with_only_unknown_parameters_is_unknown() {
        let profile = Profile::builtin(Variant::Geometric);
        let result = assess(profile, &set(&[("luong_mua", 2000.0)]));
        assert_eq!(result.status, AssessmentStatus::NoUsableParameters);
        assert_eq!(result.level, Level::Unknown);
        assert_eq!(result.index, None);

        let mut missing = MeasurementSet::new();
        missing.insert("ph".to_string(), None);
        let result = assess(profile, &missing);
        assert_eq!(result.status, AssessmentStatus::NoUsableParameters);
    }

    #[test]
    fn nemerow_with_nothing_usable_stays_insufficient() {
        let result = assess(
            Profile::builtin(Variant::Nemerow),
            &set(&[("station_depth", 4.0)]),
        );
        assert_eq!(result.status, AssessmentStatus::InsufficientData);
    }

    #[test]
    fn huge_readings_never_report_ok_without_an_index() {
        let profile = Profile::builtin(Variant::Nemerow);
        let result = assess(
            profile,
            &set(&[("ph", 7.5), ("nh3", 0.1), ("h2s", 0.01), ("cd", 1e200)]),
        );
        assert_eq!(result.status, AssessmentStatus::Ok);
        assert!(result.index.is_some_and(f64::is_finite));
        assert_eq!(result.level, Level::Danger);

        let result = assess(
            profile,
            &set(&[("ph", 7.5), ("nh3", f64::MAX), ("h2s", f64::MAX), ("cd", f64::MAX)]),
        );
        assert_eq!(result.status, AssessmentStatus::NonFiniteIndex);
        assert_eq!(result.index, None);
        assert_eq!(result.level, Level::Unknown);
    }

    #[test]
    fn zero_weight_profile_is_flagged() {
        let mut profile = Profile::builtin(Variant::Nemerow).clone();
        for name in ["ph", "do_man", "nh3", "cd"] {
            profile.set_weight(name, 0.0);
        }
        let result = assess(
            &profile,
            &set(&[("ph", 7.0), ("do_man", 10.0), ("nh3", 0.1), ("cd", 0.1)]),
        );
        assert_eq!(result.status, AssessmentStatus::ZeroWeight);
        assert_eq!(result.index, None);
    }

    #[test]
    fn batch_isolates_malformed_records() {
        let profile = Profile::builtin(Variant::Nemerow);
        let records = vec![
            Record::new(Some("a.json".to_string()), healthy_coast()),
            Record::malformed(Some("b.json".to_string()), "expected a JSON object"),
            Record::new(None, set(&[("ph", 7.0)])),
        ];

        let report = assess_batch(profile, &records);
        assert_eq!(report.total, 3);
        assert_eq!(report.failed, 1);
        assert!(report.results[0].assessment.is_some());
        assert_eq!(
            report.results[1].error.as_deref(),
            Some("expected a JSON object")
        );
        assert_eq!(report.summary.get("excellent"), Some(&1));
        assert_eq!(report.summary.get("unknown"), Some(&1));
        assert!(report.average_index.is_some());
    }

    proptest! {
        #[test]
        fn assessment_is_idempotent(ph in 4.0..10.0_f64, nh3 in 0.0..2.0_f64, cd in 0.0..5.0_f64, tss in 0.0..200.0_f64) {
            let measurements = set(&[("ph", ph), ("nh3", nh3), ("cd", cd), ("tss", tss)]);
            for variant in [Variant::Nemerow, Variant::Geometric] {
                let profile = Profile::builtin(variant);
                let first = assess(profile, &measurements);
                let second = assess(profile, &measurements);
                prop_assert_eq!(first.index.map(f64::to_bits), second.index.map(f64::to_bits));
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn nemerow_gate_holds_for_extreme_values(a in 0.0..1e6_f64, b in 0.0..1e6_f64, c in 0.0..1e6_f64) {
            let result = assess(
                Profile::builtin(Variant::Nemerow),
                &set(&[("nh3", a), ("h2s", b), ("cd", c)]),
            );
            prop_assert_eq!(result.status, AssessmentStatus::InsufficientData);
            prop_assert_eq!(result.index, None);
        }
    }
}
