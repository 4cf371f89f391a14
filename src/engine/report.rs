use crate::config::{Config, FailOn};
use crate::engine::classify::{Level, Severity, TierLabel};
use crate::engine::normalize::{NormalizationLaw, SubIndex};
use crate::engine::standards::{Profile, StandardKind};
use crate::engine::{Assessment, AssessmentStatus, Variant};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Presentation rounding. Engine values stay unrounded.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Serialize)]
pub struct SubIndexView {
    pub value: f64,
    pub si: f64,
    pub law: NormalizationLaw,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<&'static TierLabel>,
}

impl SubIndexView {
    fn new(sub_index: &SubIndex, variant: Variant) -> Self {
        Self {
            value: sub_index.value,
            si: round_to(sub_index.score, variant.precision()),
            law: sub_index.law,
            level: sub_index.level.map(|level| level.label()),
        }
    }
}

/// Serializable, rounded form of an [`Assessment`].
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub variant: Variant,
    pub status: AssessmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub eai: Option<f64>,
    pub level: Level,
    pub label: &'static TierLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub si_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub si_w_avg: Option<f64>,
    pub num_params_used: usize,
    pub sub_indices: BTreeMap<String, SubIndexView>,
}

impl From<&Assessment> for AssessmentView {
    fn from(assessment: &Assessment) -> Self {
        let precision = assessment.variant.precision();
        Self {
            variant: assessment.variant,
            status: assessment.status,
            message: assessment.message.clone(),
            eai: assessment.index.map(|index| round_to(index, precision)),
            level: assessment.level,
            label: assessment.level.label(assessment.variant),
            si_max: assessment.si_max.map(|value| round_to(value, precision)),
            si_w_avg: assessment.si_w_avg.map(|value| round_to(value, precision)),
            num_params_used: assessment.params_used(),
            sub_indices: assessment
                .sub_indices
                .iter()
                .map(|(name, sub_index)| {
                    (name.clone(), SubIndexView::new(sub_index, assessment.variant))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub record: usize,
    pub source: Option<String>,
    pub assessment: Option<Assessment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub variant: Variant,
    pub total: usize,
    pub failed: usize,
    pub summary: BTreeMap<&'static str, usize>,
    pub average_index: Option<f64>,
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new(variant: Variant, results: Vec<BatchEntry>) -> Self {
        let mut summary: BTreeMap<&'static str, usize> = Level::reachable(variant)
            .iter()
            .map(|level| (level.as_str(), 0))
            .collect();
        let mut failed = 0;
        let mut index_sum = 0.0;
        let mut index_count = 0_usize;

        for entry in &results {
            let Some(assessment) = &entry.assessment else {
                failed += 1;
                continue;
            };

            *summary.entry(assessment.level.as_str()).or_insert(0) += 1;
            if let Some(index) = assessment.index {
                index_sum += index;
                index_count += 1;
            }
        }

        Self {
            variant,
            total: results.len(),
            failed,
            summary,
            average_index: (index_count > 0).then(|| index_sum / index_count as f64),
            results,
        }
    }

    pub fn assessments(&self) -> impl Iterator<Item = &Assessment> {
        self.results
            .iter()
            .filter_map(|entry| entry.assessment.as_ref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonBatchEntry {
    pub record: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AssessmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonBatchReport {
    pub variant: Variant,
    pub total: usize,
    pub failed: usize,
    pub average_eai: Option<f64>,
    pub summary: BTreeMap<&'static str, usize>,
    pub results: Vec<JsonBatchEntry>,
}

impl From<&BatchReport> for JsonBatchReport {
    fn from(report: &BatchReport) -> Self {
        Self {
            variant: report.variant,
            total: report.total,
            failed: report.failed,
            average_eai: report
                .average_index
                .map(|index| round_to(index, report.variant.precision())),
            summary: report.summary.clone(),
            results: report
                .results
                .iter()
                .map(|entry| JsonBatchEntry {
                    record: entry.record,
                    source: entry.source.clone(),
                    assessment: entry.assessment.as_ref().map(AssessmentView::from),
                    error: entry.error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExitStatus {
    pub ok: bool,
    pub reasons: Vec<String>,
}

impl ExitStatus {
    pub fn reason_line(&self) -> String {
        self.reasons.join("; ")
    }
}

pub fn evaluate_exit<'a>(
    assessments: impl IntoIterator<Item = &'a Assessment>,
    cfg: &Config,
) -> ExitStatus {
    let mut reasons = Vec::new();
    let fail_on = cfg.general.fail_on;

    if fail_on != FailOn::None {
        let flagged = assessments
            .into_iter()
            .filter(|assessment| assessment.level.severity().meets_fail_on(fail_on))
            .count();

        if flagged > 0 {
            reasons.push(match fail_on {
                FailOn::Warning => format!("{flagged} assessment(s) at warning level or worse"),
                FailOn::Bad => format!("{flagged} assessment(s) at bad level"),
                FailOn::None => String::new(),
            });
        }
    }

    ExitStatus {
        ok: reasons.is_empty(),
        reasons,
    }
}

impl Severity {
    pub fn meets_fail_on(self, fail_on: FailOn) -> bool {
        match fail_on {
            FailOn::None => false,
            FailOn::Bad => matches!(self, Self::Bad),
            FailOn::Warning => matches!(self, Self::Warning | Self::Bad),
        }
    }
}

pub fn print_human(assessment: &Assessment) {
    let view = AssessmentView::from(assessment);
    let severity = assessment.level.severity();

    match view.eai {
        Some(eai) => println!(
            "EAI ({}): {} -> {} ({})",
            view.variant,
            severity.paint(&eai.to_string()),
            severity.paint(view.label.en),
            view.label.vi
        ),
        None => println!(
            "EAI ({}): {} [{}]",
            view.variant,
            severity.paint("n/a"),
            view.status.as_str()
        ),
    }

    if let Some(message) = &view.message {
        println!("note: {}", message);
    }
    if let (Some(si_max), Some(si_w_avg)) = (view.si_max, view.si_w_avg) {
        println!("SI_max = {}, SI_w_avg = {}", si_max, si_w_avg);
    }
    println!("parameters used: {}", view.num_params_used);

    if view.sub_indices.is_empty() {
        return;
    }

    println!();
    for (name, detail) in &view.sub_indices {
        let tier = assessment
            .sub_indices
            .get(name)
            .and_then(|sub_index| sub_index.level)
            .map(|level| format!(" -> {}", level.severity().paint(level.label().en)))
            .unwrap_or_default();
        println!(
            "  {:<22} {:<10} SI = {:<8}{}",
            name, detail.value, detail.si, tier
        );
    }
}

pub fn print_batch_human(report: &BatchReport) {
    println!(
        "{} record(s), {} failed ({} profile)",
        report.total, report.failed, report.variant
    );

    for entry in &report.results {
        let source = entry
            .source
            .as_deref()
            .map(|source| format!(" {}", source))
            .unwrap_or_default();

        match (&entry.assessment, &entry.error) {
            (Some(assessment), _) => {
                let view = AssessmentView::from(assessment);
                let severity = assessment.level.severity();
                let eai = view
                    .eai
                    .map(|eai| eai.to_string())
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "#{:<4}{} EAI {} [{}] params={}",
                    entry.record,
                    source,
                    severity.paint(&eai),
                    severity.paint(view.label.key),
                    view.num_params_used
                );
            }
            (None, Some(error)) => {
                println!("#{:<4}{} {} {}", entry.record, source, "ERROR".red().bold(), error);
            }
            (None, None) => {}
        }
    }

    println!();
    for (level, count) in &report.summary {
        println!("{}: {}", level, count);
    }
    if let Some(average) = report.average_index {
        println!(
            "average EAI: {}",
            round_to(average, report.variant.precision())
        );
    }
}

pub fn print_standards(profile: &Profile) {
    println!(
        "{} profile: fallback weight {}, minimum {} parameter(s)",
        profile.variant.to_string().bold(),
        profile.fallback_weight,
        profile.min_params
    );

    for (name, standard) in &profile.standards {
        let bounds = match standard.kind {
            StandardKind::RangeOptimal { lower, upper } => format!("[{}, {}]", lower, upper),
            StandardKind::LowerBetter { upper_limit } => format!("<= {}", upper_limit),
        };
        println!(
            "  {:<22} {:<15} {:<16} w = {}",
            name,
            standard.kind.as_str(),
            bounds,
            profile.weight_for(name)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MeasurementSet, Record, assess, assess_batch};

    fn measurements(values: &[(&str, f64)]) -> MeasurementSet {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), Some(*value)))
            .collect()
    }

    #[test]
    fn rounds_at_reporting_boundary_only() {
        assert_eq!(round_to(0.3016382, 3), 0.302);
        assert_eq!(round_to(13.5335, 2), 13.53);

        let result = assess(
            Profile::builtin(Variant::Geometric),
            &measurements(&[("ph", 8.5)]),
        );
        let view = AssessmentView::from(&result);
        assert_eq!(view.sub_indices["ph"].si, 13.53);
        assert_ne!(result.sub_indices["ph"].score, 13.53);

        let far = assess(
            Profile::builtin(Variant::Geometric),
            &measurements(&[("ph", 9.5)]),
        );
        assert_eq!(AssessmentView::from(&far).sub_indices["ph"].si, 0.03);
    }

    #[test]
    fn batch_summary_lists_every_level_for_the_variant() {
        let records = vec![Record::new(None, measurements(&[("ph", 7.5)]))];
        let report = assess_batch(Profile::builtin(Variant::Geometric), &records);

        let expected: BTreeMap<&str, usize> =
            [("bad", 0), ("good", 1), ("unknown", 0), ("warning", 0)]
                .into_iter()
                .collect();
        assert_eq!(report.summary, expected);

        let report = assess_batch(Profile::builtin(Variant::Nemerow), &[]);
        assert_eq!(report.summary.len(), 6);
        assert!(report.summary.values().all(|count| *count == 0));
        assert_eq!(report.average_index, None);
    }

    #[test]
    fn view_serializes_labels_and_nulls() {
        let result = assess(
            Profile::builtin(Variant::Nemerow),
            &measurements(&[("ph", 7.0)]),
        );
        let json = serde_json::to_value(AssessmentView::from(&result)).expect("serialize");

        assert_eq!(json["eai"], serde_json::Value::Null);
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["label"]["key"], "unknown");
        assert_eq!(json["num_params_used"], 1);
        assert_eq!(json["sub_indices"]["ph"]["level"]["key"], "ideal");
    }

    #[test]
    fn fail_on_policy_counts_flagged_assessments() {
        let profile = Profile::builtin(Variant::Geometric);
        let good = assess(profile, &measurements(&[("ph", 7.5)]));
        let bad = assess(profile, &measurements(&[("nh3", 4.0)]));

        let mut cfg = Config::default();
        cfg.general.fail_on = FailOn::Bad;
        assert!(evaluate_exit([&good], &cfg).ok);
        let status = evaluate_exit([&good, &bad], &cfg);
        assert!(!status.ok);
        assert_eq!(status.reason_line(), "1 assessment(s) at bad level");

        cfg.general.fail_on = FailOn::None;
        assert!(evaluate_exit([&bad], &cfg).ok);
    }
}
