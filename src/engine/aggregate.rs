use crate::engine::Variant;
use crate::engine::normalize::SubIndex;
use crate::engine::standards::Profile;
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::SQRT_2;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLaw {
    /// `sqrt((si_max^2 + si_w_avg^2) / 2)`
    NemerowRms,
    /// `exp(sum(w_i' * ln(q_i + 1)))` with weights renormalized over the
    /// participating parameters.
    WeightedGeometricMean,
}

impl AggregationLaw {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Nemerow => Self::NemerowRms,
            Variant::Geometric => Self::WeightedGeometricMean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub index: f64,
    pub si_max: Option<f64>,
    pub si_w_avg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregateFailure {
    #[error("insufficient data: need at least {required} parameters, found {found}")]
    InsufficientData { found: usize, required: usize },
    #[error("total weight of participating parameters is zero")]
    ZeroWeight,
    #[error("aggregate is not a finite number; readings are out of numeric range")]
    NonFinite,
}

/// Combines sub-indices into one scalar. Iteration follows the map's key
/// order so repeated calls sum in the same sequence.
pub fn aggregate(
    law: AggregationLaw,
    sub_indices: &BTreeMap<String, SubIndex>,
    profile: &Profile,
) -> Result<Aggregate, AggregateFailure> {
    let found = sub_indices.len();
    if found < profile.min_params {
        return Err(AggregateFailure::InsufficientData {
            found,
            required: profile.min_params,
        });
    }

    let weighted: Vec<(f64, f64)> = sub_indices
        .iter()
        .map(|(name, sub_index)| (profile.weight_for(name), sub_index.score))
        .collect();
    let total_weight: f64 = weighted.iter().map(|(weight, _)| weight).sum();
    if total_weight <= 0.0 {
        return Err(AggregateFailure::ZeroWeight);
    }

    let result = match law {
        AggregationLaw::NemerowRms => {
            let si_max = weighted
                .iter()
                .map(|(_, score)| *score)
                .fold(f64::NEG_INFINITY, f64::max);
            let si_w_avg = weighted
                .iter()
                .map(|(weight, score)| weight * score)
                .sum::<f64>()
                / total_weight;

            // hypot keeps the blend finite for readings whose square overflows
            Aggregate {
                index: si_max.hypot(si_w_avg) / SQRT_2,
                si_max: Some(si_max),
                si_w_avg: Some(si_w_avg),
            }
        }
        AggregationLaw::WeightedGeometricMean => {
            let log_sum: f64 = weighted
                .iter()
                .map(|(weight, score)| (weight / total_weight) * (score + 1.0).ln())
                .sum();

            Aggregate {
                index: log_sum.exp(),
                si_max: None,
                si_w_avg: None,
            }
        }
    };

    if !result.index.is_finite() {
        return Err(AggregateFailure::NonFinite);
    }
    Ok(result)
}
