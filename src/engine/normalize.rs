use crate::engine::Variant;
use crate::engine::classify::{self, SiLevel};
use crate::engine::standards::{Standard, StandardKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationLaw {
    /// `|x - center| / halfwidth`: 0 at the center, 1 at either bound.
    RangeOptimalNemerow,
    /// `100 * exp(-(x - center)^2 / (2 sigma^2))` with `sigma = (upper - lower) / 4`.
    RangeOptimalGaussian,
    /// `x / limit`: 0 at zero, 1 at the limit.
    LowerBetterLinear,
    /// `100 * (1 - x / limit)` clamped to `[0, 100]`.
    LowerBetterComplement,
}

impl NormalizationLaw {
    pub fn select(variant: Variant, kind: &StandardKind) -> Self {
        match (variant, kind) {
            (Variant::Nemerow, StandardKind::RangeOptimal { .. }) => Self::RangeOptimalNemerow,
            (Variant::Nemerow, StandardKind::LowerBetter { .. }) => Self::LowerBetterLinear,
            (Variant::Geometric, StandardKind::RangeOptimal { .. }) => Self::RangeOptimalGaussian,
            (Variant::Geometric, StandardKind::LowerBetter { .. }) => Self::LowerBetterComplement,
        }
    }

    /// Applies the law to a finite value. `None` means the standard cannot
    /// score this parameter and it should be dropped.
    pub fn apply(self, value: f64, kind: &StandardKind) -> Option<f64> {
        match (self, *kind) {
            (Self::RangeOptimalNemerow, StandardKind::RangeOptimal { lower, upper }) => {
                let center = (lower + upper) / 2.0;
                let half_width = (upper - lower) / 2.0;
                if half_width > 0.0 {
                    Some((value - center).abs() / half_width)
                } else {
                    Some(0.0)
                }
            }
            (Self::RangeOptimalGaussian, StandardKind::RangeOptimal { lower, upper }) => {
                let center = (lower + upper) / 2.0;
                let sigma = (upper - lower) / 4.0;
                if sigma == 0.0 {
                    return Some(if value == center { 100.0 } else { 0.0 });
                }

                let deviation = value - center;
                let qi = 100.0 * (-(deviation * deviation) / (2.0 * sigma * sigma)).exp();
                Some(qi.clamp(0.0, 100.0))
            }
            (Self::LowerBetterLinear, StandardKind::LowerBetter { upper_limit }) => {
                if upper_limit > 0.0 {
                    Some(value / upper_limit)
                } else {
                    Some(0.0)
                }
            }
            (Self::LowerBetterComplement, StandardKind::LowerBetter { upper_limit }) => {
                if upper_limit <= 0.0 {
                    return None;
                }
                Some((100.0 * (1.0 - value / upper_limit)).clamp(0.0, 100.0))
            }
            _ => None,
        }
    }

    /// Best achievable score under this law.
    pub fn ideal(self) -> f64 {
        match self {
            Self::RangeOptimalNemerow | Self::LowerBetterLinear => 0.0,
            Self::RangeOptimalGaussian | Self::LowerBetterComplement => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubIndex {
    pub value: f64,
    pub score: f64,
    pub law: NormalizationLaw,
    /// Per-parameter reporting tier; only the Nemerow scale has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<SiLevel>,
}

pub fn normalize(
    param: &str,
    value: Option<f64>,
    standard: &Standard,
    variant: Variant,
) -> Option<SubIndex> {
    let Some(value) = value.filter(|value| value.is_finite()) else {
        log::debug!("skipping {param}: missing or non-finite value");
        return None;
    };

    let law = NormalizationLaw::select(variant, &standard.kind);
    let Some(score) = law.apply(value, &standard.kind) else {
        log::debug!("skipping {param}: {law:?} cannot score against its standard");
        return None;
    };

    let level = match variant {
        Variant::Nemerow => Some(classify::classify_sub_index(score)),
        Variant::Geometric => None,
    };

    Some(SubIndex {
        value,
        score,
        law,
        level,
    })
}
