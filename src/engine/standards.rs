use crate::engine::Variant;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StandardKind {
    /// Healthy values sit inside `[lower, upper]`; both sides are unhealthy.
    RangeOptimal { lower: f64, upper: f64 },
    /// Only low values are healthy; `upper_limit` is the acceptable maximum.
    LowerBetter { upper_limit: f64 },
}

impl StandardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RangeOptimal { .. } => "range_optimal",
            Self::LowerBetter { .. } => "lower_better",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    #[serde(flatten)]
    pub kind: StandardKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Standard {
    pub fn range(lower: f64, upper: f64) -> Self {
        Self {
            kind: StandardKind::RangeOptimal { lower, upper },
            weight: None,
        }
    }

    pub fn lower_better(upper_limit: f64) -> Self {
        Self {
            kind: StandardKind::LowerBetter { upper_limit },
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StandardsError {
    #[error("standard `{param}` has a non-finite bound")]
    NonFiniteBound { param: String },
    #[error("standard `{param}` has lower bound {lower} above upper bound {upper}")]
    InvertedRange {
        param: String,
        lower: f64,
        upper: f64,
    },
    #[error("standard `{param}` has invalid weight {weight}")]
    InvalidWeight { param: String, weight: f64 },
    #[error("fallback weight {0} must be finite and non-negative")]
    InvalidFallbackWeight(f64),
    #[error("minimum parameter count must be at least 1")]
    ZeroMinimum,
}

/// Read-only parameter table plus the aggregation settings that go with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub variant: Variant,
    pub standards: BTreeMap<String, Standard>,
    pub fallback_weight: f64,
    pub min_params: usize,
}

impl Profile {
    pub fn new(variant: Variant, standards: BTreeMap<String, Standard>) -> Self {
        let (fallback_weight, min_params) = match variant {
            Variant::Nemerow => (1.0, 4),
            Variant::Geometric => (0.1, 1),
        };

        Self {
            variant,
            standards,
            fallback_weight,
            min_params,
        }
    }

    pub fn builtin(variant: Variant) -> &'static Profile {
        match variant {
            Variant::Nemerow => &NEMEROW_PROFILE,
            Variant::Geometric => &GEOMETRIC_PROFILE,
        }
    }

    pub fn standard(&self, param: &str) -> Option<&Standard> {
        self.standards.get(param)
    }

    pub fn weight_for(&self, param: &str) -> f64 {
        self.standards
            .get(param)
            .and_then(|standard| standard.weight)
            .unwrap_or(self.fallback_weight)
    }

    /// Replaces the weight of a known parameter. Returns false when the
    /// parameter has no standard.
    pub fn set_weight(&mut self, param: &str, weight: f64) -> bool {
        match self.standards.get_mut(param) {
            Some(standard) => {
                standard.weight = Some(weight);
                true
            }
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), StandardsError> {
        if !self.fallback_weight.is_finite() || self.fallback_weight < 0.0 {
            return Err(StandardsError::InvalidFallbackWeight(self.fallback_weight));
        }
        if self.min_params == 0 {
            return Err(StandardsError::ZeroMinimum);
        }

        for (name, standard) in &self.standards {
            let param = || name.clone();
            match standard.kind {
                StandardKind::RangeOptimal { lower, upper } => {
                    if !lower.is_finite() || !upper.is_finite() {
                        return Err(StandardsError::NonFiniteBound { param: param() });
                    }
                    if lower > upper {
                        return Err(StandardsError::InvertedRange {
                            param: param(),
                            lower,
                            upper,
                        });
                    }
                }
                StandardKind::LowerBetter { upper_limit } => {
                    if !upper_limit.is_finite() {
                        return Err(StandardsError::NonFiniteBound { param: param() });
                    }
                }
            }

            if let Some(weight) = standard.weight
                && (!weight.is_finite() || weight < 0.0)
            {
                return Err(StandardsError::InvalidWeight {
                    param: param(),
                    weight,
                });
            }
        }

        Ok(())
    }
}

static NEMEROW_PROFILE: Lazy<Profile> = Lazy::new(|| {
    let standards = [
        ("nhiet_do_kk", Standard::range(22.0, 27.0).with_weight(0.5)),
        ("luong_mua", Standard::range(1500.0, 3000.0).with_weight(0.5)),
        ("ph", Standard::range(6.5, 8.5).with_weight(2.5)),
        ("do_man", Standard::range(5.0, 20.0).with_weight(2.5)),
        ("do_kiem", Standard::range(60.0, 180.0).with_weight(1.0)),
        ("nhiet_do_nuoc_bien", Standard::range(18.0, 28.0).with_weight(0.8)),
        ("nh3", Standard::lower_better(0.3).with_weight(2.5)),
        ("h2s", Standard::lower_better(0.05).with_weight(2.5)),
        ("bod5", Standard::lower_better(50.0).with_weight(1.5)),
        ("cod", Standard::lower_better(150.0).with_weight(1.5)),
        ("tss", Standard::lower_better(50.0).with_weight(1.0)),
        ("as", Standard::lower_better(12.0).with_weight(3.0)),
        ("cd", Standard::lower_better(2.0).with_weight(3.0)),
        ("pb", Standard::lower_better(100.0).with_weight(2.5)),
        ("cu", Standard::lower_better(70.0).with_weight(2.0)),
        ("zn", Standard::lower_better(200.0).with_weight(2.0)),
    ];

    Profile::new(Variant::Nemerow, to_table(&standards))
});

static GEOMETRIC_PROFILE: Lazy<Profile> = Lazy::new(|| {
    let standards = [
        ("ph", Standard::range(6.5, 8.5).with_weight(0.15)),
        ("do_man", Standard::range(10.0, 35.0).with_weight(0.10)),
        ("nhiet_do_nuoc", Standard::range(20.0, 30.0).with_weight(0.10)),
        ("nh3", Standard::lower_better(2.0).with_weight(0.20)),
        ("tss", Standard::lower_better(50.0).with_weight(0.15)),
        ("bod5", Standard::lower_better(5.0).with_weight(0.15)),
        // sediment heavy metals, mg/kg
        ("as", Standard::lower_better(20.0).with_weight(0.20)),
        ("cd", Standard::lower_better(1.5).with_weight(0.25)),
        ("pb", Standard::lower_better(60.0).with_weight(0.20)),
        ("cu", Standard::lower_better(65.0).with_weight(0.18)),
        ("zn", Standard::lower_better(200.0).with_weight(0.17)),
    ];

    Profile::new(Variant::Geometric, to_table(&standards))
});

fn to_table(entries: &[(&str, Standard)]) -> BTreeMap<String, Standard> {
    entries
        .iter()
        .map(|(name, standard)| (name.to_string(), *standard))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_valid() {
        assert!(Profile::builtin(Variant::Nemerow).validate().is_ok());
        assert!(Profile::builtin(Variant::Geometric).validate().is_ok());
        assert_eq!(Profile::builtin(Variant::Nemerow).standards.len(), 16);
        assert_eq!(Profile::builtin(Variant::Geometric).standards.len(), 11);
    }

    #[test]
    fn weight_falls_back_per_variant() {
        let mut nemerow = Profile::new(Variant::Nemerow, BTreeMap::new());
        nemerow
            .standards
            .insert("x".to_string(), Standard::lower_better(1.0));
        assert_eq!(nemerow.weight_for("x"), 1.0);

        let mut geometric = Profile::new(Variant::Geometric, BTreeMap::new());
        geometric
            .standards
            .insert("x".to_string(), Standard::lower_better(1.0));
        assert_eq!(geometric.weight_for("x"), 0.1);
    }

    #[test]
    fn set_weight_only_touches_known_parameters() {
        let mut profile = Profile::builtin(Variant::Nemerow).clone();
        assert!(profile.set_weight("ph", 4.0));
        assert_eq!(profile.weight_for("ph"), 4.0);
        assert!(!profile.set_weight("unobtainium", 4.0));
        assert_eq!(Profile::builtin(Variant::Nemerow).weight_for("ph"), 2.5);
    }

    #[test]
    fn rejects_corrupted_tables() {
        let mut profile = Profile::new(Variant::Nemerow, BTreeMap::new());
        profile
            .standards
            .insert("ph".to_string(), Standard::range(8.5, 6.5));
        assert!(matches!(
            profile.validate(),
            Err(StandardsError::InvertedRange { .. })
        ));

        profile
            .standards
            .insert("ph".to_string(), Standard::range(6.5, f64::NAN));
        assert!(matches!(
            profile.validate(),
            Err(StandardsError::NonFiniteBound { .. })
        ));

        profile
            .standards
            .insert("ph".to_string(), Standard::range(6.5, 8.5).with_weight(-1.0));
        assert!(matches!(
            profile.validate(),
            Err(StandardsError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn standard_deserializes_from_tagged_toml() {
        let parsed: Standard =
            toml::from_str("kind = \"range_optimal\"\nlower = 1.0\nupper = 3.0\nweight = 2.0")
                .expect("valid standard");
        assert_eq!(parsed, Standard::range(1.0, 3.0).with_weight(2.0));

        let parsed: Standard =
            toml::from_str("kind = \"lower_better\"\nupper_limit = 0.5").expect("valid standard");
        assert_eq!(parsed, Standard::lower_better(0.5));
    }
}
