use crate::engine::Variant;
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// Upper-inclusive bands on the Nemerow EAI (lower is better).
const NEMEROW_BANDS: [(f64, Level); 4] = [
    (1.0, Level::Excellent),
    (1.2, Level::Good),
    (1.5, Level::Moderate),
    (2.0, Level::Poor),
];

/// Lower-inclusive bands on the 0-100 quality scale (higher is better).
const GEOMETRIC_BANDS: [(f64, Level); 2] = [(80.0, Level::Good), (50.0, Level::Warning)];

const SUB_INDEX_BANDS: [(f64, SiLevel); 4] = [
    (0.5, SiLevel::Ideal),
    (1.0, SiLevel::Safe),
    (1.5, SiLevel::LightWarning),
    (3.0, SiLevel::ModerateDanger),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Excellent,
    Good,
    Moderate,
    Poor,
    Danger,
    Warning,
    Bad,
    Unknown,
}

/// Coarse grouping of levels used for exit policies and coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Warning,
    Bad,
    Unknown,
}

impl Level {
    /// Every level an assessment under `variant` can end up in, best first.
    pub fn reachable(variant: Variant) -> &'static [Level] {
        match variant {
            Variant::Nemerow => &[
                Self::Excellent,
                Self::Good,
                Self::Moderate,
                Self::Poor,
                Self::Danger,
                Self::Unknown,
            ],
            Variant::Geometric => &[Self::Good, Self::Warning, Self::Bad, Self::Unknown],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Poor => "poor",
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Bad => "bad",
            Self::Unknown => "unknown",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Excellent | Self::Good => Severity::Ok,
            Self::Moderate | Self::Warning => Severity::Warning,
            Self::Poor | Self::Danger | Self::Bad => Severity::Bad,
            Self::Unknown => Severity::Unknown,
        }
    }

    pub fn label(self, variant: Variant) -> &'static TierLabel {
        let table = match variant {
            Variant::Nemerow => NEMEROW_LABELS,
            Variant::Geometric => GEOMETRIC_LABELS,
        };

        table
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, label)| label)
            .unwrap_or(&UNKNOWN_LABEL)
    }
}

impl Severity {
    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Ok => text.green().bold(),
            Self::Warning => text.yellow().bold(),
            Self::Bad => text.red().bold(),
            Self::Unknown => text.dimmed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiLevel {
    Ideal,
    Safe,
    LightWarning,
    ModerateDanger,
    HighDanger,
}

impl SiLevel {
    pub fn label(self) -> &'static TierLabel {
        match self {
            Self::Ideal => &TierLabel {
                key: "ideal",
                en: "Very good / ideal",
                vi: "Rất tốt / Lý tưởng",
                color: "dark green",
            },
            Self::Safe => &TierLabel {
                key: "safe",
                en: "Safe",
                vi: "An toàn",
                color: "light green",
            },
            Self::LightWarning => &TierLabel {
                key: "light_warning",
                en: "Warning / light danger",
                vi: "Cảnh báo / Nguy hiểm nhẹ",
                color: "yellow",
            },
            Self::ModerateDanger => &TierLabel {
                key: "moderate_danger",
                en: "Moderate danger",
                vi: "Nguy hiểm trung bình",
                color: "orange",
            },
            Self::HighDanger => &TierLabel {
                key: "high_danger",
                en: "High danger",
                vi: "Nguy hiểm cao",
                color: "red",
            },
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Ideal | Self::Safe => Severity::Ok,
            Self::LightWarning => Severity::Warning,
            Self::ModerateDanger | Self::HighDanger => Severity::Bad,
        }
    }
}

/// Presentation metadata for a tier. Kept apart from the thresholds so the
/// strings can be swapped without touching the numeric bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLabel {
    pub key: &'static str,
    pub en: &'static str,
    pub vi: &'static str,
    pub color: &'static str,
}

const NEMEROW_LABELS: &[(Level, TierLabel)] = &[
    (
        Level::Excellent,
        TierLabel {
            key: "excellent",
            en: "Very safe / excellent",
            vi: "Rất an toàn / Tuyệt hảo",
            color: "blue",
        },
    ),
    (
        Level::Good,
        TierLabel {
            key: "good",
            en: "Good / safe",
            vi: "An toàn tốt",
            color: "green",
        },
    ),
    (
        Level::Moderate,
        TierLabel {
            key: "moderate",
            en: "Moderate (needs monitoring)",
            vi: "Trung bình (cần theo dõi)",
            color: "yellow",
        },
    ),
    (
        Level::Poor,
        TierLabel {
            key: "poor",
            en: "Unsafe / poor",
            vi: "Không an toàn / Xấu",
            color: "orange",
        },
    ),
    (
        Level::Danger,
        TierLabel {
            key: "danger",
            en: "High danger (urgent action needed)",
            vi: "Nguy hiểm cao (cần xử lý khẩn cấp)",
            color: "red",
        },
    ),
];

const GEOMETRIC_LABELS: &[(Level, TierLabel)] = &[
    (
        Level::Good,
        TierLabel {
            key: "good",
            en: "Good",
            vi: "Tốt",
            color: "#22c55e",
        },
    ),
    (
        Level::Warning,
        TierLabel {
            key: "warning",
            en: "Warning",
            vi: "Cảnh cáo",
            color: "#eab308",
        },
    ),
    (
        Level::Bad,
        TierLabel {
            key: "bad",
            en: "Bad",
            vi: "Xấu",
            color: "#ef4444",
        },
    ),
];

const UNKNOWN_LABEL: TierLabel = TierLabel {
    key: "unknown",
    en: "Unknown",
    vi: "Không xác định",
    color: "#6b7280",
};

/// Maps an aggregate index to its band. `None` means no aggregate could be
/// computed.
pub fn classify(index: Option<f64>, variant: Variant) -> Level {
    let Some(index) = index else {
        return Level::Unknown;
    };

    match variant {
        Variant::Nemerow => NEMEROW_BANDS
            .iter()
            .find(|(upper, _)| index <= *upper)
            .map(|(_, level)| *level)
            .unwrap_or(Level::Danger),
        Variant::Geometric => GEOMETRIC_BANDS
            .iter()
            .find(|(lower, _)| index >= *lower)
            .map(|(_, level)| *level)
            .unwrap_or(Level::Bad),
    }
}

pub fn classify_sub_index(score: f64) -> SiLevel {
    SUB_INDEX_BANDS
        .iter()
        .find(|(upper, _)| score <= *upper)
        .map(|(_, level)| *level)
        .unwrap_or(SiLevel::HighDanger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nemerow_boundaries_resolve_to_safer_band() {
        let cases = [
            (0.0, Level::Excellent),
            (1.0, Level::Excellent),
            (1.0001, Level::Good),
            (1.2, Level::Good),
            (1.5, Level::Moderate),
            (2.0, Level::Poor),
            (2.0001, Level::Danger),
            (50.0, Level::Danger),
        ];
        for (index, expected) in cases {
            assert_eq!(classify(Some(index), Variant::Nemerow), expected, "{index}");
        }
    }

    #[test]
    fn geometric_boundaries_resolve_to_safer_band() {
        let cases = [
            (100.0, Level::Good),
            (80.0, Level::Good),
            (79.99, Level::Warning),
            (50.0, Level::Warning),
            (49.99, Level::Bad),
            (0.0, Level::Bad),
        ];
        for (index, expected) in cases {
            assert_eq!(classify(Some(index), Variant::Geometric), expected, "{index}");
        }
    }

    #[test]
    fn absent_index_is_unknown() {
        assert_eq!(classify(None, Variant::Nemerow), Level::Unknown);
        assert_eq!(classify(None, Variant::Geometric), Level::Unknown);
        assert_eq!(Level::Unknown.label(Variant::Geometric).color, "#6b7280");
    }

    #[test]
    fn sub_index_tiers() {
        assert_eq!(classify_sub_index(0.0), SiLevel::Ideal);
        assert_eq!(classify_sub_index(0.5), SiLevel::Ideal);
        assert_eq!(classify_sub_index(1.0), SiLevel::Safe);
        assert_eq!(classify_sub_index(1.5), SiLevel::LightWarning);
        assert_eq!(classify_sub_index(3.0), SiLevel::ModerateDanger);
        assert_eq!(classify_sub_index(3.01), SiLevel::HighDanger);
    }

    #[test]
    fn every_reachable_level_has_a_label() {
        for level in [
            Level::Excellent,
            Level::Good,
            Level::Moderate,
            Level::Poor,
            Level::Danger,
        ] {
            assert_eq!(level.label(Variant::Nemerow).key, level.as_str());
        }
        for level in [Level::Good, Level::Warning, Level::Bad] {
            assert_eq!(level.label(Variant::Geometric).key, level.as_str());
        }
        assert_eq!(Level::Good.label(Variant::Geometric).vi, "Tốt");
    }

    proptest! {
        #[test]
        fn nemerow_bands_are_ordered(a in 0.0..10.0_f64, b in 0.0..10.0_f64) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_level = classify(Some(low), Variant::Nemerow);
            let high_level = classify(Some(high), Variant::Nemerow);
            prop_assert!(low_level <= high_level);
        }

        #[test]
        fn geometric_bands_are_ordered(a in 0.0..101.0_f64, b in 0.0..101.0_f64) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_level = classify(Some(low), Variant::Geometric);
            let high_level = classify(Some(high), Variant::Geometric);
            prop_assert!(high_level.severity() <= low_level.severity());
        }
    }
}
