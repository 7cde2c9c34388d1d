//! Selectable reconstruction methods.
//!
//! Each enum names one policy of the reconstruction chain. Parsing is strict
//! (`FromStr` fails on unknown names); callers that want the permissive
//! fallback use `unwrap_or_default()` on the parse result.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Which hits of a sensor enter the centroid calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsiderationMethod {
    /// Every accepted hit.
    #[default]
    ConsiderAll,
    /// The 7 hits closest to the most significant hit.
    ConsiderSeven,
    /// The 19 hits closest to the most significant hit.
    ConsiderNineteen,
    /// Cluster-based selection. Not implemented, behaves like `ConsiderAll`.
    ConsiderClusters,
}

impl ConsiderationMethod {
    /// Maximum number of neighbours to keep, `None` meaning all hits.
    #[must_use]
    pub fn neighbour_limit(self) -> Option<usize> {
        match self {
            Self::ConsiderSeven => Some(7),
            Self::ConsiderNineteen => Some(19),
            Self::ConsiderAll | Self::ConsiderClusters => None,
        }
    }

    /// Canonical configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ConsiderAll => "all",
            Self::ConsiderSeven => "seven",
            Self::ConsiderNineteen => "nineteen",
            Self::ConsiderClusters => "clusters",
        }
    }
}

impl FromStr for ConsiderationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "all" | "considerall" => Ok(Self::ConsiderAll),
            "seven" | "7" | "considerseven" => Ok(Self::ConsiderSeven),
            "nineteen" | "19" | "considernineteen" => Ok(Self::ConsiderNineteen),
            "clusters" | "considerclusters" => Ok(Self::ConsiderClusters),
            _ => Err(Error::ConfigError(format!(
                "unknown consideration method '{s}'"
            ))),
        }
    }
}

impl fmt::Display for ConsiderationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weight function applied to hit intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weighting {
    /// `w = max(I, 0)^exponent`.
    Powered(i32),
    /// `w = max(a + b * ln(I / I_sum), 0)` for positive intensities.
    Logarithmic { a: f64, b: f64 },
}

/// Named weighting schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeightingMethod {
    /// Intensity squared.
    #[default]
    Squared,
    /// Intensity.
    Linear,
    /// Logarithmic, a = 5.0, b = 1.0.
    Log50_10,
    /// Logarithmic, a = 5.0, b = 0.5.
    Log50_05,
    /// Logarithmic, a = 7.0, b = 1.0.
    Log70_10,
}

impl WeightingMethod {
    /// Weight function parameters of this scheme.
    #[must_use]
    pub fn weighting(self) -> Weighting {
        match self {
            Self::Squared => Weighting::Powered(2),
            Self::Linear => Weighting::Powered(1),
            Self::Log50_10 => Weighting::Logarithmic { a: 5.0, b: 1.0 },
            Self::Log50_05 => Weighting::Logarithmic { a: 5.0, b: 0.5 },
            Self::Log70_10 => Weighting::Logarithmic { a: 7.0, b: 1.0 },
        }
    }

    /// Canonical configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Squared => "squared",
            Self::Linear => "linear",
            Self::Log50_10 => "log_50_10",
            Self::Log50_05 => "log_50_05",
            Self::Log70_10 => "log_70_10",
        }
    }
}

impl FromStr for WeightingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "squared" | "squaredweighting" => Ok(Self::Squared),
            "linear" | "linearweighting" => Ok(Self::Linear),
            "log5010" | "logweighting5010" => Ok(Self::Log50_10),
            "log5005" | "logweighting5005" => Ok(Self::Log50_05),
            "log7010" | "logweighting7010" => Ok(Self::Log70_10),
            _ => Err(Error::ConfigError(format!("unknown weighting method '{s}'"))),
        }
    }
}

impl fmt::Display for WeightingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Track fitting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackFittingMethod {
    /// Straight line, x(z) and y(z) of degree 1.
    LineFit,
    /// Second order polynomial.
    Pol2,
    /// Third order polynomial.
    Pol3,
    /// No fit; evaluation yields the origin.
    #[default]
    DefaultFitting,
}

impl TrackFittingMethod {
    /// Polynomial degree, `None` for the no-op fit.
    #[must_use]
    pub fn degree(self) -> Option<usize> {
        match self {
            Self::LineFit => Some(1),
            Self::Pol2 => Some(2),
            Self::Pol3 => Some(3),
            Self::DefaultFitting => None,
        }
    }

    /// Canonical configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LineFit => "line",
            Self::Pol2 => "pol2",
            Self::Pol3 => "pol3",
            Self::DefaultFitting => "default",
        }
    }
}

impl FromStr for TrackFittingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "line" | "linefit" | "pol1" | "linefittgrapherrors" => Ok(Self::LineFit),
            "pol2" | "pol2tgrapherrors" => Ok(Self::Pol2),
            "pol3" | "pol3tgrapherrors" => Ok(Self::Pol3),
            "default" | "defaultfitting" | "none" => Ok(Self::DefaultFitting),
            _ => Err(Error::ConfigError(format!("unknown fitting method '{s}'"))),
        }
    }
}

impl fmt::Display for TrackFittingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower-case and drop separators so `LOG_50_10`, `log-50-10` and `log5010` match.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
