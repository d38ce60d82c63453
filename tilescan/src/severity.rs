//! Severity classification of detected defects by physical size.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of each grade's diagonal length in cm.
pub const GRADE_UPPER_BOUNDS_CM: [f64; 3] = [30.0, 60.0, 100.0];

/// Severity band, serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeverityGrade {
    /// Up to 30 cm
    Minor = 1,
    /// Over 30 cm, up to 60 cm
    Moderate = 2,
    /// Over 60 cm, up to 100 cm
    Severe = 3,
    /// Over 100 cm
    Critical = 4,
}

impl SeverityGrade {
    pub const ALL: [SeverityGrade; 4] = [
        SeverityGrade::Minor,
        SeverityGrade::Moderate,
        SeverityGrade::Severe,
        SeverityGrade::Critical,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl From<SeverityGrade> for u8 {
    fn from(grade: SeverityGrade) -> u8 {
        grade.value()
    }
}

impl TryFrom<u8> for SeverityGrade {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SeverityGrade::Minor),
            2 => Ok(SeverityGrade::Moderate),
            3 => Ok(SeverityGrade::Severe),
            4 => Ok(SeverityGrade::Critical),
            other => Err(format!("severity grade {} is outside 1..=4", other)),
        }
    }
}

impl fmt::Display for SeverityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Grade for a diagonal length in cm. Each band includes its upper bound.
pub fn severity_grade(diagonal_cm: f64) -> SeverityGrade {
    if diagonal_cm <= GRADE_UPPER_BOUNDS_CM[0] {
        SeverityGrade::Minor
    } else if diagonal_cm <= GRADE_UPPER_BOUNDS_CM[1] {
        SeverityGrade::Moderate
    } else if diagonal_cm <= GRADE_UPPER_BOUNDS_CM[2] {
        SeverityGrade::Severe
    } else {
        SeverityGrade::Critical
    }
}

/// A whole-number percentage, serialized as `"NN%"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Percent(pub u32);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Percent> for String {
    fn from(p: Percent) -> String {
        p.to_string()
    }
}

impl TryFrom<String> for Percent {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .strip_suffix('%')
            .and_then(|n| n.trim().parse().ok())
            .map(Percent)
            .ok_or_else(|| format!("'{}' is not a percentage", value))
    }
}

/// Share of each grade among a set of detections.
///
/// Each share is rounded on its own, so the four need not add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub grade1: Percent,
    pub grade2: Percent,
    pub grade3: Percent,
    pub grade4: Percent,
}

impl SeverityDistribution {
    pub fn get(&self, grade: SeverityGrade) -> Percent {
        match grade {
            SeverityGrade::Minor => self.grade1,
            SeverityGrade::Moderate => self.grade2,
            SeverityGrade::Severe => self.grade3,
            SeverityGrade::Critical => self.grade4,
        }
    }

    /// Sum of the rounded shares.
    pub fn total(&self) -> u32 {
        SeverityGrade::ALL.iter().map(|&g| self.get(g).0).sum()
    }
}

/// Percentage of each grade in `grades`, rounded half to even.
///
/// Empty input gives 0% everywhere.
pub fn severity_distribution(grades: &[SeverityGrade]) -> SeverityDistribution {
    if grades.is_empty() {
        return SeverityDistribution::default();
    }

    let total = grades.len() as f64;
    let share = |grade: SeverityGrade| {
        let count = grades.iter().filter(|&&g| g == grade).count() as f64;
        Percent((count / total * 100.0).round_ties_even() as u32)
    };

    SeverityDistribution {
        grade1: share(SeverityGrade::Minor),
        grade2: share(SeverityGrade::Moderate),
        grade3: share(SeverityGrade::Severe),
        grade4: share(SeverityGrade::Critical),
    }
}
