use serde::Serialize;
use std::collections::HashMap;

use crate::model::{AttendanceRecord, AttendanceStatus, Grade};

/// A–F classification with its GPA weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

impl Letter {
    pub fn points(self) -> f64 {
        match self {
            Letter::A => 4.0,
            Letter::B => 3.0,
            Letter::C => 2.0,
            Letter::D => 1.0,
            Letter::F => 0.0,
        }
    }
}

pub fn percent(score: f64, max_score: f64) -> f64 {
    100.0 * score / max_score
}

/// Band lower bounds are inclusive: exactly 90% is an A, 89.999% a B.
/// Callers validate max_score > 0 before a score is ever stored.
pub fn letter_for(score: f64, max_score: f64) -> Letter {
    let pct = percent(score, max_score);
    if pct >= 90.0 {
        Letter::A
    } else if pct >= 80.0 {
        Letter::B
    } else if pct >= 70.0 {
        Letter::C
    } else if pct >= 60.0 {
        Letter::D
    } else {
        Letter::F
    }
}

/// Display rounding used across the dashboard: halves away from zero.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Inclusive YYYY-MM-DD bounds. Dates are zero-padded, so lexical order
/// equals chronological order.
#[derive(Debug, Clone)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    pub attendance_rate: f64,
}

/// Per-status counts and rate over the recorded entries in the optional
/// range. The rate counts present, late, and excused as attended; students
/// with no record for the period do not enter the denominator.
pub fn attendance_stats(records: &[AttendanceRecord], range: Option<&DateRange>) -> AttendanceStats {
    let mut stats = AttendanceStats::default();
    for record in records {
        if let Some(range) = range {
            if !range.contains(&record.date) {
                continue;
            }
        }
        stats.total += 1;
        match record.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Late => stats.late += 1,
            AttendanceStatus::Excused => stats.excused += 1,
        }
    }
    stats.attendance_rate = if stats.total > 0 {
        let attended = (stats.present + stats.late + stats.excused) as f64;
        round1(100.0 * attended / stats.total as f64)
    } else {
        0.0
    };
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeDistribution {
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "C")]
    pub c: usize,
    #[serde(rename = "D")]
    pub d: usize,
    #[serde(rename = "F")]
    pub f: usize,
}

impl GradeDistribution {
    fn bump(&mut self, letter: Letter) {
        match letter {
            Letter::A => self.a += 1,
            Letter::B => self.b += 1,
            Letter::C => self.c += 1,
            Letter::D => self.d += 1,
            Letter::F => self.f += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.a + self.b + self.c + self.d + self.f
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStats {
    pub total_grades: usize,
    pub average_gpa: f64,
    pub distribution: GradeDistribution,
    /// One row per distinct subject, in first-appearance order. Subjects are
    /// case-sensitive: "math" and "Math" are distinct rows.
    pub subject_averages: Vec<SubjectAverage>,
}

impl GradeStats {
    pub fn empty() -> Self {
        GradeStats {
            total_grades: 0,
            average_gpa: 0.0,
            distribution: GradeDistribution::default(),
            subject_averages: Vec::new(),
        }
    }
}

/// Distribution, average GPA (2 decimals), and per-subject percentage
/// averages (1 decimal) for a grade snapshot. Empty input yields the zeroed
/// stats rather than an error.
pub fn grade_stats(grades: &[Grade]) -> GradeStats {
    if grades.is_empty() {
        return GradeStats::empty();
    }

    let mut distribution = GradeDistribution::default();
    let mut total_points = 0.0;
    let mut subject_order: Vec<String> = Vec::new();
    let mut by_subject: HashMap<String, (f64, usize)> = HashMap::new();

    for grade in grades {
        let letter = letter_for(grade.score, grade.max_score);
        distribution.bump(letter);
        total_points += letter.points();

        if !by_subject.contains_key(&grade.subject) {
            subject_order.push(grade.subject.clone());
        }
        let entry = by_subject.entry(grade.subject.clone()).or_insert((0.0, 0));
        entry.0 += percent(grade.score, grade.max_score);
        entry.1 += 1;
    }

    let subject_averages = subject_order
        .into_iter()
        .map(|subject| {
            let (sum, count) = by_subject[&subject];
            SubjectAverage {
                subject,
                average: round1(sum / count as f64),
                count,
            }
        })
        .collect();

    GradeStats {
        total_grades: grades.len(),
        average_gpa: round2(total_points / grades.len() as f64),
        distribution,
        subject_averages,
    }
}
