use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::calc::{attendance_stats, grade_stats, AttendanceStats, GradeStats, SubjectAverage};
use crate::model::{AttendanceRecord, Grade, Student, StudentStatus};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewTotals {
    pub students: usize,
    pub active_students: usize,
    pub grades: usize,
    pub attendance_records: usize,
    /// Grades plus attendance records, the dashboard's "total records" tile.
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeLevelCount {
    pub grade: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewModel {
    pub totals: OverviewTotals,
    pub attendance: AttendanceStats,
    pub grades: GradeStats,
    pub grade_levels: Vec<GradeLevelCount>,
    pub subject_ranking: Vec<SubjectAverage>,
}

/// The cross-entity view model behind the dashboard and reports pages.
/// Pure composition over the three snapshots; every number is produced by
/// the aggregators, never re-derived here.
pub fn compose_overview(
    students: &[Student],
    grades: &[Grade],
    attendance: &[AttendanceRecord],
) -> OverviewModel {
    let attendance_summary = attendance_stats(attendance, None);
    let grade_summary = grade_stats(grades);

    let active_students = students
        .iter()
        .filter(|s| s.status == StudentStatus::Active)
        .count();

    let mut level_counts: HashMap<&'static str, usize> = HashMap::new();
    for student in students {
        *level_counts.entry(student.grade.label()).or_insert(0) += 1;
    }
    let mut grade_levels: Vec<GradeLevelCount> = level_counts
        .into_iter()
        .map(|(grade, count)| GradeLevelCount { grade, count })
        .collect();
    grade_levels.sort_by(|a, b| a.grade.cmp(b.grade));

    // Stable sort keeps first-appearance order for equal averages.
    let mut subject_ranking = grade_summary.subject_averages.clone();
    subject_ranking.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(Ordering::Equal)
    });

    OverviewModel {
        totals: OverviewTotals {
            students: students.len(),
            active_students,
            grades: grades.len(),
            attendance_records: attendance.len(),
            records: grades.len() + attendance.len(),
        },
        attendance: attendance_summary,
        grades: grade_summary,
        grade_levels,
        subject_ranking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttendanceDraft, AttendanceStatus, Entity, GradeDraft, GradeLevel, StudentDraft, Term,
    };

    fn student(first: &str, level: GradeLevel, status: StudentStatus) -> Student {
        Student::assemble(
            0,
            StudentDraft {
                first_name: first.to_string(),
                last_name: "Example".to_string(),
                date_of_birth: "2012-01-01".to_string(),
                grade: level,
                enrollment_date: "2023-09-05".to_string(),
                email: format!("{}@example.com", first.to_lowercase()),
                phone: "555-0100".to_string(),
                address: String::new(),
                guardian_name: "Guardian".to_string(),
                guardian_phone: "555-0101".to_string(),
                guardian_email: None,
                emergency_contact_name: "Contact".to_string(),
                emergency_contact_phone: "555-0102".to_string(),
                emergency_contact_relationship: "Aunt".to_string(),
                status,
            },
        )
    }

    fn grade(subject: &str, score: f64) -> Grade {
        Grade::assemble(
            0,
            GradeDraft {
                student_id: 1,
                subject: subject.to_string(),
                score,
                max_score: 100.0,
                term: Term::FirstQuarter,
                date: "2025-10-01".to_string(),
            },
        )
    }

    fn present(date: &str) -> AttendanceRecord {
        AttendanceRecord::assemble(
            0,
            AttendanceDraft {
                student_id: 1,
                date: date.to_string(),
                status: AttendanceStatus::Present,
                notes: None,
            },
        )
    }

    #[test]
    fn totals_cover_all_collections() {
        let students = vec![
            student("Ana", GradeLevel::Second, StudentStatus::Active),
            student("Ben", GradeLevel::Second, StudentStatus::Graduated),
        ];
        let grades = vec![grade("Math", 90.0)];
        let attendance = vec![present("2025-09-08"), present("2025-09-09")];

        let overview = compose_overview(&students, &grades, &attendance);
        assert_eq!(overview.totals.students, 2);
        assert_eq!(overview.totals.active_students, 1);
        assert_eq!(overview.totals.grades, 1);
        assert_eq!(overview.totals.attendance_records, 2);
        assert_eq!(overview.totals.records, 3);
    }

    #[test]
    fn grade_levels_sort_lexically_by_label() {
        let students = vec![
            student("Ana", GradeLevel::Ninth, StudentStatus::Active),
            student("Ben", GradeLevel::Tenth, StudentStatus::Active),
            student("Cal", GradeLevel::Kindergarten, StudentStatus::Active),
            student("Dee", GradeLevel::Tenth, StudentStatus::Active),
        ];

        let overview = compose_overview(&students, &[], &[]);
        let labels: Vec<&str> = overview.grade_levels.iter().map(|l| l.grade).collect();
        // "10th Grade" precedes "9th Grade" lexically.
        assert_eq!(labels, vec!["10th Grade", "9th Grade", "Kindergarten"]);
        assert_eq!(overview.grade_levels[0].count, 2);
    }

    #[test]
    fn subject_ranking_is_descending_and_tie_stable() {
        let grades = vec![
            grade("History", 70.0),
            grade("Math", 85.0),
            grade("Art", 85.0),
        ];

        let overview = compose_overview(&[], &grades, &[]);
        let ranked: Vec<&str> = overview
            .subject_ranking
            .iter()
            .map(|s| s.subject.as_str())
            .collect();
        // Math and Art tie at 85.0; Math appeared first among the tied pair.
        assert_eq!(ranked, vec!["Math", "Art", "History"]);
    }

    #[test]
    fn empty_snapshots_compose_to_neutral_model() {
        let overview = compose_overview(&[], &[], &[]);
        assert_eq!(overview.totals.records, 0);
        assert_eq!(overview.attendance.attendance_rate, 0.0);
        assert_eq!(overview.grades.average_gpa, 0.0);
        assert!(overview.grade_levels.is_empty());
        assert!(overview.subject_ranking.is_empty());
    }
}
