use serde_json::json;

use crate::calc::grade_stats;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    has_field, is_valid_date, require_id, str_field, FieldErrors, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Grade, GradeDraft, GradePatch, Term};
use crate::store::SchoolStore;

fn num_field(params: &serde_json::Value, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| v.as_f64())
}

/// Score rules live entirely at this boundary; the aggregators trust stored
/// grades. For updates the cross-field check runs against the merged values,
/// so patching only `score` still cannot push it past the stored maximum.
fn validate_grade(
    store: &SchoolStore,
    params: &serde_json::Value,
    existing: Option<&Grade>,
) -> Result<(), HandlerErr> {
    let creating = existing.is_none();
    let mut errors = FieldErrors::new();

    match params.get("studentId").and_then(|v| v.as_i64()) {
        Some(student_id) => {
            if store.students.get_by_id(student_id).is_err() {
                errors.add("studentId", format!("Student {} does not exist", student_id));
            }
        }
        None if creating || has_field(params, "studentId") => {
            errors.add("studentId", "Student is required")
        }
        None => {}
    }

    if str_field(params, "subject").is_none() && (creating || has_field(params, "subject")) {
        errors.add("subject", "Subject is required");
    }

    let score = match num_field(params, "score") {
        Some(v) => {
            if v < 0.0 {
                errors.add("score", "Score must be a valid number");
                None
            } else {
                Some(v)
            }
        }
        None => {
            if creating || has_field(params, "score") {
                errors.add("score", "Score is required");
            }
            existing.map(|g| g.score)
        }
    };

    let max_score = match num_field(params, "maxScore") {
        Some(v) => {
            if v <= 0.0 {
                errors.add("maxScore", "Maximum score must be a positive number");
                None
            } else {
                Some(v)
            }
        }
        None => {
            if creating || has_field(params, "maxScore") {
                errors.add("maxScore", "Maximum score is required");
            }
            existing.map(|g| g.max_score)
        }
    };

    if let (Some(score), Some(max_score)) = (score, max_score) {
        if score > max_score {
            errors.add("score", "Score cannot exceed maximum score");
        }
    }

    match str_field(params, "term") {
        Some(v) if Term::parse(v).is_none() => {
            errors.add("term", "Term must be a recognized grading term")
        }
        Some(_) => {}
        None if creating || has_field(params, "term") => errors.add("term", "Term is required"),
        None => {}
    }

    match str_field(params, "date") {
        Some(v) if !is_valid_date(v) => {
            errors.add("date", "Date must be a valid YYYY-MM-DD date")
        }
        Some(_) => {}
        None if creating || has_field(params, "date") => errors.add("date", "Date is required"),
        None => {}
    }

    errors.check()
}

fn grades_list(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let grades = store.grades.get_all()?;
    Ok(json!({ "grades": grades }))
}

fn grades_by_student(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = require_id(params, "studentId")?;
    let mut grades = store.grades.get_all()?;
    grades.retain(|g| g.student_id == student_id);
    Ok(json!({ "grades": grades }))
}

fn grades_by_subject(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject = str_field(params, "subject")
        .ok_or_else(|| HandlerErr::bad_params("missing subject"))?
        .to_string();
    let mut grades = store.grades.get_all()?;
    // Subjects are case-sensitive by design.
    grades.retain(|g| g.subject == subject);
    Ok(json!({ "grades": grades }))
}

fn grades_create(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    validate_grade(store, params, None)?;
    let draft: GradeDraft = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let grade = store.grades.create(draft)?;
    Ok(json!({ "grade": grade }))
}

fn grades_update(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let existing = store.grades.get_by_id(id)?;
    validate_grade(store, params, Some(&existing))?;
    let patch: GradePatch = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let grade = store.grades.update(id, patch)?;
    Ok(json!({ "grade": grade }))
}

fn grades_delete(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let grade = store.grades.delete(id)?;
    Ok(json!({ "grade": grade }))
}

fn grades_stats(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let grades = store.grades.get_all()?;
    let stats = grade_stats(&grades);
    Ok(json!(stats))
}

fn with_store(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut SchoolStore, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(with_store(state, req, |s, _| grades_list(s))),
        "grades.byStudent" => Some(with_store(state, req, |s, p| grades_by_student(s, p))),
        "grades.bySubject" => Some(with_store(state, req, |s, p| grades_by_subject(s, p))),
        "grades.create" => Some(with_store(state, req, grades_create)),
        "grades.update" => Some(with_store(state, req, grades_update)),
        "grades.delete" => Some(with_store(state, req, grades_delete)),
        "grades.stats" => Some(with_store(state, req, |s, _| grades_stats(s))),
        _ => None,
    }
}
