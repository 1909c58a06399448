use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    has_field, is_valid_date, is_valid_email, require_id, str_field, FieldErrors, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{GradeLevel, StudentDraft, StudentPatch, StudentStatus};
use crate::store::SchoolStore;

/// Form-level validation, run before any repository call. With
/// `creating` false only the fields present in the params are checked,
/// matching partial-update semantics.
fn validate_student(params: &serde_json::Value, creating: bool) -> Result<(), HandlerErr> {
    let mut errors = FieldErrors::new();

    let required = [
        ("firstName", "First name is required"),
        ("lastName", "Last name is required"),
        ("phone", "Phone number is required"),
        ("guardianName", "Guardian name is required"),
        ("guardianPhone", "Guardian phone is required"),
        ("emergencyContactName", "Emergency contact name is required"),
        ("emergencyContactPhone", "Emergency contact phone is required"),
        (
            "emergencyContactRelationship",
            "Emergency contact relationship is required",
        ),
    ];
    for (key, message) in required {
        if str_field(params, key).is_none() && (creating || has_field(params, key)) {
            errors.add(key, message);
        }
    }

    for (key, missing, malformed) in [
        (
            "dateOfBirth",
            "Date of birth is required",
            "Date of birth must be a valid YYYY-MM-DD date",
        ),
        (
            "enrollmentDate",
            "Enrollment date is required",
            "Enrollment date must be a valid YYYY-MM-DD date",
        ),
    ] {
        match str_field(params, key) {
            Some(v) if !is_valid_date(v) => errors.add(key, malformed),
            Some(_) => {}
            None if creating || has_field(params, key) => errors.add(key, missing),
            None => {}
        }
    }

    match str_field(params, "grade") {
        Some(v) if GradeLevel::parse(v).is_none() => {
            errors.add("grade", "Grade must be one of the school's grade levels")
        }
        Some(_) => {}
        None if creating || has_field(params, "grade") => errors.add("grade", "Grade is required"),
        None => {}
    }

    match str_field(params, "email") {
        Some(v) if !is_valid_email(v) => {
            errors.add("email", "Please enter a valid email address")
        }
        Some(_) => {}
        None if creating || has_field(params, "email") => errors.add("email", "Email is required"),
        None => {}
    }

    if let Some(v) = str_field(params, "guardianEmail") {
        if !is_valid_email(v) {
            errors.add(
                "guardianEmail",
                "Please enter a valid guardian email address",
            );
        }
    }

    if let Some(v) = str_field(params, "status") {
        if StudentStatus::parse(v).is_none() {
            errors.add("status", "Status must be active, inactive, or graduated");
        }
    }

    errors.check()
}

fn students_list(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let students = store.students.get_all()?;
    Ok(json!({ "students": students }))
}

fn students_get(store: &SchoolStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let student = store.students.get_by_id(id)?;
    Ok(json!({ "student": student }))
}

fn students_search(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let query = params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let mut students = store.students.get_all()?;
    if !query.is_empty() {
        students.retain(|s| {
            s.first_name.to_lowercase().contains(&query)
                || s.last_name.to_lowercase().contains(&query)
                || s.email.to_lowercase().contains(&query)
                || s.grade.label().to_lowercase().contains(&query)
        });
    }
    Ok(json!({ "students": students }))
}

fn students_create(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    validate_student(params, true)?;
    let mut draft: StudentDraft = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    draft.guardian_email = draft.guardian_email.filter(|s| !s.trim().is_empty());
    let student = store.students.create(draft)?;
    Ok(json!({ "student": student }))
}

fn students_update(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    validate_student(params, false)?;
    let patch: StudentPatch = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let student = store.students.update(id, patch)?;
    Ok(json!({ "student": student }))
}

fn students_delete(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let student = store.students.delete(id)?;
    Ok(json!({ "student": student }))
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
        "students.list" => Some(with_store(state, req, |s, _| students_list(s))),
        "students.get" => Some(with_store(state, req, |s, p| students_get(s, p))),
        "students.search" => Some(with_store(state, req, |s, p| students_search(s, p))),
        "students.create" => Some(with_store(state, req, students_create)),
        "students.update" => Some(with_store(state, req, students_update)),
        "students.delete" => Some(with_store(state, req, students_delete)),
        _ => None,
    }
}
