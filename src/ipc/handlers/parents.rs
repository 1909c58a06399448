use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    has_field, is_valid_email, require_id, str_field, FieldErrors, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ParentDraft, ParentPatch, Relationship};
use crate::store::SchoolStore;

fn read_student_ids(params: &serde_json::Value) -> Option<Result<Vec<i64>, ()>> {
    let raw = params.get("studentIds")?;
    let Some(items) = raw.as_array() else {
        return Some(Err(()));
    };
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match item.as_i64() {
            Some(id) => ids.push(id),
            None => return Some(Err(())),
        }
    }
    Some(Ok(ids))
}

/// Linked students are validated here, at form level; the store itself keeps
/// the references weak and never cascades.
fn validate_parent(
    store: &SchoolStore,
    params: &serde_json::Value,
    creating: bool,
) -> Result<(), HandlerErr> {
    let mut errors = FieldErrors::new();

    let required = [
        ("firstName", "First name is required"),
        ("lastName", "Last name is required"),
        ("phone", "Phone number is required"),
    ];
    for (key, message) in required {
        if str_field(params, key).is_none() && (creating || has_field(params, key)) {
            errors.add(key, message);
        }
    }

    match str_field(params, "email") {
        Some(v) if !is_valid_email(v) => {
            errors.add("email", "Please enter a valid email address")
        }
        Some(_) => {}
        None if creating || has_field(params, "email") => errors.add("email", "Email is required"),
        None => {}
    }

    match str_field(params, "relationship") {
        Some(v) if Relationship::parse(v).is_none() => {
            errors.add("relationship", "Relationship must be a recognized option")
        }
        Some(_) => {}
        None if creating || has_field(params, "relationship") => {
            errors.add("relationship", "Relationship is required")
        }
        None => {}
    }

    match read_student_ids(params) {
        Some(Ok(ids)) => {
            if ids.is_empty() {
                errors.add("studentIds", "At least one student must be linked");
            } else {
                for id in &ids {
                    if store.students.get_by_id(*id).is_err() {
                        errors.add("studentIds", format!("Student {} does not exist", id));
                        break;
                    }
                }
            }
        }
        Some(Err(())) => errors.add("studentIds", "Student ids must be a list of numbers"),
        None if creating => errors.add("studentIds", "At least one student must be linked"),
        None => {}
    }

    errors.check()
}

fn parents_list(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let parents = store.parents.get_all()?;
    Ok(json!({ "parents": parents }))
}

fn parents_get(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let parent = store.parents.get_by_id(id)?;
    Ok(json!({ "parent": parent }))
}

fn parents_by_student(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = require_id(params, "studentId")?;
    let mut parents = store.parents.get_all()?;
    parents.retain(|p| p.student_ids.contains(&student_id));
    Ok(json!({ "parents": parents }))
}

fn parents_create(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    validate_parent(store, params, true)?;
    let mut draft: ParentDraft = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    draft.address = draft.address.filter(|s| !s.trim().is_empty());
    draft.occupation = draft.occupation.filter(|s| !s.trim().is_empty());
    draft.work_phone = draft.work_phone.filter(|s| !s.trim().is_empty());
    let parent = store.parents.create(draft)?;
    Ok(json!({ "parent": parent }))
}

fn parents_update(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    validate_parent(store, params, false)?;
    let patch: ParentPatch = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let parent = store.parents.update(id, patch)?;
    Ok(json!({ "parent": parent }))
}

fn parents_delete(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let parent = store.parents.delete(id)?;
    Ok(json!({ "parent": parent }))
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
        "parents.list" => Some(with_store(state, req, |s, _| parents_list(s))),
        "parents.get" => Some(with_store(state, req, |s, p| parents_get(s, p))),
        "parents.byStudent" => Some(with_store(state, req, |s, p| parents_by_student(s, p))),
        "parents.create" => Some(with_store(state, req, parents_create)),
        "parents.update" => Some(with_store(state, req, parents_update)),
        "parents.delete" => Some(with_store(state, req, parents_delete)),
        _ => None,
    }
}
