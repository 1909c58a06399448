use chrono::Utc;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    has_field, is_valid_date, require_id, str_field, FieldErrors, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Communication, CommunicationDraft, CommunicationPatch, CommunicationType};
use crate::store::SchoolStore;

fn validate_communication(
    store: &SchoolStore,
    params: &serde_json::Value,
    existing: Option<&Communication>,
) -> Result<(), HandlerErr> {
    let creating = existing.is_none();
    let mut errors = FieldErrors::new();

    let parent_id = params
        .get("parentId")
        .and_then(|v| v.as_i64())
        .or_else(|| existing.map(|c| c.parent_id));
    match params.get("parentId").and_then(|v| v.as_i64()) {
        Some(id) => {
            if store.parents.get_by_id(id).is_err() {
                errors.add("parentId", format!("Parent {} does not exist", id));
            }
        }
        None if creating => errors.add("parentId", "Parent is required"),
        None => {}
    }

    if params.get("teacherId").and_then(|v| v.as_i64()).is_none()
        && (creating || has_field(params, "teacherId"))
    {
        errors.add("teacherId", "Teacher is required");
    }

    match str_field(params, "type") {
        Some(v) if CommunicationType::parse(v).is_none() => {
            errors.add("type", "Communication type must be a recognized option")
        }
        Some(_) => {}
        None if creating || has_field(params, "type") => {
            errors.add("type", "Communication type is required")
        }
        None => {}
    }

    if str_field(params, "subject").is_none() && (creating || has_field(params, "subject")) {
        errors.add("subject", "Subject is required");
    }
    if str_field(params, "notes").is_none() && (creating || has_field(params, "notes")) {
        errors.add("notes", "Notes are required");
    }

    // The follow-up rule holds for the record as it will be stored, so a
    // patch that only flips the flag still needs a date.
    let follow_up_required = params
        .get("followUpRequired")
        .and_then(|v| v.as_bool())
        .or_else(|| existing.map(|c| c.follow_up_required))
        .unwrap_or(false);
    let follow_up_date = str_field(params, "followUpDate")
        .map(|s| s.to_string())
        .or_else(|| existing.and_then(|c| c.follow_up_date.clone()));
    if follow_up_required {
        match follow_up_date.as_deref() {
            None => errors.add(
                "followUpDate",
                "Follow-up date is required when follow-up is needed",
            ),
            Some(v) if !is_valid_date(v) => {
                errors.add("followUpDate", "Follow-up date must be a valid YYYY-MM-DD date")
            }
            Some(_) => {}
        }
    } else if let Some(v) = str_field(params, "followUpDate") {
        if !is_valid_date(v) {
            errors.add("followUpDate", "Follow-up date must be a valid YYYY-MM-DD date");
        }
    }

    // Logged students must belong to the parent the entry is about.
    if let Some(items) = params.get("studentIds").and_then(|v| v.as_array()) {
        let linked = parent_id
            .and_then(|id| store.parents.get_by_id(id).ok())
            .map(|p| p.student_ids)
            .unwrap_or_default();
        for item in items {
            match item.as_i64() {
                Some(id) if linked.contains(&id) => {}
                Some(id) => {
                    errors.add(
                        "studentIds",
                        format!("Student {} is not linked to this parent", id),
                    );
                    break;
                }
                None => {
                    errors.add("studentIds", "Student ids must be a list of numbers");
                    break;
                }
            }
        }
    }

    errors.check()
}

fn communications_list(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let communications = store.communications.get_all()?;
    Ok(json!({ "communications": communications }))
}

fn communications_by_parent(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let parent_id = require_id(params, "parentId")?;
    let mut communications = store.communications.get_all()?;
    communications.retain(|c| c.parent_id == parent_id);
    Ok(json!({ "communications": communications }))
}

fn communications_create(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    validate_communication(store, params, None)?;
    let mut draft: CommunicationDraft = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    if !draft.follow_up_required {
        draft.follow_up_date = None;
    }
    let now = Utc::now().to_rfc3339();
    draft.created_at = now.clone();
    draft.updated_at = now;
    let communication = store.communications.create(draft)?;
    Ok(json!({ "communication": communication }))
}

fn communications_update(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let existing = store.communications.get_by_id(id)?;
    validate_communication(store, params, Some(&existing))?;
    let mut patch: CommunicationPatch = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    patch.updated_at = Some(Utc::now().to_rfc3339());
    let communication = store.communications.update(id, patch)?;
    Ok(json!({ "communication": communication }))
}

fn communications_delete(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = require_id(params, "id")?;
    let communication = store.communications.delete(id)?;
    Ok(json!({ "communication": communication }))
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
        "communications.list" => Some(with_store(state, req, |s, _| communications_list(s))),
        "communications.byParent" => {
            Some(with_store(state, req, |s, p| communications_by_parent(s, p)))
        }
        "communications.create" => Some(with_store(state, req, communications_create)),
        "communications.update" => Some(with_store(state, req, communications_update)),
        "communications.delete" => Some(with_store(state, req, communications_delete)),
        _ => None,
    }
}
