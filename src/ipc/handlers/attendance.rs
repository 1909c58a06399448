use serde_json::json;

use crate::calc::{attendance_stats, DateRange};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{is_valid_date, require_id, str_field, FieldErrors, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::store::SchoolStore;

fn attendance_list(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let records = store.attendance.get_all()?;
    Ok(json!({ "records": records }))
}

fn attendance_by_date(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = str_field(params, "date")
        .ok_or_else(|| HandlerErr::bad_params("missing date"))?
        .to_string();
    let mut records = store.attendance.get_all()?;
    records.retain(|r| r.date == date);
    Ok(json!({ "records": records }))
}

fn attendance_by_student(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = require_id(params, "studentId")?;
    let mut records = store.attendance.get_all()?;
    records.retain(|r| r.student_id == student_id);
    Ok(json!({ "records": records }))
}

/// Create-or-update for the (studentId, date) key. Marking the same pair
/// again replaces status and notes on the existing record.
fn attendance_mark(
    store: &mut SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut errors = FieldErrors::new();

    let student_id = params.get("studentId").and_then(|v| v.as_i64());
    match student_id {
        Some(id) => {
            if store.students.get_by_id(id).is_err() {
                errors.add("studentId", format!("Student {} does not exist", id));
            }
        }
        None => errors.add("studentId", "Student is required"),
    }

    let date = str_field(params, "date");
    match date {
        Some(v) if !is_valid_date(v) => {
            errors.add("date", "Date must be a valid YYYY-MM-DD date")
        }
        Some(_) => {}
        None => errors.add("date", "Date is required"),
    }

    let status = str_field(params, "status");
    let parsed_status = status.and_then(AttendanceStatus::parse);
    match status {
        Some(_) if parsed_status.is_none() => errors.add(
            "status",
            "Status must be present, absent, late, or excused",
        ),
        Some(_) => {}
        None => errors.add("status", "Status is required"),
    }

    errors.check()?;
    let (Some(student_id), Some(date), Some(status)) = (student_id, date, parsed_status) else {
        return Err(HandlerErr::bad_params("missing attendance fields"));
    };

    let notes = str_field(params, "notes").map(|s| s.to_string());
    let record = store.attendance.mark(student_id, date, status, notes)?;
    Ok(json!({ "record": record }))
}

fn attendance_stats_view(
    store: &SchoolStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let start = str_field(params, "start");
    let end = str_field(params, "end");
    let range = match (start, end) {
        (None, None) => None,
        (Some(start), Some(end)) => {
            if !is_valid_date(start) || !is_valid_date(end) {
                return Err(HandlerErr::bad_params(
                    "start and end must be YYYY-MM-DD dates",
                ));
            }
            Some(DateRange {
                start: start.to_string(),
                end: end.to_string(),
            })
        }
        _ => {
            return Err(HandlerErr::bad_params(
                "start and end must be provided together",
            ))
        }
    };

    let records = store.attendance.get_all()?;
    let stats = attendance_stats(&records, range.as_ref());
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
        "attendance.list" => Some(with_store(state, req, |s, _| attendance_list(s))),
        "attendance.byDate" => Some(with_store(state, req, |s, p| attendance_by_date(s, p))),
        "attendance.byStudent" => Some(with_store(state, req, |s, p| attendance_by_student(s, p))),
        "attendance.mark" => Some(with_store(state, req, attendance_mark)),
        "attendance.stats" => Some(with_store(state, req, |s, p| attendance_stats_view(s, p))),
        _ => None,
    }
}
