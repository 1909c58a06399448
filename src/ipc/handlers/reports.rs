use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::reports::compose_overview;
use crate::store::SchoolStore;

fn reports_overview(store: &SchoolStore) -> Result<serde_json::Value, HandlerErr> {
    let students = store.students.get_all()?;
    let grades = store.grades.get_all()?;
    let attendance = store.attendance.get_all()?;
    let overview = compose_overview(&students, &grades, &attendance);
    Ok(json!(overview))
}

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match reports_overview(store) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}
