use serde_json::json;
use std::path::PathBuf;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::SchoolStore;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ephemeral = req
        .params
        .get("ephemeral")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if ephemeral {
        state.workspace = None;
        state.store = Some(SchoolStore::ephemeral());
        return ok(&req.id, json!({ "backend": "memory" }));
    }

    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = path else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SchoolStore::open(&path) {
        Ok(store) => {
            state.workspace = Some(path.clone());
            state.store = Some(store);
            ok(
                &req.id,
                json!({
                    "backend": "sqlite",
                    "workspacePath": path.to_string_lossy()
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
