use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::store::SchoolStore;

/// Bundle operations need a durable workspace; an ephemeral store has no
/// database file to package.
fn durable_workspace(state: &AppState) -> Option<PathBuf> {
    state.workspace.clone().filter(|_| state.store.is_some())
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = durable_workspace(state) else {
        return err(
            &req.id,
            "no_workspace",
            "select a durable workspace first",
            None,
        );
    };
    let out_path = match required_str(&req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "bundleId": summary.bundle_id,
                "entryCount": summary.entry_count,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:?}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = durable_workspace(state) else {
        return err(
            &req.id,
            "no_workspace",
            "select a durable workspace first",
            None,
        );
    };
    let in_path = match required_str(&req.params, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };

    // Release the open connection before the database file is replaced.
    state.store = None;
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = SchoolStore::open(&workspace);
    match (imported, reopened) {
        (Ok(summary), Ok(store)) => {
            state.store = Some(store);
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "workspacePath": workspace.to_string_lossy(),
                }),
            )
        }
        (Err(e), reopened) => {
            if let Ok(store) = reopened {
                state.store = Some(store);
            }
            err(&req.id, "import_failed", format!("{e:?}"), None)
        }
        (Ok(_), Err(e)) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_export(state, req)),
        "backup.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
