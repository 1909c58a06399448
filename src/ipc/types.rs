use std::path::PathBuf;

use serde::Deserialize;

use crate::store::SchoolStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    /// Set for durable workspaces; `None` while no workspace is selected or
    /// when an ephemeral one is in use.
    pub workspace: Option<PathBuf>,
    pub store: Option<SchoolStore>,
}
