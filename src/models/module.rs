//! Module and datasource models

use serde::{Deserialize, Serialize};

/// A module groups APIs under a common gateway path prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    /// Gateway path prefix, "/" for the root
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_path_prefix() -> String {
    "/".to_string()
}

/// A database connection SQL APIs execute against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    pub id: String,
    pub name: String,
    /// Database kind (e.g. "postgres", "mysql")
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
}
