//! Test fixtures for common test data
//!
//! JSON bodies as the admin API returns them.

use serde_json::{json, Value};

/// Fixed ids for reproducible tests
pub mod ids {
    pub const API_ID: &str = "api-users";
    pub const MACRO_ID: &str = "macro-paginate";
    pub const MODULE_ID: &str = "mod1";
    pub const CLIENT_ID: &str = "client-1";
}

pub fn api_json(id: &str, published_version_id: Option<&str>, is_published: bool) -> Value {
    json!({
        "id": id,
        "module_id": ids::MODULE_ID,
        "path": "users",
        "http_method": "GET",
        "execute_engine": "SQL",
        "access_type": "private",
        "published_version_id": published_version_id,
        "is_published": is_published,
        "api_context": {
            "content": "SELECT * FROM users",
            "params": [],
            "param_validates": []
        }
    })
}

pub fn macro_json(id: &str, module_id: Option<&str>) -> Value {
    json!({
        "id": id,
        "name": "paginate",
        "macro_type": "JINJA",
        "module_id": module_id,
        "content": "{% macro paginate(n) %}LIMIT {{ n }}{% endmacro %}",
        "is_published": false
    })
}

/// A version as returned by list endpoints (no snapshot)
pub fn version_summary_json(id: &str, entity_id: &str, version: u32) -> Value {
    json!({
        "id": id,
        "api_assignment_id": entity_id,
        "version": version,
        "commit_message": format!("change {}", version),
        "committed_at": "2026-01-15T10:00:00Z"
    })
}

/// A version with its full snapshot
pub fn version_json(id: &str, entity_id: &str, version: u32) -> Value {
    let mut value = version_summary_json(id, entity_id, version);
    value["content_snapshot"] = json!("SELECT * FROM users");
    value["params_snapshot"] = json!([]);
    value["param_validates_snapshot"] = json!([]);
    value
}

pub fn module_json(id: &str, path_prefix: &str) -> Value {
    json!({ "id": id, "name": id, "path_prefix": path_prefix })
}

pub fn client_json(id: &str) -> Value {
    json!({
        "id": id,
        "client_id": "billing",
        "name": "Billing service",
        "rate_limit": 600,
        "group_ids": [],
        "api_assignment_ids": [ids::API_ID],
        "is_active": true
    })
}
