//! Gateway URL construction
//!
//! Published APIs are served at `{base}/{module prefix}/{api path}`. A root
//! prefix (`/` or empty) is left out.

use crate::models::{ApiAssignment, Module};

/// Join the gateway base, module prefix and API path with single slashes
pub fn gateway_url(base: &str, path_prefix: &str, api_path: &str) -> String {
    let base = base.trim_end_matches('/');
    let prefix = path_prefix.trim_matches('/');
    let path = api_path.trim_start_matches('/');

    if prefix.is_empty() {
        format!("{}/{}", base, path)
    } else {
        format!("{}/{}/{}", base, prefix, path)
    }
}

/// URL of an API within its module
pub fn api_url(base: &str, module: &Module, api: &ApiAssignment) -> String {
    gateway_url(base, &module.path_prefix, &api.path)
}
