//! Data models

mod api_assignment;
mod client;
mod debug;
mod macro_def;
mod module;
mod param;
mod rbac;
mod version;

pub use api_assignment::*;
pub use client::*;
pub use debug::*;
pub use macro_def::*;
pub use module::*;
pub use param::*;
pub use rbac::*;
pub use version::*;
