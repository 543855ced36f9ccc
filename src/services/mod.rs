//! Business logic services

pub mod backend;
pub mod cache;
pub mod capabilities;
pub mod debug;
pub mod gateway_url;
pub mod http_client;
pub mod lifecycle;
pub mod macro_scope;
pub mod memory;
pub mod secrets;

pub use backend::AdminBackend;
pub use cache::{Cache, CacheEntry, CachedBackend};
pub use capabilities::{AllowAll, Capabilities, RoleCapabilities};
pub use debug::{DebugForm, DebugInput, DebugRunner, GatewayInvoker, GatewayResponse};
pub use gateway_url::{api_url, gateway_url};
pub use http_client::AdminHttpClient;
pub use lifecycle::{Confirmation, PublishState, TransitionError, VersionLifecycle};
pub use macro_scope::{macros_in_scope, render_macro_preamble, MacroScope};
pub use memory::InMemoryBackend;
pub use secrets::CredentialService;
