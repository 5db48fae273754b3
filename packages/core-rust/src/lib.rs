//! Palpiteiro core: CORS origin decisions, route policy, principals, and
//! storage path resolution. No I/O lives here.

pub mod context;
pub mod cors;
pub mod routes;
pub mod storage_path;
pub mod types;

pub use context::RequestContext;
pub use cors::OriginDecision;
pub use routes::RoutePolicy;
pub use storage_path::{resolve_public_url, ObjectLocation, StoragePathError};
pub use types::Principal;
