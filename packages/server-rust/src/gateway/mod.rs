//! The request gateway: CORS, bearer authentication, and admin gating in
//! front of every API handler.

pub mod config;
pub mod cors;
pub mod layer;
pub mod rejection;

pub use config::GatewayConfig;
pub use cors::{apply_cors_headers, preflight_response};
pub use layer::{GatewayLayer, GatewayService};
pub use rejection::{error_response, GatewayRejection};
