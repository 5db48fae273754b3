//! Palpiteiro gateway server: CORS-aware authentication gateway, built-in
//! API handlers, and the hosted-backend client behind them.

pub mod gateway;
pub mod network;
pub mod remote;
pub mod traits;

pub use gateway::{GatewayConfig, GatewayLayer, GatewayRejection};
pub use network::{NetworkConfig, NetworkModule};
pub use remote::{BackendConfig, RetryPolicy, SupabaseClient};
pub use traits::{IdentityError, IdentityProvider, ObjectStore, StorageError, TokenLookup};
