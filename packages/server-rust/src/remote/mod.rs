//! Outbound calls to the hosted backend and the retry policy that wraps them.

pub mod config;
pub mod retry;
pub mod supabase;

pub use config::BackendConfig;
pub use retry::RetryPolicy;
pub use supabase::SupabaseClient;
