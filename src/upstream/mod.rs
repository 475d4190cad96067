//! Upstream module - wire types, credential rotation and the dispatcher

pub mod credentials;
pub mod dispatcher;
pub mod traits;
pub mod types;

pub use credentials::CredentialPool;
pub use dispatcher::Dispatcher;
pub use traits::GenerationClient;
