pub mod auth;
pub mod convert;
pub mod documents;
pub mod error;
pub mod koperasi;
pub mod location;
pub mod routes;
pub mod session;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
