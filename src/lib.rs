//! A/B test variant selection and page rewriting edge handler.

pub mod config;
pub mod error;
pub mod experiment;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::EdgeConfig;
pub use error::EdgeError;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
