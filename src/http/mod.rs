//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID)
//!     → server.rs variant handler
//!         → experiment subsystem (variant list, cookie, selection)
//!         → variant page fetch
//!         → rewrite subsystem (streaming body)
//!     → response.rs (mirror head, strip framing headers, selection cookie)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, EdgeServer};
