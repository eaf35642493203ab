//! HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! upstream body (reqwest bytes_stream)
//!     → forwarder task (bounded channel)
//!     → page.rs rewriter worker (selector-keyed element handlers)
//!         title          → page title
//!         h1#title       → heading
//!         p#description  → description
//!         a#url          → href + link text
//!     → bounded channel → response body stream
//! ```
//!
//! # Design Decisions
//! - Never buffers the whole document; unmatched bytes pass through unchanged
//! - Handlers are independent; a missing element is a no-op
//! - Failures after the response head end the body instead of changing status

pub mod page;

pub use page::PageEdits;
