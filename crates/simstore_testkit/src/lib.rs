//! # simstore Testkit
//!
//! Test utilities for simstore.
//!
//! This crate provides:
//! - Project layout fixtures written to temporary directories
//! - Engine helpers with in-memory or temporary-directory persistence
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use simstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_engine() {
//!     with_temp_engine(|engine| {
//!         let posts = engine.create_data_store("Acme\\Blog", "Posts");
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
