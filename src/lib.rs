//! # Docvault
//!
//! A document portal server, usable both as a standalone binary and as a library.
//!
//! Admins link files stored in the bucket directory to document records and
//! grant per-document view access; members see exactly the documents they
//! were granted.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! docvault = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use docvault::server::{AppState, create_router};
//! use docvault::store::SqliteStore;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/docvault.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     PathBuf::from("./data"),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI dependencies. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod store;
pub mod types;
