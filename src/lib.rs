//! # originsnap
//!
//! Capture and replay the full client-side state of a web origin.
//!
//! A snapshot holds an origin's cookies, its two scoped key-value stores
//! (`localStorage` / `sessionStorage`) and every embedded structured-record
//! database, as one portable JSON document. Snapshots can be restored onto the
//! same or a different browsing context.
//!
//! ## Features
//!
//! - **Value Normalization**: nested database records become a JSON-safe tagged
//!   union; dates survive, binary payloads are elided and reported
//! - **Size-Bounded Persistence**: oversized captures degrade category by
//!   category instead of failing, and say what they dropped
//! - **Ordered Restore**: domain check, cookie, store and database replay as an
//!   observable state machine with a fallback timer
//! - **Cookie Safety**: session/expiry normalization, prefix rules, Public
//!   Suffix List screening of imported records
//! - **Portable Files**: import/export, including files from older tools
//!
//! ## Quick Start
//!
//! ```rust
//! use originsnap::config::EngineConfig;
//! use originsnap::context::MemoryContext;
//! use originsnap::cookies::CookieRecord;
//! use originsnap::restore::{DomainDecision, FixedDecision, RestoreOrchestrator};
//! use originsnap::snapshot::MemoryCatalog;
//! use originsnap::storage::StoreScope;
//! use originsnap::vault::SnapshotVault;
//! use std::sync::Arc;
//! use url::Url;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), originsnap::base::SnapError> {
//! let source = MemoryContext::new("tab-1", Url::parse("https://x.com/").unwrap());
//! source.jar().insert(CookieRecord::new("sid", "abc", "x.com"));
//! source.store(StoreScope::Local).insert("theme", "dark");
//!
//! let vault = SnapshotVault::new(Arc::new(MemoryCatalog::new()), EngineConfig::default());
//! let captured = vault.capture(&source, "work").await?;
//!
//! let target = MemoryContext::new("tab-2", Url::parse("https://x.com/").unwrap());
//! let restorer = RestoreOrchestrator::new(
//!     EngineConfig::default(),
//!     Arc::new(FixedDecision(DomainDecision::Cancel)),
//! );
//! let report = vault.restore(&restorer, &target, &captured.snapshot_id).await?;
//! assert_eq!(report.cookies_restored, 1);
//! assert_eq!(report.key_value_items_restored, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and context helpers
//! - [`config`] - Engine tuning
//! - [`value`] - Value normalizer
//! - [`cookies`] - Cookie records, jar access, formats, PSL checks
//! - [`storage`] - Key-value store mirror
//! - [`database`] - Embedded database mirror
//! - [`context`] - Target-context execution facility
//! - [`snapshot`] - Snapshot records and catalogs
//! - [`capture`] - Capture orchestrator and degrade ladder
//! - [`restore`] - Restore state machine
//! - [`vault`] - Snapshot management, import/export, credential gate
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.

pub mod base;
pub mod capture;
pub mod config;
pub mod context;
pub mod cookies;
pub mod database;
pub mod restore;
pub mod snapshot;
pub mod storage;
pub mod value;
pub mod vault;
