//! Cookie capture and replay.
//!
//! - **Records**: [`CookieRecord`](canonical_cookie::CookieRecord), the portable
//!   cookie shape stored in snapshots
//! - **Jar access**: the [`CookieJar`](mirror::CookieJar) trait implemented by the
//!   host environment, and [`CookieMirror`](mirror::CookieMirror) which scopes it to
//!   one target origin
//! - **In-memory jar**: [`MemoryCookieJar`](monster::MemoryCookieJar)
//! - **Formats**: Netscape `cookies.txt`, `Cookie:` header, JSON
//! - **Screening**: public suffix checks for domains read from untrusted snapshots
//!
//! # Export to Netscape Format (curl/wget compatible)
//!
//! ```rust
//! use originsnap::cookies::canonical_cookie::CookieRecord;
//! use originsnap::cookies::format;
//!
//! let cookies = vec![CookieRecord::new("sid", "abc", "example.com")];
//! let text = format::to_netscape(&cookies);
//! assert!(text.contains("example.com\tFALSE\t/\tFALSE\t0\tsid\tabc"));
//! ```

pub mod canonical_cookie;
pub mod format;
pub mod mirror;
pub mod monster;
pub mod psl;

pub use canonical_cookie::{CookieRecord, SameSite};
pub use mirror::{CookieJar, CookieMirror, CookieReplay};
pub use monster::MemoryCookieJar;
