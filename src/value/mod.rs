//! Value normalization for embedded database records.
//!
//! Records read from a structured-record database can hold anything: nested
//! objects, dates, byte buffers, blobs. Before they go into a snapshot they are
//! converted into [`NormalizedValue`], a JSON-safe tagged union:
//!
//! - dates become `TaggedDate`
//! - byte buffers, typed byte views and blobs become `Elided("binary")`
//! - nesting deeper than the configured limit becomes `Elided("max-depth")`
//!
//! [`denormalize`] is the inverse for every tag except `Elided`, which comes
//! back as a visible [`RuntimeValue::Placeholder`] so data loss can be reported.
//!
//! ```rust
//! use originsnap::value::{denormalize, normalize, RuntimeValue};
//!
//! let record = RuntimeValue::object([("theme", RuntimeValue::from("dark"))]);
//! assert_eq!(denormalize(&normalize(&record)), record);
//! ```

pub mod normalized;
pub mod normalizer;
pub mod runtime;

pub use normalized::{ElisionReason, NormalizedValue, Scalar};
pub use normalizer::{denormalize, normalize, Normalizer};
pub use runtime::RuntimeValue;
