//! The generic field-descriptor execution engine.
//!
//! A structure layout is described by an ordered slice of
//! [`FieldDescriptor`]s, each naming one fixed-width field at a declared
//! offset. [`decode`] walks a byte buffer against such a slice: it renders
//! each field to the session's trace writer, cross-checks the declared
//! offsets against the running cursor, applies semantic field validators,
//! and hands selected field slices back to the caller through capture slots.
//!
//! Decoding is deliberately tolerant of short buffers. A field that does not
//! fit in the remaining bytes is skipped entirely (no cursor movement, no
//! capture) and the walk continues with the next descriptor, so a truncated
//! structure still reports its in-range prefix.
//!
//! All shared mutable state lives in a [`Session`], which owns the output
//! writer, the indent depth, the error and warning tallies, and the
//! per-run configuration. Two concurrent table passes need two sessions;
//! nothing in this crate is process-global.

pub mod decode;
pub mod descriptor;
pub mod session;
pub mod validate;

pub use decode::{Decoded, decode};
pub use descriptor::{CAPTURE_SLOTS, Captures, FieldDescriptor, FieldFormat, Formatter};
pub use session::{Options, Session, arch};
pub use validate::FieldValidator;

#[cfg(feature = "std")]
pub use session::IoWriter;
