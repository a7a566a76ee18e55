#![no_std]

//! A tracing decoder and validator for ACPI-style platform configuration
//! tables: binary blobs with a fixed self-describing header followed by a
//! stream of variable-length, type-tagged structures.
//!
//! Acpiscope interprets a table buffer against declarative field-descriptor
//! tables, writing an indented human-readable trace to a caller-supplied
//! writer and tallying structural errors and warnings along the way. Table
//! buffers come from firmware and are treated as untrusted: truncated or
//! inconsistent input degrades the trace and the tallies, never the process.
//!
//! The [`engine`] module holds the descriptor model and the generic decoding
//! loop; the [`tables`] module builds on it with the common table header,
//! the structure registry and dispatcher, and the MADT and PPTT table
//! walkers. Additional table walkers in the same family can be written
//! entirely against the public surface of these two modules.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable the `io::Write` trace adapter (default).

pub mod engine;
pub mod tables;
