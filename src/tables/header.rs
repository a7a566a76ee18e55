//! The common table header shared by every table in the family.

use core::fmt;

use crate::engine::descriptor::FieldDescriptor;
use crate::engine::{Session, decode};

/// Length of the common header in bytes.
pub const HEADER_LENGTH: usize = 36;

/// Capture slot for the table signature.
pub const SIGNATURE_SLOT: usize = 0;
/// Capture slot for the declared table length.
pub const LENGTH_SLOT: usize = 1;
/// Capture slot for the table revision.
pub const REVISION_SLOT: usize = 2;

/// Expands to a descriptor array opening with the nine common header
/// fields, optionally followed by table-specific rows.
///
/// Both header views and every table-level prefix table are built from this
/// single layout, so they cannot drift apart.
macro_rules! with_table_header {
    ($($field:expr),* $(,)?) => {
        [
            $crate::engine::descriptor::FieldDescriptor::new(
                "Signature", 4, 0, $crate::engine::descriptor::FieldFormat::Chars)
                .capture($crate::tables::header::SIGNATURE_SLOT),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Length", 4, 4, $crate::engine::descriptor::FieldFormat::Dec)
                .capture($crate::tables::header::LENGTH_SLOT),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Revision", 1, 8, $crate::engine::descriptor::FieldFormat::Hex)
                .capture($crate::tables::header::REVISION_SLOT),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Checksum", 1, 9, $crate::engine::descriptor::FieldFormat::Hex),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Oem ID", 6, 10, $crate::engine::descriptor::FieldFormat::Chars),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Oem Table ID", 8, 16, $crate::engine::descriptor::FieldFormat::Chars),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Oem Revision", 4, 24, $crate::engine::descriptor::FieldFormat::Hex),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Creator ID", 4, 28, $crate::engine::descriptor::FieldFormat::Chars),
            $crate::engine::descriptor::FieldDescriptor::new(
                "Creator Revision", 4, 32, $crate::engine::descriptor::FieldFormat::Hex),
            $($field),*
        ]
    };
}

pub(crate) use with_table_header;

const HEADER_FIELDS: [FieldDescriptor; 9] = with_table_header![];

/// The signature, length, and revision locations captured from a header.
///
/// Fields the buffer was too short to hold are absent.
#[derive(Clone, Copy)]
pub struct HeaderInfo<'a> {
    pub signature: Option<&'a [u8]>,
    pub length: Option<u32>,
    pub revision: Option<u8>,
}

/// Trace the common header at the start of `table`.
///
/// Returns the number of bytes consumed.
pub fn dump_header(s: &mut Session, table: &[u8]) -> Result<usize, fmt::Error> {
    let capped = &table[..table.len().min(HEADER_LENGTH)];
    let decoded = decode(s, true, 0, Some(&"ACPI Table Header"), capped, &HEADER_FIELDS)?;

    Ok(decoded.consumed)
}

/// Decode the common header untraced, capturing the fields a walker needs
/// before table-specific parsing begins.
pub fn parse_header<'a>(
    s: &mut Session,
    table: &'a [u8],
) -> Result<(usize, HeaderInfo<'a>), fmt::Error> {
    let capped = &table[..table.len().min(HEADER_LENGTH)];
    let decoded = decode(s, false, 0, None, capped, &HEADER_FIELDS)?;

    Ok((
        decoded.consumed,
        HeaderInfo {
            signature: decoded.captures.bytes(SIGNATURE_SLOT),
            length: decoded.captures.u32(LENGTH_SLOT),
            revision: decoded.captures.u8(REVISION_SLOT),
        },
    ))
}
