//! The Generic Address Structure, a 12-byte addressing sub-structure
//! embedded in several tables of the family.

use core::fmt::{self, Write};

use crate::engine::descriptor::{FieldDescriptor, FieldFormat};
use crate::engine::{Session, decode};

/// Length of the Generic Address Structure in bytes.
pub const GAS_LENGTH: usize = 12;

const GAS_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new("Address Space ID", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Register Bit Width", 1, 1, FieldFormat::Hex),
    FieldDescriptor::new("Register Bit Offset", 1, 2, FieldFormat::Hex),
    FieldDescriptor::new("Address Size", 1, 3, FieldFormat::Hex),
    FieldDescriptor::new("Address", 8, 4, FieldFormat::Hex),
];

/// Trace a Generic Address Structure at `indent` below the current depth.
///
/// Returns the number of bytes consumed.
pub fn dump_gas_struct(
    s: &mut Session,
    indent: u32,
    data: &[u8],
) -> Result<usize, fmt::Error> {
    writeln!(s)?;
    let decoded = decode(s, true, indent, None, data, &GAS_FIELDS)?;

    Ok(decoded.consumed)
}

/// [`Formatter`](crate::engine::Formatter) rendering a Generic Address
/// Structure field, for embedding in descriptor tables.
pub fn dump_gas(s: &mut Session, data: &[u8]) -> fmt::Result {
    dump_gas_struct(s, 2, &data[..data.len().min(GAS_LENGTH)])?;

    Ok(())
}
