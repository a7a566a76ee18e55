//! Execution of a field-descriptor table over a byte buffer.

use core::fmt::{self, Display, Write};

use either::Either::{self, Left, Right};
use zerocopy::FromBytes;
use zerocopy::little_endian::{U16, U32, U64};

use crate::engine::descriptor::{Captures, FieldDescriptor, FieldFormat};
use crate::engine::session::Session;

/// The result of one [`decode`] call.
pub struct Decoded<'a> {
    /// Final cursor value: total bytes consumed by in-range fields.
    pub consumed: usize,
    /// Captured field slices, borrowing from the decoded buffer.
    pub captures: Captures<'a>,
}

/// Decode `buffer` against an ordered descriptor table.
///
/// For each descriptor in turn: a field extending past the end of the
/// buffer is skipped without advancing the cursor and without a capture,
/// and the walk continues with the next descriptor. In-range fields are
/// cross-checked against their declared offset (when consistency checking
/// is enabled), rendered to the trace (when `trace` is set and the field
/// has a label), validated, captured, and consumed.
///
/// `indent` deepens the session indent for the duration of the call.
/// `name`, if given, heads the trace output as a structure name line.
///
/// Field problems are reported through the session tallies; the only
/// failure this function itself returns is a trace-writer error.
pub fn decode<'a>(
    s: &mut Session,
    trace: bool,
    indent: u32,
    name: Option<&dyn Display>,
    buffer: &'a [u8],
    fields: &[FieldDescriptor],
) -> Result<Decoded<'a>, fmt::Error> {
    s.indent += indent;
    let decoded = decode_fields(s, trace, name, buffer, fields);
    s.indent -= indent;

    decoded
}

fn decode_fields<'a>(
    s: &mut Session,
    trace: bool,
    name: Option<&dyn Display>,
    buffer: &'a [u8],
    fields: &[FieldDescriptor],
) -> Result<Decoded<'a>, fmt::Error> {
    let mut offset = 0usize;
    let mut captures = Captures::default();

    if trace && let Some(name) = name {
        s.struct_name(name)?;
    }

    for field in fields {
        let length = field.length as usize;

        // Skipped fields contribute neither output nor cursor movement;
        // a later descriptor may still be in range.
        if offset + length > buffer.len() {
            continue;
        }
        let bytes = &buffer[offset..offset + length];

        if s.options().consistency_checks && offset as u32 != field.offset {
            s.error_inline(format_args!(
                "{}: Offset Mismatch for {}\nCurrentOffset = {} FieldOffset = {}",
                NameOf(name),
                field.name.unwrap_or("(unnamed)"),
                offset,
                field.offset,
            ))?;
            writeln!(s)?;
        }

        if trace && let Some(label) = field.name {
            s.field_name(2, &label)?;
            match field.format {
                FieldFormat::Custom(formatter) => formatter(s, bytes)?,
                FieldFormat::Chars => {
                    for byte in bytes {
                        s.write_char(*byte as char)?;
                    }
                }
                FieldFormat::Hex | FieldFormat::Dec => match field_value(bytes) {
                    Left(value) => {
                        match field.format {
                            FieldFormat::Dec => write!(s, "{value}")?,
                            _ => write!(s, "{value:#x}")?,
                        }
                        if s.options().consistency_checks
                            && let Some(validator) = field.validator
                        {
                            validator.check(s, bytes)?;
                        }
                    }
                    Right(_) => {
                        // A descriptor-table defect, not an input problem;
                        // flagged in the trace without moving the tally.
                        write!(
                            s,
                            "\nERROR: {}: CANNOT PARSE THIS FIELD, Field Length = {}",
                            NameOf(name),
                            field.length,
                        )?;
                    }
                },
            }
            writeln!(s)?;
        }

        if let Some(slot) = field.capture {
            captures.set(slot, bytes);
        }

        offset += length;
    }

    Ok(Decoded {
        consumed: offset,
        captures,
    })
}

/// Width-dispatched field extraction: integer widths read as little-endian
/// values, anything else passes through as raw characters.
fn field_value(bytes: &[u8]) -> Either<u64, &[u8]> {
    match *bytes {
        [b] => Left(u64::from(b)),
        [_, _] => match U16::read_from_bytes(bytes) {
            Ok(value) => Left(value.get().into()),
            Err(_) => Right(bytes),
        },
        [_, _, _, _] => match U32::read_from_bytes(bytes) {
            Ok(value) => Left(value.get().into()),
            Err(_) => Right(bytes),
        },
        [_, _, _, _, _, _, _, _] => match U64::read_from_bytes(bytes) {
            Ok(value) => Left(value.get()),
            Err(_) => Right(bytes),
        },
        _ => Right(bytes),
    }
}

/// Displays an optional structure name in diagnostics.
struct NameOf<'a>(Option<&'a dyn Display>);

impl Display for NameOf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => name.fmt(f),
            None => f.write_str("(unnamed)"),
        }
    }
}
