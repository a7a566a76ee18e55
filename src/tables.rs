//! Table-level building blocks: the common header, the structure registry
//! and dispatcher, and the concrete table walkers.
//!
//! A table walker decodes its fixed prefix with the field engine, then
//! repeatedly peeks a type/length record head, bounds-checks the declared
//! record length, and hands the record to its registry for dispatch. A
//! truncated record head or an impossible record length abandons the rest
//! of that table; everything else is reported to the tallies and walked
//! past.

pub mod gas;
pub mod header;
pub mod madt;
pub mod pptt;
pub mod registry;

use core::fmt;

use crate::engine::descriptor::FieldDescriptor;
use crate::engine::{Session, decode};
use registry::{HandlerArgs, Registry};

/// Capture slot for the record type code in a walker's lookahead table.
pub(crate) const TYPE_SLOT: usize = 0;
/// Capture slot for the record length in a walker's lookahead table.
pub(crate) const LENGTH_SLOT: usize = 1;

/// Terminal state of a record walk.
///
/// An aborted walk skips the rest of its table, including the final
/// per-type count validation; the overall run continues with the next
/// table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walk {
    Done,
    Aborted,
}

/// Walk the repeating record region of a table.
///
/// `start` is the cursor left by the table's fixed prefix. Each iteration
/// peeks the record head through `lookahead` (untraced), validates the
/// declared length, and dispatches the full record through the registry.
/// Dispatch failures are tallied and walked past; a head that cannot be
/// read or a zero/out-of-bounds length ends the walk.
pub(crate) fn walk_records<const N: usize>(
    s: &mut Session,
    registry: &mut Registry<N>,
    lookahead: &[FieldDescriptor],
    table: &[u8],
    start: usize,
) -> Result<Walk, fmt::Error> {
    let mut offset = start;

    while offset < table.len() {
        let head = decode(s, false, 0, None, &table[offset..], lookahead)?;

        let (Some(type_code), Some(length)) =
            (head.captures.u8(TYPE_SLOT), head.captures.u8(LENGTH_SLOT))
        else {
            s.error(format_args!(
                "Insufficient remaining table buffer length to read the {} \
                 header. Length = {}.",
                registry.name(),
                table.len() - offset,
            ))?;
            return Ok(Walk::Aborted);
        };

        let length = length as usize;
        if length == 0 || offset + length > table.len() {
            s.error(format_args!(
                "Invalid {} length. Length = {}. Offset = {}. Table length = {}.",
                registry.name(),
                length,
                offset,
                table.len(),
            ))?;
            return Ok(Walk::Aborted);
        }

        registry.dispatch_one(
            s,
            2,
            offset,
            type_code,
            &table[offset..offset + length],
            &HandlerArgs::default(),
        )?;

        offset += length;
    }

    Ok(Walk::Done)
}
