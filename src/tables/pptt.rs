//! PPTT walker: the processor-topology table.
//!
//! The table body is a stream of processor topology structures. Processor
//! hierarchy nodes carry a trailing array of private resource references
//! sized by a field read mid-decode, so they go through a custom handler;
//! cache and ID structures are plain descriptor tables.

use core::fmt::{self, Write};

use zerocopy::FromBytes;
use zerocopy::little_endian::U32;

use crate::engine::descriptor::{FieldDescriptor, FieldFormat};
use crate::engine::{FieldValidator, Session, arch, decode};
use crate::tables::header::with_table_header;
use crate::tables::registry::{BuildError, HandlerArgs, Registry, StructEntry, StructLabel};
use crate::tables::{LENGTH_SLOT, TYPE_SLOT, Walk, walk_records};

// Processor topology structure types.
const PROCESSOR: u8 = 0;
const CACHE: u8 = 1;
const ID: u8 = 2;

/// Capture slot for the processor node's private resource count.
const RESOURCE_COUNT_SLOT: usize = 0;

const PPTT_FIELDS: [FieldDescriptor; 9] = with_table_header![];

const RECORD_HEAD_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex).capture(TYPE_SLOT),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec).capture(LENGTH_SLOT),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
];

const PROCESSOR_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("Flags", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("Parent", 4, 8, FieldFormat::Hex),
    FieldDescriptor::new("ACPI Processor ID", 4, 12, FieldFormat::Hex),
    FieldDescriptor::new("Number of private resources", 4, 16, FieldFormat::Dec)
        .capture(RESOURCE_COUNT_SLOT),
];

const CACHE_FIELDS: [FieldDescriptor; 10] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("Flags", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("Next Level of Cache", 4, 8, FieldFormat::Hex),
    FieldDescriptor::new("Size", 4, 12, FieldFormat::Hex),
    FieldDescriptor::new("Number of sets", 4, 16, FieldFormat::Dec)
        .validate(FieldValidator::CacheNumberOfSets),
    FieldDescriptor::new("Associativity", 1, 20, FieldFormat::Dec)
        .validate(FieldValidator::CacheAssociativity),
    FieldDescriptor::new("Attributes", 1, 21, FieldFormat::Hex)
        .validate(FieldValidator::CacheAttributes),
    FieldDescriptor::new("Line size", 2, 22, FieldFormat::Dec)
        .validate(FieldValidator::CacheLineSize),
];

const ID_FIELDS: [FieldDescriptor; 9] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("VENDOR_ID", 4, 4, FieldFormat::Chars),
    FieldDescriptor::new("LEVEL_1_ID", 8, 8, FieldFormat::Hex),
    FieldDescriptor::new("LEVEL_2_ID", 8, 16, FieldFormat::Hex),
    FieldDescriptor::new("MAJOR_REV", 2, 24, FieldFormat::Hex),
    FieldDescriptor::new("MINOR_REV", 2, 26, FieldFormat::Hex),
    FieldDescriptor::new("SPIN_REV", 2, 28, FieldFormat::Hex),
];

/// Decode a processor hierarchy node, then walk its private resource
/// references.
fn parse_processor_node(
    s: &mut Session,
    label: StructLabel,
    data: &[u8],
    _args: &HandlerArgs,
) -> fmt::Result {
    let decoded = decode(s, true, 2, Some(&label), data, &PROCESSOR_FIELDS)?;

    let Some(resources) = decoded.captures.u32(RESOURCE_COUNT_SLOT) else {
        s.error(format_args!(
            "Insufficient {} Structure length. Length = {}.",
            label.name,
            data.len(),
        ))?;
        return Ok(());
    };

    let mut offset = decoded.consumed;

    // The reference array must lie inside this structure.
    if u64::from(resources) * 4 > (data.len() - offset) as u64 {
        s.error(format_args!(
            "Invalid Number of Private Resources. PrivateResourceCount = \
             {resources}. RemainingBufferLength = {}. Parsing of this structure \
             aborted.",
            data.len() - offset,
        ))?;
        return Ok(());
    }

    for index in 0..resources {
        let Ok(reference) = U32::read_from_bytes(&data[offset..offset + 4]) else {
            break;
        };
        s.field_name(4, &format_args!("Private resource [{index}]"))?;
        writeln!(s, "{:#x}", reference.get())?;
        offset += 4;
    }

    Ok(())
}

static PPTT_STRUCTS: [StructEntry; 3] = [
    StructEntry::custom("Processor", PROCESSOR, arch::ANY, parse_processor_node),
    StructEntry::fields("Cache", CACHE, arch::ANY, &CACHE_FIELDS),
    StructEntry::fields("ID", ID, arch::ANY, &ID_FIELDS),
];

/// The PPTT walker, owning the processor topology structure registry.
pub struct Pptt {
    structs: Registry<3>,
}

impl Pptt {
    pub fn new() -> Result<Self, BuildError> {
        Ok(Self {
            structs: Registry::new("Processor Topology Structure", &PPTT_STRUCTS)?,
        })
    }

    /// Per-type instance counts from the most recent pass.
    pub fn structs(&self) -> &Registry<3> {
        &self.structs
    }

    /// Trace and validate one PPTT buffer.
    ///
    /// `table` covers the whole table, header included, at its declared
    /// length. Returns whether every structure found is valid for the
    /// session's architecture.
    pub fn parse(&mut self, s: &mut Session, table: &[u8]) -> Result<bool, fmt::Error> {
        if !s.options().trace {
            return Ok(true);
        }

        self.structs.reset_counts();

        let decoded = decode(s, true, 0, Some(&"PPTT"), table, &PPTT_FIELDS)?;
        let walk =
            walk_records(s, &mut self.structs, &RECORD_HEAD_FIELDS, table, decoded.consumed)?;

        let mut all_valid = true;
        if walk == Walk::Done && s.options().consistency_checks {
            all_valid = self.structs.validate_counts(s)?;
        }

        Ok(all_valid)
    }
}
