//! MADT walker: the interrupt-controller topology table.
//!
//! The table body is a stream of interrupt controller structures. The
//! x86-family structure types are registered but have no decoder here;
//! the GIC-family structures decode through descriptor tables.

use core::fmt::{self, Write};

use crate::engine::descriptor::{FieldDescriptor, FieldFormat};
use crate::engine::{FieldValidator, Session, arch, decode};
use crate::tables::header::with_table_header;
use crate::tables::registry::{BuildError, Registry, StructEntry};
use crate::tables::{LENGTH_SLOT, TYPE_SLOT, Walk, walk_records};

// Interrupt controller structure types.
const PROCESSOR_LOCAL_APIC: u8 = 0;
const IO_APIC: u8 = 1;
const INTERRUPT_SOURCE_OVERRIDE: u8 = 2;
const NMI_SOURCE: u8 = 3;
const LOCAL_APIC_NMI: u8 = 4;
const LOCAL_APIC_ADDRESS_OVERRIDE: u8 = 5;
const IO_SAPIC: u8 = 6;
const LOCAL_SAPIC: u8 = 7;
const PLATFORM_INTERRUPT_SOURCES: u8 = 8;
const PROCESSOR_LOCAL_X2APIC: u8 = 9;
const LOCAL_X2APIC_NMI: u8 = 10;
const GICC: u8 = 11;
const GICD: u8 = 12;
const GIC_MSI_FRAME: u8 = 13;
const GICR: u8 = 14;
const GIC_ITS: u8 = 15;

const MADT_FIELDS: [FieldDescriptor; 11] = with_table_header![
    FieldDescriptor::new("Local Interrupt Controller Address", 4, 36, FieldFormat::Hex),
    FieldDescriptor::new("Flags", 4, 40, FieldFormat::Hex),
];

const RECORD_HEAD_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::unnamed(1, 0).capture(TYPE_SLOT),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec).capture(LENGTH_SLOT),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
];

const GICC_FIELDS: [FieldDescriptor; 18] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("CPU Interface Number", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("ACPI Processor UID", 4, 8, FieldFormat::Hex),
    FieldDescriptor::new("Flags", 4, 12, FieldFormat::Hex),
    FieldDescriptor::new("Parking Protocol Version", 4, 16, FieldFormat::Hex),
    FieldDescriptor::new("Performance Interrupt GSIV", 4, 20, FieldFormat::Hex),
    FieldDescriptor::new("Parked Address", 8, 24, FieldFormat::Hex),
    FieldDescriptor::new("Physical Base Address", 8, 32, FieldFormat::Hex),
    FieldDescriptor::new("GICV", 8, 40, FieldFormat::Hex),
    FieldDescriptor::new("GICH", 8, 48, FieldFormat::Hex),
    FieldDescriptor::new("VGIC Maintenance interrupt", 4, 56, FieldFormat::Hex),
    FieldDescriptor::new("GICR Base Address", 8, 60, FieldFormat::Hex),
    FieldDescriptor::new("MPIDR", 8, 68, FieldFormat::Hex),
    FieldDescriptor::new("Processor Power Efficiency Class", 1, 76, FieldFormat::Hex),
    FieldDescriptor::new("Reserved", 1, 77, FieldFormat::Hex),
    FieldDescriptor::new("SPE overflow Interrupt", 2, 78, FieldFormat::Hex)
        .validate(FieldValidator::SpeOverflowInterrupt),
];

const GICD_FIELDS: [FieldDescriptor; 8] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("GIC ID", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("Physical Base Address", 8, 8, FieldFormat::Hex),
    FieldDescriptor::new("System Vector Base", 4, 16, FieldFormat::Hex)
        .validate(FieldValidator::SystemVectorBase),
    FieldDescriptor::new("GIC Version", 1, 20, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 3, 21, FieldFormat::Custom(hex_bytes)),
];

const GIC_MSI_FRAME_FIELDS: [FieldDescriptor; 8] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("MSI Frame ID", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("Physical Base Address", 8, 8, FieldFormat::Hex),
    FieldDescriptor::new("Flags", 4, 16, FieldFormat::Hex),
    FieldDescriptor::new("SPI Count", 2, 20, FieldFormat::Dec),
    FieldDescriptor::new("SPI Base", 2, 22, FieldFormat::Hex),
];

const GICR_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("Discovery Range Base Address", 8, 4, FieldFormat::Hex),
    FieldDescriptor::new("Discovery Range Length", 4, 12, FieldFormat::Hex),
];

const GIC_ITS_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor::new("Type", 1, 0, FieldFormat::Hex),
    FieldDescriptor::new("Length", 1, 1, FieldFormat::Dec),
    FieldDescriptor::new("Reserved", 2, 2, FieldFormat::Hex),
    FieldDescriptor::new("GIC ITS ID", 4, 4, FieldFormat::Hex),
    FieldDescriptor::new("Physical Base Address", 8, 8, FieldFormat::Hex),
    FieldDescriptor::new("Reserved", 4, 16, FieldFormat::Hex),
];

/// Space-separated hex bytes, for short reserved runs.
fn hex_bytes(s: &mut Session, data: &[u8]) -> fmt::Result {
    for (index, byte) in data.iter().enumerate() {
        if index > 0 {
            s.write_char(' ')?;
        }
        write!(s, "{byte:x}")?;
    }

    Ok(())
}

static MADT_STRUCTS: [StructEntry; 16] = [
    StructEntry::unimplemented("Processor Local APIC", PROCESSOR_LOCAL_APIC, arch::IA32 | arch::X64),
    StructEntry::unimplemented("I/O APIC", IO_APIC, arch::IA32 | arch::X64),
    StructEntry::unimplemented(
        "Interrupt Source Override",
        INTERRUPT_SOURCE_OVERRIDE,
        arch::IA32 | arch::X64,
    ),
    StructEntry::unimplemented("NMI Source", NMI_SOURCE, arch::IA32 | arch::X64),
    StructEntry::unimplemented("Local APIC NMI", LOCAL_APIC_NMI, arch::IA32 | arch::X64),
    StructEntry::unimplemented(
        "Local APIC Address Override",
        LOCAL_APIC_ADDRESS_OVERRIDE,
        arch::IA32 | arch::X64,
    ),
    StructEntry::unimplemented("I/O SAPIC", IO_SAPIC, arch::IA32 | arch::X64),
    StructEntry::unimplemented("Local SAPIC", LOCAL_SAPIC, arch::IA32 | arch::X64),
    StructEntry::unimplemented(
        "Platform Interrupt Sources",
        PLATFORM_INTERRUPT_SOURCES,
        arch::IA32 | arch::X64,
    ),
    StructEntry::unimplemented(
        "Processor Local x2APIC",
        PROCESSOR_LOCAL_X2APIC,
        arch::IA32 | arch::X64,
    ),
    StructEntry::unimplemented("Local x2APIC NMI", LOCAL_X2APIC_NMI, arch::IA32 | arch::X64),
    StructEntry::fields("GICC", GICC, arch::ARM | arch::AARCH64, &GICC_FIELDS),
    StructEntry::fields("GICD", GICD, arch::ARM | arch::AARCH64, &GICD_FIELDS),
    StructEntry::fields(
        "GIC MSI Frame",
        GIC_MSI_FRAME,
        arch::ARM | arch::AARCH64,
        &GIC_MSI_FRAME_FIELDS,
    ),
    StructEntry::fields("GICR", GICR, arch::ARM | arch::AARCH64, &GICR_FIELDS),
    StructEntry::fields("GIC ITS", GIC_ITS, arch::ARM | arch::AARCH64, &GIC_ITS_FIELDS),
];

/// The MADT walker, owning the interrupt controller structure registry.
pub struct Madt {
    structs: Registry<16>,
}

impl Madt {
    pub fn new() -> Result<Self, BuildError> {
        Ok(Self {
            structs: Registry::new("Interrupt Controller Structure", &MADT_STRUCTS)?,
        })
    }

    /// Per-type instance counts from the most recent pass.
    pub fn structs(&self) -> &Registry<16> {
        &self.structs
    }

    /// Trace and validate one MADT buffer.
    ///
    /// `table` covers the whole table, header included, at its declared
    /// length. Returns whether every structure found is valid for the
    /// session's architecture.
    pub fn parse(&mut self, s: &mut Session, table: &[u8]) -> Result<bool, fmt::Error> {
        if !s.options().trace {
            return Ok(true);
        }

        self.structs.reset_counts();

        let decoded = decode(s, true, 0, Some(&"MADT"), table, &MADT_FIELDS)?;
        let walk =
            walk_records(s, &mut self.structs, &RECORD_HEAD_FIELDS, table, decoded.consumed)?;

        let mut all_valid = true;
        if walk == Walk::Done && s.options().consistency_checks {
            all_valid = self.structs.validate_counts(s)?;

            // One distributor per machine.
            if self.structs.count(GICD) > 1 {
                s.error(format_args!("Only one GICD must be present"))?;
            }
        }

        Ok(all_valid)
    }
}
