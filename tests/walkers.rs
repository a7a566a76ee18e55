use acpiscope::engine::{Options, Session, arch};
use acpiscope::tables::header::{dump_header, parse_header};
use acpiscope::tables::{gas, madt::Madt, pptt::Pptt};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{Immutable, IntoBytes};

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct TableHeader {
    signature: [u8; 4],
    length: U32,
    revision: u8,
    checksum: u8,
    oem_id: [u8; 6],
    oem_table_id: [u8; 8],
    oem_revision: U32,
    creator_id: [u8; 4],
    creator_revision: U32,
}

impl TableHeader {
    fn new(signature: &[u8; 4], length: u32) -> Self {
        Self {
            signature: *signature,
            length: U32::new(length),
            revision: 5,
            checksum: 0,
            oem_id: *b"OEMID ",
            oem_table_id: *b"TABLEID ",
            oem_revision: U32::new(1),
            creator_id: *b"CRID",
            creator_revision: U32::new(1),
        }
    }
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct MadtPrefix {
    header: TableHeader,
    local_interrupt_controller_address: U32,
    flags: U32,
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct GicD {
    kind: u8,
    length: u8,
    reserved: [u8; 2],
    gic_id: U32,
    physical_base_address: U64,
    system_vector_base: U32,
    gic_version: u8,
    reserved_tail: [u8; 3],
}

impl GicD {
    fn new() -> Self {
        Self {
            kind: 12,
            length: 24,
            reserved: [0; 2],
            gic_id: U32::new(0),
            physical_base_address: U64::new(0x8000_0000),
            system_vector_base: U32::new(0),
            gic_version: 3,
            reserved_tail: [0; 3],
        }
    }
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct GicR {
    kind: u8,
    length: u8,
    reserved: [u8; 2],
    discovery_range_base_address: U64,
    discovery_range_length: U32,
}

impl GicR {
    fn new() -> Self {
        Self {
            kind: 14,
            length: 16,
            reserved: [0; 2],
            discovery_range_base_address: U64::new(0x80A0_0000),
            discovery_range_length: U32::new(0x20_0000),
        }
    }
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct GicIts {
    kind: u8,
    length: u8,
    reserved: [u8; 2],
    gic_its_id: U32,
    physical_base_address: U64,
    reserved_tail: U32,
}

impl GicIts {
    fn new() -> Self {
        Self {
            kind: 15,
            length: 20,
            reserved: [0; 2],
            gic_its_id: U32::new(0),
            physical_base_address: U64::new(0x8080_0000),
            reserved_tail: U32::new(0),
        }
    }
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct ProcessorNode {
    kind: u8,
    length: u8,
    reserved: [u8; 2],
    flags: U32,
    parent: U32,
    acpi_processor_id: U32,
    private_resource_count: U32,
}

#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
struct CacheNode {
    kind: u8,
    length: u8,
    reserved: [u8; 2],
    flags: U32,
    next_level: U32,
    size: U32,
    number_of_sets: U32,
    associativity: u8,
    attributes: u8,
    line_size: zerocopy::little_endian::U16,
}

impl CacheNode {
    fn new() -> Self {
        Self {
            kind: 1,
            length: 24,
            reserved: [0; 2],
            flags: U32::new(0xFF),
            next_level: U32::new(0),
            size: U32::new(0x8000),
            number_of_sets: U32::new(128),
            associativity: 4,
            attributes: 0x0A,
            line_size: zerocopy::little_endian::U16::new(64),
        }
    }
}

fn arm_options() -> Options {
    Options {
        arch: arch::ARM | arch::AARCH64,
        ..Options::default()
    }
}

/// Assemble a table from a prefix and records, patching the header length.
fn table(prefix: &[u8], records: &[&[u8]]) -> Vec<u8> {
    let mut buffer = prefix.to_vec();
    for record in records {
        buffer.extend_from_slice(record);
    }
    let length = (buffer.len() as u32).to_le_bytes();
    buffer[4..8].copy_from_slice(&length);
    buffer
}

fn madt_prefix(length: u32) -> MadtPrefix {
    MadtPrefix {
        header: TableHeader::new(b"APIC", length),
        local_interrupt_controller_address: U32::new(0),
        flags: U32::new(0),
    }
}

#[test]
fn header_views_agree() {
    let header = TableHeader::new(b"APIC", 36);
    let bytes = header.as_bytes();

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let consumed = dump_header(&mut s, bytes).unwrap();
    assert_eq!(consumed, 36);
    assert!(out.contains("Signature"));
    assert!(out.contains("APIC"));
    assert!(out.contains("Oem ID"));

    let mut quiet = String::new();
    let mut s = Session::new(&mut quiet, Options::default());
    let (consumed, info) = parse_header(&mut s, bytes).unwrap();
    assert_eq!(consumed, 36);
    assert!(quiet.is_empty());
    assert_eq!(info.signature, Some(&b"APIC"[..]));
    assert_eq!(info.length, Some(36));
    assert_eq!(info.revision, Some(5));
}

#[test]
fn truncated_header_reports_what_it_can() {
    let header = TableHeader::new(b"APIC", 36);
    let bytes = &header.as_bytes()[..8];

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let (consumed, info) = parse_header(&mut s, bytes).unwrap();

    assert_eq!(consumed, 8);
    assert_eq!(info.signature, Some(&b"APIC"[..]));
    assert_eq!(info.length, Some(36));
    assert_eq!(info.revision, None);
}

#[test]
fn madt_walks_an_exactly_sized_body_to_completion() {
    let fixture = table(
        madt_prefix(0).as_bytes(),
        &[
            GicD::new().as_bytes(),
            GicR::new().as_bytes(),
            GicIts::new().as_bytes(),
        ],
    );

    let mut out = String::new();
    let mut s = Session::new(&mut out, arm_options());
    let mut madt = Madt::new().unwrap();
    let all_valid = madt.parse(&mut s, &fixture).unwrap();

    assert!(all_valid);
    assert_eq!(s.error_count(), 0);
    assert_eq!(s.warning_count(), 0);
    assert_eq!(madt.structs().sum_counts(), 3);
    assert_eq!(madt.structs().count(12), 1);
    assert_eq!(madt.structs().count(14), 1);
    assert_eq!(madt.structs().count(15), 1);

    assert!(out.contains("MADT"));
    assert!(out.contains("GICD [0]"));
    assert!(out.contains("GICR [0]"));
    assert!(out.contains("GIC ITS [0]"));
    assert!(out.contains("Table Breakdown:"));
}

#[test]
fn madt_aborts_on_a_zero_length_record() {
    let mut second = GicR::new();
    second.length = 0;
    let fixture = table(
        madt_prefix(0).as_bytes(),
        &[
            GicD::new().as_bytes(),
            second.as_bytes(),
            GicIts::new().as_bytes(),
        ],
    );

    let mut out = String::new();
    let options = Options {
        consistency_checks: false,
        ..arm_options()
    };
    let mut s = Session::new(&mut out, options);
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert_eq!(madt.structs().sum_counts(), 1);
    assert!(out.contains("Invalid Interrupt Controller Structure length"));
}

#[test]
fn madt_aborts_on_a_record_running_past_the_table() {
    let mut last = GicR::new();
    last.length = 64;
    let fixture = table(
        madt_prefix(0).as_bytes(),
        &[GicD::new().as_bytes(), last.as_bytes()],
    );

    let mut out = String::new();
    let options = Options {
        consistency_checks: false,
        ..arm_options()
    };
    let mut s = Session::new(&mut out, options);
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert_eq!(madt.structs().sum_counts(), 1);
}

#[test]
fn madt_aborts_on_a_truncated_record_head() {
    let mut fixture = table(madt_prefix(0).as_bytes(), &[GicD::new().as_bytes()]);
    fixture.push(11);
    let length = (fixture.len() as u32).to_le_bytes();
    fixture[4..8].copy_from_slice(&length);

    let mut out = String::new();
    let options = Options {
        consistency_checks: false,
        ..arm_options()
    };
    let mut s = Session::new(&mut out, options);
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert_eq!(madt.structs().sum_counts(), 1);
    assert!(out.contains("Insufficient remaining table buffer length"));
}

#[test]
fn madt_reports_duplicate_distributors() {
    let fixture = table(
        madt_prefix(0).as_bytes(),
        &[GicD::new().as_bytes(), GicD::new().as_bytes()],
    );

    let mut out = String::new();
    let mut s = Session::new(&mut out, arm_options());
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(madt.structs().count(12), 2);
    assert_eq!(s.error_count(), 1);
    assert!(out.contains("Only one GICD must be present"));
}

#[test]
fn madt_reports_unknown_types_and_keeps_walking() {
    let unknown = [99u8, 8, 0, 0, 0, 0, 0, 0];
    let fixture = table(
        madt_prefix(0).as_bytes(),
        &[&unknown, GicR::new().as_bytes()],
    );

    let mut out = String::new();
    let options = Options {
        consistency_checks: false,
        ..arm_options()
    };
    let mut s = Session::new(&mut out, options);
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert!(out.contains("Unknown Interrupt Controller Structure. Type = 99."));
    assert_eq!(madt.structs().count(14), 1);
}

#[test]
fn madt_flags_structures_foreign_to_the_architecture() {
    // A Local APIC on an Arm session: unimplemented parser, then flagged
    // again by the breakdown.
    let local_apic = [0u8, 8, 0, 0, 1, 0, 0, 0];
    let fixture = table(madt_prefix(0).as_bytes(), &[&local_apic]);

    let mut out = String::new();
    let mut s = Session::new(&mut out, arm_options());
    let mut madt = Madt::new().unwrap();
    let all_valid = madt.parse(&mut s, &fixture).unwrap();

    assert!(!all_valid);
    assert_eq!(s.error_count(), 2);
    assert!(out.contains("Parsing of Processor Local APIC Structure is not implemented"));
    assert!(
        out.contains("Processor Local APIC Structure is not valid for the target architecture")
    );
}

#[test]
fn madt_reports_validator_findings_inline() {
    let mut distributor = GicD::new();
    distributor.system_vector_base = U32::new(32);
    let fixture = table(madt_prefix(0).as_bytes(), &[distributor.as_bytes()]);

    let mut out = String::new();
    let mut s = Session::new(&mut out, arm_options());
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert!(out.contains("System Vector Base must be zero"));
    // A validator finding does not fail dispatch.
    assert_eq!(madt.structs().count(12), 1);
}

#[test]
fn madt_does_nothing_with_tracing_off() {
    let fixture = table(madt_prefix(0).as_bytes(), &[GicD::new().as_bytes()]);

    let mut out = String::new();
    let options = Options {
        trace: false,
        ..arm_options()
    };
    let mut s = Session::new(&mut out, options);
    let mut madt = Madt::new().unwrap();
    madt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 0);
    assert!(out.is_empty());
}

#[test]
fn pptt_walks_processors_caches_and_ids() {
    let processor = ProcessorNode {
        kind: 0,
        length: 28,
        reserved: [0; 2],
        flags: U32::new(1),
        parent: U32::new(0),
        acpi_processor_id: U32::new(7),
        private_resource_count: U32::new(2),
    };
    let mut processor_bytes = processor.as_bytes().to_vec();
    processor_bytes.extend_from_slice(&0x40u32.to_le_bytes());
    processor_bytes.extend_from_slice(&0x58u32.to_le_bytes());

    let fixture = table(
        TableHeader::new(b"PPTT", 0).as_bytes(),
        &[&processor_bytes, CacheNode::new().as_bytes()],
    );

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let mut pptt = Pptt::new().unwrap();
    pptt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 0);
    assert_eq!(s.warning_count(), 0);
    assert_eq!(pptt.structs().count(0), 1);
    assert_eq!(pptt.structs().count(1), 1);

    assert!(out.contains("Processor [0]"));
    assert!(out.contains("Private resource [0]"));
    assert!(out.contains("Private resource [1]"));
    assert!(out.contains("Cache [0]"));
    assert!(out.contains("Number of sets"));
}

#[test]
fn pptt_flags_an_impossible_resource_count() {
    let processor = ProcessorNode {
        kind: 0,
        length: 20,
        reserved: [0; 2],
        flags: U32::new(1),
        parent: U32::new(0),
        acpi_processor_id: U32::new(7),
        private_resource_count: U32::new(8),
    };

    let fixture = table(
        TableHeader::new(b"PPTT", 0).as_bytes(),
        &[processor.as_bytes(), CacheNode::new().as_bytes()],
    );

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let mut pptt = Pptt::new().unwrap();
    pptt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 1);
    assert!(out.contains("Invalid Number of Private Resources"));

    // The structure still dispatched; the walk reached the cache node.
    assert_eq!(pptt.structs().count(0), 1);
    assert_eq!(pptt.structs().count(1), 1);
}

#[test]
fn pptt_tallies_cache_rule_violations() {
    let mut cache = CacheNode::new();
    cache.number_of_sets = U32::new(0);
    cache.associativity = 0;
    cache.line_size = zerocopy::little_endian::U16::new(24);

    let fixture = table(TableHeader::new(b"PPTT", 0).as_bytes(), &[cache.as_bytes()]);

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let mut pptt = Pptt::new().unwrap();
    pptt.parse(&mut s, &fixture).unwrap();

    assert_eq!(s.error_count(), 3);
    assert_eq!(pptt.structs().count(1), 1);
}

#[test]
fn gas_substructure_dumps_through_the_engine() {
    let mut raw = Vec::new();
    raw.push(0u8);
    raw.push(32);
    raw.push(0);
    raw.push(3);
    raw.extend_from_slice(&0x4400_0000u64.to_le_bytes());

    let mut out = String::new();
    let mut s = Session::new(&mut out, Options::default());
    let consumed = gas::dump_gas_struct(&mut s, 2, &raw).unwrap();

    assert_eq!(consumed, gas::GAS_LENGTH);
    assert_eq!(s.error_count(), 0);
    assert!(out.contains("Address Space ID"));
    assert!(out.contains("0x44000000"));
}
