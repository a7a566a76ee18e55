//! Semantic field validators.
//!
//! Validators never halt decoding; they write into the current trace line
//! and move the session tallies. Given the same field bytes they produce
//! the same diagnostics and the same tally deltas regardless of what was
//! decoded before them.

use core::fmt;

use tartan_bitfield::bitfield;
use zerocopy::FromBytes;
use zerocopy::little_endian::{U16, U32};

use crate::engine::session::Session;

// Private Peripheral Interrupt ID assignments, including the extended
// range introduced with GICv3.1.
const PPI_ID_MIN: u16 = 16;
const PPI_ID_MAX: u16 = 31;
const PPI_ID_EXTENDED_MIN: u16 = 1056;
const PPI_ID_EXTENDED_MAX: u16 = 1119;

/// PPI ID assigned to the SPE overflow interrupt by SBSA Level 3.
const PPI_ID_PMBIRQ: u16 = 21;

/// Maximum cache sets encodable with the CCIDX extension.
const CCIDX_CACHE_SETS_MAX: u32 = 1 << 24;
/// Maximum cache sets encodable without the CCIDX extension.
const CACHE_SETS_MAX: u32 = 1 << 15;

const CACHE_LINE_SIZE_MIN: u16 = 16;
const CACHE_LINE_SIZE_MAX: u16 = 2048;

bitfield! {
    struct CacheAttributes(u8) {
        [5..8] reserved: u8,
    }
}

/// The semantic checks a field descriptor can carry.
#[derive(Clone, Copy)]
pub enum FieldValidator {
    /// Interrupt distributor system vector base, fixed at zero.
    SystemVectorBase,
    /// Statistical profiling overflow interrupt ID: absent (zero) or a PPI.
    SpeOverflowInterrupt,
    /// Cache associativity, at least one way.
    CacheAssociativity,
    /// Cache number of sets, nonzero and within encodable bounds.
    CacheNumberOfSets,
    /// Cache line size, a power of two within architectural bounds.
    CacheLineSize,
    /// Cache attributes byte, reserved high bits clear.
    CacheAttributes,
}

impl FieldValidator {
    /// Apply this check to one field's bytes.
    pub fn check(self, s: &mut Session, bytes: &[u8]) -> fmt::Result {
        match self {
            Self::SystemVectorBase => {
                if let Some(base) = read_u32(bytes)
                    && base != 0
                {
                    s.error_inline(format_args!("System Vector Base must be zero."))?;
                }
            }
            Self::SpeOverflowInterrupt => {
                let Some(interrupt) = read_u16(bytes) else {
                    return Ok(());
                };
                // Zero means the processor does not implement SPE.
                if interrupt == 0 {
                    return Ok(());
                }
                if !(PPI_ID_MIN..=PPI_ID_MAX).contains(&interrupt)
                    && !(PPI_ID_EXTENDED_MIN..=PPI_ID_EXTENDED_MAX).contains(&interrupt)
                {
                    s.error_inline(format_args!(
                        "SPE Overflow Interrupt ID of {interrupt} is not in the \
                         allowed PPI ID ranges of {PPI_ID_MIN}-{PPI_ID_MAX} or \
                         {PPI_ID_EXTENDED_MIN}-{PPI_ID_EXTENDED_MAX} (for GICv3.1 \
                         or later)."
                    ))?;
                } else if interrupt != PPI_ID_PMBIRQ {
                    s.warning_inline(format_args!(
                        "SPE Overflow Interrupt ID of {interrupt} is not compliant \
                         with SBSA Level 3 PPI ID assignment: {PPI_ID_PMBIRQ}."
                    ))?;
                }
            }
            Self::CacheAssociativity => {
                if bytes.first() == Some(&0) {
                    s.error_inline(format_args!(
                        "Cache associativity must be greater than 0"
                    ))?;
                }
            }
            Self::CacheNumberOfSets => {
                let Some(sets) = read_u32(bytes) else {
                    return Ok(());
                };
                if sets == 0 {
                    s.error_inline(format_args!(
                        "Cache number of sets must be greater than 0"
                    ))?;
                } else if sets > CCIDX_CACHE_SETS_MAX {
                    s.error_inline(format_args!(
                        "When CCIDX is implemented the maximum cache number of \
                         sets must be less than or equal to {CCIDX_CACHE_SETS_MAX}"
                    ))?;
                } else if sets > CACHE_SETS_MAX {
                    s.warning_inline(format_args!(
                        "Without CCIDX, the maximum cache number of sets must be \
                         less than or equal to {CACHE_SETS_MAX}. Ignore this \
                         message if CCIDX is implemented"
                    ))?;
                }
            }
            Self::CacheLineSize => {
                let Some(line_size) = read_u16(bytes) else {
                    return Ok(());
                };
                if !(CACHE_LINE_SIZE_MIN..=CACHE_LINE_SIZE_MAX).contains(&line_size) {
                    s.error_inline(format_args!(
                        "The cache line size must be between {CACHE_LINE_SIZE_MIN} \
                         and {CACHE_LINE_SIZE_MAX} bytes."
                    ))?;
                } else if !line_size.is_power_of_two() {
                    s.error_inline(format_args!(
                        "The cache line size is not a power of 2."
                    ))?;
                }
            }
            Self::CacheAttributes => {
                let Some(&byte) = bytes.first() else {
                    return Ok(());
                };
                if CacheAttributes(byte).reserved() != 0 {
                    s.error_inline(format_args!(
                        "Attributes bits [7:5] are reserved and must be zero."
                    ))?;
                }
            }
        }

        Ok(())
    }
}

fn read_u16(bytes: &[u8]) -> Option<u16> {
    Some(U16::read_from_bytes(bytes).ok()?.get())
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    Some(U32::read_from_bytes(bytes).ok()?.get())
}
