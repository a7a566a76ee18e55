//! The structure-type registry and dispatcher.
//!
//! Each table kind owns a registry: a dense array of structure-type entries
//! indexed by type code, each carrying a decoding strategy, an architecture
//! compatibility mask, and a per-pass instance count.

use core::fmt::{self, Display, Write};

use thiserror::Error;

use crate::engine::descriptor::FieldDescriptor;
use crate::engine::{Session, decode};

/// An error constructing a [`Registry`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// An entry's type code does not equal its array index.
    #[error("Entry at index {index} has type code {type_code}.")]
    TypeMismatch { index: usize, type_code: u8 },
}

/// Optional arguments passed through dispatch to a custom handler.
#[derive(Clone, Copy, Default)]
pub struct HandlerArgs<'a> {
    pub arg0: Option<&'a [u8]>,
    pub arg1: Option<&'a [u8]>,
}

/// A custom structure handler. Owns its own tracing, including the
/// rendering of the structure label it is given.
pub type StructHandler =
    fn(&mut Session<'_>, StructLabel<'_>, &[u8], &HandlerArgs<'_>) -> fmt::Result;

/// How a structure type is decoded.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Run the field engine over this descriptor table.
    Fields(&'static [FieldDescriptor]),
    /// Hand the whole structure to a function.
    Custom(StructHandler),
    /// Known type with no decoder; instances are counted and flagged.
    Unimplemented,
}

/// One structure type a table can contain.
pub struct StructEntry {
    /// Type code; must equal the entry's index in the registry array.
    pub type_code: u8,
    pub name: &'static str,
    /// Union of [`arch`](crate::engine::arch) masks this type may appear on.
    pub compat: u8,
    pub handler: Handler,
}

impl StructEntry {
    pub const fn fields(
        name: &'static str,
        type_code: u8,
        compat: u8,
        fields: &'static [FieldDescriptor],
    ) -> Self {
        Self {
            type_code,
            name,
            compat,
            handler: Handler::Fields(fields),
        }
    }

    pub const fn custom(
        name: &'static str,
        type_code: u8,
        compat: u8,
        handler: StructHandler,
    ) -> Self {
        Self {
            type_code,
            name,
            compat,
            handler: Handler::Custom(handler),
        }
    }

    pub const fn unimplemented(name: &'static str, type_code: u8, compat: u8) -> Self {
        Self {
            type_code,
            name,
            compat,
            handler: Handler::Unimplemented,
        }
    }
}

/// A structure name with its instance index, displayed as `Name [index]`.
#[derive(Clone, Copy)]
pub struct StructLabel<'a> {
    pub name: &'a str,
    pub index: u32,
}

impl Display for StructLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.index)
    }
}

/// The set of structure types one table kind can contain, with per-type
/// instance counts for the current pass.
pub struct Registry<const N: usize> {
    name: &'static str,
    entries: &'static [StructEntry; N],
    counts: [u32; N],
}

impl<const N: usize> Registry<N> {
    /// Build a registry, checking the dense type-code invariant once.
    pub fn new(
        name: &'static str,
        entries: &'static [StructEntry; N],
    ) -> Result<Self, BuildError> {
        let mut index = 0;
        while index < N {
            if entries[index].type_code as usize != index {
                return Err(BuildError::TypeMismatch {
                    index,
                    type_code: entries[index].type_code,
                });
            }
            index += 1;
        }

        Ok(Self {
            name,
            entries,
            counts: [0; N],
        })
    }

    /// The name structures of this registry go by in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entry(&self, type_code: u8) -> Option<&'static StructEntry> {
        self.entries.get(type_code as usize)
    }

    /// Instances of `type_code` dispatched this pass.
    pub fn count(&self, type_code: u8) -> u32 {
        match self.counts.get(type_code as usize) {
            Some(count) => *count,
            None => 0,
        }
    }

    /// Zero every instance count.
    pub fn reset_counts(&mut self) {
        self.counts = [0; N];
    }

    /// Total instances dispatched this pass, across all types.
    pub fn sum_counts(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Whether `type_code` is known and allowed under `arch_mask`.
    pub fn is_type_valid(&self, type_code: u8, arch_mask: u8) -> bool {
        match self.entry(type_code) {
            Some(entry) => entry.compat & arch_mask != 0,
            None => false,
        }
    }

    /// Print the per-type instance breakdown, flagging any type that is not
    /// allowed on the session's architecture but was nonetheless counted.
    ///
    /// Returns whether every counted type was allowed.
    pub fn validate_counts(&self, s: &mut Session) -> Result<bool, fmt::Error> {
        let arch_mask = s.options().arch;
        let mut all_valid = true;

        writeln!(s, "\nTable Breakdown:")?;
        for (entry, count) in self.entries.iter().zip(self.counts) {
            if self.is_type_valid(entry.type_code, arch_mask) {
                s.field_name(2, &entry.name)?;
                writeln!(s, "{count}")?;
            } else if count > 0 {
                all_valid = false;
                s.error(format_args!(
                    "{} Structure is not valid for the target architecture \
                     (found {count})",
                    entry.name,
                ))?;
            }
        }

        Ok(all_valid)
    }

    /// Decode one structure according to its registry entry.
    ///
    /// Prints the record's offset line, then dispatches on the entry's
    /// handler, incrementing the type's instance count. Returns `false`
    /// for an unknown type code or an unimplemented handler; a dispatched
    /// decode succeeds even if validators raised errors along the way.
    pub fn dispatch_one(
        &mut self,
        s: &mut Session,
        indent: u32,
        offset: usize,
        type_code: u8,
        data: &[u8],
        args: &HandlerArgs,
    ) -> Result<bool, fmt::Error> {
        s.field_name(indent, &"* Offset *")?;
        writeln!(s, "{offset:#x}")?;

        let Some(entry) = self.entry(type_code) else {
            s.error(format_args!(
                "Unknown {}. Type = {type_code}.",
                self.name,
            ))?;
            return Ok(false);
        };

        let index = self.counts[type_code as usize];
        let label = StructLabel {
            name: entry.name,
            index,
        };

        match entry.handler {
            Handler::Custom(handler) => handler(s, label, data, args)?,
            Handler::Fields(fields) => {
                decode(s, true, indent, Some(&label), data, fields)?;
            }
            Handler::Unimplemented => {
                self.counts[type_code as usize] += 1;
                s.error(format_args!(
                    "Parsing of {} Structure is not implemented",
                    entry.name,
                ))?;
                return Ok(false);
            }
        }

        self.counts[type_code as usize] += 1;
        Ok(true)
    }
}
