/*
    This file is part of Stubify.

    Stubify is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    Stubify is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with Stubify. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
*/
//! The constant pool as read from a class file, and the pool that replaces it on write.
//!
//! A [`ConstantPool`] keeps every entry at its original index so that the rest of the model
//! can keep referring to entries by number. Writing never emits it again: a [`Relocator`]
//! pulls in only what the written class still references, in the order it is first referenced.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use indexmap::IndexMap;

use crate::{ConstantPoolReader, ConstantPoolWriter, Error, ReadWrite, Result};

/// The most slots a pool can have, including the unusable slot 0.
const MAX_SLOTS: u32 = u16::MAX as u32;

/// A raw constant entry that has unresolved indices to other entries.
#[derive(ReadWrite, Debug, Clone)]
#[tag_type(u8)]
pub enum RawConstantEntry {
    #[tag(1)]
    UTF8(Cow<'static, str>),
    #[tag(3)]
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Field(u16, u16),
    Method(u16, u16),
    InterfaceMethod(u16, u16),
    NameAndType(u16, u16),
    #[tag(15)]
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl Hash for RawConstantEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RawConstantEntry::UTF8(ref s) => s.hash(state),
            RawConstantEntry::Int(ref i) => i.hash(state),
            RawConstantEntry::Float(ref f) => f.to_bits().hash(state),
            RawConstantEntry::Long(ref l) => l.hash(state),
            RawConstantEntry::Double(ref d) => d.to_bits().hash(state),
            RawConstantEntry::Class(ref u)
            | RawConstantEntry::String(ref u)
            | RawConstantEntry::MethodType(ref u)
            | RawConstantEntry::Module(ref u)
            | RawConstantEntry::Package(ref u) => u.hash(state),
            RawConstantEntry::Field(ref u1, ref u2)
            | RawConstantEntry::Method(ref u1, ref u2)
            | RawConstantEntry::InterfaceMethod(ref u1, ref u2)
            | RawConstantEntry::NameAndType(ref u1, ref u2)
            | RawConstantEntry::Dynamic(ref u1, ref u2)
            | RawConstantEntry::InvokeDynamic(ref u1, ref u2) => {
                u1.hash(state);
                u2.hash(state);
            }
            RawConstantEntry::MethodHandle(b, u) => {
                b.hash(state);
                u.hash(state);
            }
        }
    }
}

// Floats compare by bit pattern so that NaN constants de-duplicate and `0.0` stays apart from `-0.0`.
impl PartialEq for RawConstantEntry {
    fn eq(&self, other: &Self) -> bool {
        use crate::constant_pool::RawConstantEntry as E;
        match (self, other) {
            (E::UTF8(a), E::UTF8(b)) => a == b,
            (E::Int(a), E::Int(b)) => a == b,
            (E::Float(a), E::Float(b)) => a.to_bits() == b.to_bits(),
            (E::Long(a), E::Long(b)) => a == b,
            (E::Double(a), E::Double(b)) => a.to_bits() == b.to_bits(),
            (E::Class(a), E::Class(b))
            | (E::String(a), E::String(b))
            | (E::MethodType(a), E::MethodType(b))
            | (E::Module(a), E::Module(b))
            | (E::Package(a), E::Package(b)) => a == b,
            (E::Field(a1, a2), E::Field(b1, b2))
            | (E::Method(a1, a2), E::Method(b1, b2))
            | (E::InterfaceMethod(a1, a2), E::InterfaceMethod(b1, b2))
            | (E::NameAndType(a1, a2), E::NameAndType(b1, b2))
            | (E::Dynamic(a1, a2), E::Dynamic(b1, b2))
            | (E::InvokeDynamic(a1, a2), E::InvokeDynamic(b1, b2)) => a1 == b1 && a2 == b2,
            (E::MethodHandle(a1, a2), E::MethodHandle(b1, b2)) => a1 == b1 && a2 == b2,
            _ => false,
        }
    }
}

impl Eq for RawConstantEntry {}

impl RawConstantEntry {
    /// returns the size that this entry takes.
    #[inline]
    pub const fn size(&self) -> u16 {
        match self {
            RawConstantEntry::Long(_) | RawConstantEntry::Double(_) => 2,
            _ => 1,
        }
    }
    /// Returns `true` if this entry is a Long/Double constant, which takes 2 indices.
    #[inline]
    pub const fn is_wide(&self) -> bool {
        matches!(
            self,
            RawConstantEntry::Long(_) | RawConstantEntry::Double(_)
        )
    }

    /// Rebuilds this entry with every pool index passed through `f`.
    ///
    /// Indices are visited in the order they appear in the class file. The bootstrap method
    /// index of `Dynamic` and `InvokeDynamic` points into the `BootstrapMethods` attribute
    /// rather than the pool and is left alone.
    pub fn map_references(&self, f: &mut dyn FnMut(Expect, u16) -> Result<u16>) -> Result<Self> {
        Ok(match *self {
            Self::UTF8(_) | Self::Int(_) | Self::Float(_) | Self::Long(_) | Self::Double(_) => {
                self.clone()
            }
            Self::Class(n) => Self::Class(f(Expect::Utf8, n)?),
            Self::String(n) => Self::String(f(Expect::Utf8, n)?),
            Self::Field(c, nt) => Self::Field(f(Expect::Class, c)?, f(Expect::NameAndType, nt)?),
            Self::Method(c, nt) => Self::Method(f(Expect::Class, c)?, f(Expect::NameAndType, nt)?),
            Self::InterfaceMethod(c, nt) => {
                Self::InterfaceMethod(f(Expect::Class, c)?, f(Expect::NameAndType, nt)?)
            }
            Self::NameAndType(n, t) => Self::NameAndType(f(Expect::Utf8, n)?, f(Expect::Utf8, t)?),
            Self::MethodHandle(kind, r) => Self::MethodHandle(kind, f(Expect::Member, r)?),
            Self::MethodType(d) => Self::MethodType(f(Expect::Utf8, d)?),
            Self::Dynamic(bsm, nt) => Self::Dynamic(bsm, f(Expect::NameAndType, nt)?),
            Self::InvokeDynamic(bsm, nt) => Self::InvokeDynamic(bsm, f(Expect::NameAndType, nt)?),
            Self::Module(n) => Self::Module(f(Expect::Utf8, n)?),
            Self::Package(n) => Self::Package(f(Expect::Utf8, n)?),
        })
    }
}

/// The kind of entry a pool index is required to point at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Expect {
    Utf8,
    Class,
    NameAndType,
    /// A field, method or interface method reference.
    Member,
    MethodHandle,
    InvokeDynamic,
    Module,
    Package,
    /// Anything `ldc` and friends can push, which is also what bootstrap arguments may be.
    Loadable,
    /// The value of a `ConstantValue` attribute.
    Constant,
    /// A numeric constant, as used by annotation element values.
    Primitive,
}

impl Expect {
    pub fn accepts(self, entry: &RawConstantEntry) -> bool {
        use crate::constant_pool::RawConstantEntry as E;
        match self {
            Expect::Utf8 => matches!(entry, E::UTF8(_)),
            Expect::Class => matches!(entry, E::Class(_)),
            Expect::NameAndType => matches!(entry, E::NameAndType(..)),
            Expect::Member => {
                matches!(entry, E::Field(..) | E::Method(..) | E::InterfaceMethod(..))
            }
            Expect::MethodHandle => matches!(entry, E::MethodHandle(..)),
            Expect::InvokeDynamic => matches!(entry, E::InvokeDynamic(..)),
            Expect::Module => matches!(entry, E::Module(_)),
            Expect::Package => matches!(entry, E::Package(_)),
            Expect::Loadable => matches!(
                entry,
                E::Int(_)
                    | E::Float(_)
                    | E::Long(_)
                    | E::Double(_)
                    | E::Class(_)
                    | E::String(_)
                    | E::MethodHandle(..)
                    | E::MethodType(_)
                    | E::Dynamic(..)
            ),
            Expect::Constant => matches!(
                entry,
                E::Int(_) | E::Float(_) | E::Long(_) | E::Double(_) | E::String(_)
            ),
            Expect::Primitive => {
                matches!(entry, E::Int(_) | E::Float(_) | E::Long(_) | E::Double(_))
            }
        }
    }
}

impl Display for Expect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expect::Utf8 => "Utf8",
            Expect::Class => "Class",
            Expect::NameAndType => "NameAndType",
            Expect::Member => "member reference",
            Expect::MethodHandle => "MethodHandle",
            Expect::InvokeDynamic => "InvokeDynamic",
            Expect::Module => "Module",
            Expect::Package => "Package",
            Expect::Loadable => "loadable",
            Expect::Constant => "constant value",
            Expect::Primitive => "primitive constant",
        };
        f.write_str(s)
    }
}

/// The constant pool of a class file, indexed the way the class file indexes it.
///
/// Slot 0 and the slot after every `Long` or `Double` hold nothing.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Option<RawConstantEntry>>,
    lookup: HashMap<RawConstantEntry, u16>,
}

impl ConstantPool {
    /// Creates a new constant pool with no entries.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: vec![None],
            lookup: HashMap::new(),
        }
    }

    /// The `constant_pool_count` of this pool: one more than the highest usable index.
    #[inline]
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Iterates over the usable entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &RawConstantEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as u16, e)))
    }

    /// Checks that every entry refers to entries of the right kind.
    pub fn validate(&self) -> Result<()> {
        for (idx, entry) in self.iter() {
            if let RawConstantEntry::MethodHandle(kind, _) = entry {
                if !(1..=9).contains(kind) {
                    return Err(Error::Invalid(
                        "method handle kind",
                        format!("{} at #{}", kind, idx).into(),
                    ));
                }
            }
            entry.map_references(&mut |kind, i| self.check(kind, i))?;
        }
        Ok(())
    }
}

impl Default for ConstantPool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Reads `constant_pool_count` and the entries it announces.
    pub fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let count = u16::read_from(reader)?;
        if count == 0 {
            return Err(Error::Invalid("constant pool count", "0".into()));
        }
        let mut cp = ConstantPool::new();
        cp.entries.reserve(count as usize);
        while cp.entries.len() < count as usize {
            let entry = RawConstantEntry::read_from(reader)?;
            let idx = cp.entries.len() as u16;
            let wide = entry.is_wide();
            cp.lookup.entry(entry.clone()).or_insert(idx);
            cp.entries.push(Some(entry));
            if wide {
                if cp.entries.len() >= count as usize {
                    return Err(Error::Invalid(
                        "constant pool",
                        format!("8-byte constant at #{} overruns the count of {}", idx, count)
                            .into(),
                    ));
                }
                cp.entries.push(None);
            }
        }
        Ok(cp)
    }
}

impl ConstantPoolReader for ConstantPool {
    #[inline]
    fn read_raw(&self, idx: u16) -> Option<&RawConstantEntry> {
        self.entries.get(idx as usize).and_then(Option::as_ref)
    }
}

impl ConstantPoolWriter for ConstantPool {
    fn insert_raw(&mut self, value: RawConstantEntry) -> Result<u16> {
        if let Some(&idx) = self.lookup.get(&value) {
            return Ok(idx);
        }
        let idx = self.entries.len() as u32;
        if idx + value.size() as u32 > MAX_SLOTS {
            return Err(Error::UnwritableConstantPool("more than 65535 slots".into()));
        }
        let idx = idx as u16;
        let wide = value.is_wide();
        self.lookup.insert(value.clone(), idx);
        self.entries.push(Some(value));
        if wide {
            self.entries.push(None);
        }
        Ok(idx)
    }
}

/// A constant pool writer that numbers entries in insertion order, apart from reserved
/// slots, and never stores one twice.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    entries: IndexMap<RawConstantEntry, u16>,
    /// Not actual len. (if e.wide 2 else 1 for e in entries) + 1 in pseudocode
    len: u16,
    /// Slots handed out by `reserve` that have not been filled yet.
    reserved: usize,
}

impl PoolBuilder {
    /// Creates an empty constant pool.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            len: 1,
            reserved: 0,
        }
    }

    /// Whether any entry needs the `BootstrapMethods` attribute.
    pub fn has_dynamic(&self) -> bool {
        self.entries.keys().any(|e| {
            matches!(
                e,
                RawConstantEntry::Dynamic(..) | RawConstantEntry::InvokeDynamic(..)
            )
        })
    }

    /// Hands out the next index for an entry of `size` slots that is filled in later.
    fn reserve(&mut self, size: u16) -> Result<u16> {
        let idx = self.len;
        let next = idx as u32 + size as u32;
        if next > MAX_SLOTS {
            return Err(Error::UnwritableConstantPool("more than 65535 slots".into()));
        }
        self.len = next as u16;
        self.reserved += 1;
        Ok(idx)
    }

    /// Puts `value` at an index handed out by [`reserve`](PoolBuilder::reserve).
    fn fill(&mut self, idx: u16, value: RawConstantEntry) -> Result<()> {
        if let Some(&old) = self.entries.get(&value) {
            return Err(Error::UnwritableConstantPool(
                format!("#{} duplicates #{}", idx, old).into(),
            ));
        }
        self.entries.insert(value, idx);
        self.reserved -= 1;
        Ok(())
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPoolWriter for PoolBuilder {
    fn insert_raw(&mut self, value: RawConstantEntry) -> Result<u16> {
        if let Some(&idx) = self.entries.get(&value) {
            return Ok(idx);
        }
        let idx = self.len;
        let next = idx as u32 + value.size() as u32;
        if next > MAX_SLOTS {
            return Err(Error::UnwritableConstantPool("more than 65535 slots".into()));
        }
        self.len = next as u16;
        self.entries.insert(value, idx);
        Ok(idx)
    }
}

impl PoolBuilder {
    /// Writes `constant_pool_count` followed by the entries.
    pub fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        if self.reserved != 0 {
            return Err(Error::UnwritableConstantPool(
                format!("{} reserved slots were never filled", self.reserved).into(),
            ));
        }
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|&(_, &idx)| idx);
        self.len.write_to(writer)?;
        for (e, _) in entries {
            e.write_to(writer)?;
        }
        Ok(())
    }
}

/// Moves entries of a class's pool into a fresh [`PoolBuilder`] as they are referenced.
///
/// An entry's children are moved before the entry itself, so an entry only points at
/// lower indices unless it was [reserved](Relocator::reserve). Moving the same source
/// index twice returns the same target index.
pub struct Relocator<'a> {
    source: &'a ConstantPool,
    target: PoolBuilder,
    memo: HashMap<u16, u16>,
}

impl<'a> Relocator<'a> {
    pub fn new(source: &'a ConstantPool) -> Self {
        Self {
            source,
            target: PoolBuilder::new(),
            memo: HashMap::new(),
        }
    }

    /// The pool indices are relocated from.
    #[inline]
    pub fn source(&self) -> &'a ConstantPool {
        self.source
    }

    /// Returns the index in the new pool of the entry at `idx` in the source pool.
    pub fn relocate(&mut self, kind: Expect, idx: u16) -> Result<u16> {
        let source = self.source;
        let entry = source.read_raw(idx).ok_or_else(|| {
            Error::UnwritableConstantPool(format!("#{} is not in the constant pool", idx).into())
        })?;
        if !kind.accepts(entry) {
            return Err(Error::UnwritableConstantPool(
                format!("#{} is not a {} entry", idx, kind).into(),
            ));
        }
        if let Some(&new) = self.memo.get(&idx) {
            return Ok(new);
        }
        let mapped = entry.map_references(&mut |kind, i| self.relocate(kind, i))?;
        let new = self.target.insert_raw(mapped)?;
        self.memo.insert(idx, new);
        Ok(new)
    }

    /// Gives every entry in `operands` an index ahead of anything relocated later.
    ///
    /// Operands that are equal once relocated share one index. Their children are moved
    /// after all of them, so each reserved entry costs a single slot at the front.
    pub fn reserve(&mut self, kind: Expect, operands: &[u16]) -> Result<()> {
        let source = self.source;
        // relocating into a scratch pool groups operands that end up structurally equal
        let mut scratch = Relocator::new(source);
        let mut groups: IndexMap<u16, (u16, &RawConstantEntry)> = IndexMap::new();
        for &idx in operands {
            let key = scratch.relocate(kind, idx)?;
            let slot = match groups.get(&key) {
                Some(&(slot, _)) => slot,
                None => {
                    let entry = source.read_raw(idx).ok_or_else(|| {
                        Error::UnwritableConstantPool(
                            format!("#{} is not in the constant pool", idx).into(),
                        )
                    })?;
                    let slot = self.target.reserve(entry.size())?;
                    groups.insert(key, (slot, entry));
                    slot
                }
            };
            self.memo.insert(idx, slot);
        }
        for &(slot, entry) in groups.values() {
            let mapped = entry.map_references(&mut |kind, i| self.relocate(kind, i))?;
            self.target.fill(slot, mapped)?;
        }
        Ok(())
    }

    /// Like [`relocate`](Relocator::relocate), but `0` means absent and stays `0`.
    pub fn relocate_optional(&mut self, kind: Expect, idx: u16) -> Result<u16> {
        if idx == 0 {
            Ok(0)
        } else {
            self.relocate(kind, idx)
        }
    }

    #[inline]
    pub fn has_dynamic(&self) -> bool {
        self.target.has_dynamic()
    }

    pub fn into_pool(self) -> PoolBuilder {
        self.target
    }
}

impl ConstantPoolWriter for Relocator<'_> {
    #[inline]
    fn insert_raw(&mut self, value: RawConstantEntry) -> Result<u16> {
        self.target.insert_raw(value)
    }
}
