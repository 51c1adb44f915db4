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
//! Turns the classes of a jar into link-only stubs.
//!
//! Every method body is replaced by `throw new RuntimeException()`, the constant
//! pool is rebuilt from what is still referenced and everything else is carried
//! through untouched. See [`ClassFile`], [`Stubber`] and [`archive`].

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate stubify_macros;

pub mod access;
pub mod archive;
pub mod attr;
pub mod class;
pub mod constant_pool;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod member;
pub mod mod_utf8;
pub mod prelude;
pub mod stub;
pub mod version;
pub(crate) mod relocate;

#[cfg(test)]
mod tests;

use std::borrow::Cow;
use std::io::{Read, Write};

pub use crate::class::ClassFile;
use crate::constant_pool::{Expect, RawConstantEntry, Relocator};
pub use crate::error::{Error, Result};
pub use crate::stub::Stubber;

/// The generic read and write trait. This indicates a structure can be read without additional contextual information.
///
/// This trait can be derived with #[derive(ReadWrite)] if all the types it can hold are also `ReadWrite`.
/// Furthermore, all integer types implement `ReadWrite`.
pub trait ReadWrite
where
    Self: Sized,
{
    fn read_from<T: Read>(reader: &mut T) -> Result<Self>;
    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()>;
}

/// A trait for inserting constant pool entries.
///
/// Every insertion is de-duplicated: inserting an entry that is structurally
/// equal to an existing one returns the existing index.
pub trait ConstantPoolWriter {
    /// Inserts a raw constant pool entry, returning the index that points to it.
    fn insert_raw(&mut self, value: RawConstantEntry) -> Result<u16>;

    fn insert_utf8(&mut self, st: &str) -> Result<u16> {
        self.insert_raw(RawConstantEntry::UTF8(Cow::Owned(st.to_owned())))
    }
    fn insert_class(&mut self, name: &str) -> Result<u16> {
        let name = self.insert_utf8(name)?;
        self.insert_raw(RawConstantEntry::Class(name))
    }
    fn insert_nameandtype(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let a = self.insert_utf8(name)?;
        let b = self.insert_utf8(descriptor)?;
        self.insert_raw(RawConstantEntry::NameAndType(a, b))
    }
    /// Inserts a `Methodref` to a method of a class (not an interface).
    fn insert_method(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let owner = self.insert_class(owner)?;
        let nat = self.insert_nameandtype(name, descriptor)?;
        self.insert_raw(RawConstantEntry::Method(owner, nat))
    }
}

/// A trait for looking up constant pool entries by index.
pub trait ConstantPoolReader {
    fn read_raw(&self, idx: u16) -> Option<&RawConstantEntry>;

    fn read_utf8(&self, idx: u16) -> Option<&str> {
        match self.read_raw(idx) {
            Some(RawConstantEntry::UTF8(s)) => Some(&**s),
            _ => None,
        }
    }
    fn read_class(&self, idx: u16) -> Option<&str> {
        match self.read_raw(idx) {
            Some(RawConstantEntry::Class(n)) => self.read_utf8(*n),
            _ => None,
        }
    }
    fn read_nameandtype(&self, idx: u16) -> Option<(&str, &str)> {
        match self.read_raw(idx) {
            Some(RawConstantEntry::NameAndType(n, t)) => self.read_utf8(*n).zip(self.read_utf8(*t)),
            _ => None,
        }
    }
    /// Reads a field or method reference as `(owner, name, descriptor)`.
    fn read_member(&self, idx: u16) -> Option<(&str, &str, &str)> {
        match self.read_raw(idx) {
            Some(RawConstantEntry::Field(c, nt))
            | Some(RawConstantEntry::Method(c, nt))
            | Some(RawConstantEntry::InterfaceMethod(c, nt)) => {
                let owner = self.read_class(*c)?;
                let (name, descriptor) = self.read_nameandtype(*nt)?;
                Some((owner, name, descriptor))
            }
            _ => None,
        }
    }

    /// Returns `idx` if it points at an entry of the expected kind.
    fn check(&self, kind: Expect, idx: u16) -> Result<u16> {
        match self.read_raw(idx) {
            Some(e) if kind.accepts(e) => Ok(idx),
            Some(_) => Err(Error::Invalid(
                "constant pool index",
                format!("#{} is not a {} entry", idx, kind).into(),
            )),
            None => Err(Error::Invalid(
                "constant pool index",
                format!("#{} is out of range or unusable", idx).into(),
            )),
        }
    }
    /// Like [`check`](ConstantPoolReader::check), but `0` means absent and is accepted.
    fn check_optional(&self, kind: Expect, idx: u16) -> Result<u16> {
        if idx == 0 {
            Ok(0)
        } else {
            self.check(kind, idx)
        }
    }
}

/// The read and write trait where the structure holds constant pool indices.
///
/// Reading validates every index against the pool the structure came from.
/// Writing renumbers every index into the pool that is being rebuilt by the [`Relocator`].
pub trait ConstantPoolReadWrite
where
    Self: Sized,
{
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self>;
    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()>;
}

/// helpful macro to read an index and return an error if it does not point at the expected kind of entry.
#[macro_export]
macro_rules! try_cp_read {
    ($cp: expr, $reader: expr, optional $kind: expr) => {{
        let idx = <u16 as $crate::ReadWrite>::read_from($reader)?;
        $crate::ConstantPoolReader::check_optional($cp, $kind, idx)
    }};
    ($cp: expr, $reader: expr, $kind: expr) => {{
        let idx = <u16 as $crate::ReadWrite>::read_from($reader)?;
        $crate::ConstantPoolReader::check($cp, $kind, idx)
    }};
}

/// Helper macro to disambigurate if a type implements both [`ConstantPoolReadWrite`] and [`ReadWrite`].
#[macro_export]
macro_rules! read_from {
    ($reader: expr) => {
        $crate::ReadWrite::read_from($reader)
    };
    ($cp: expr, $reader: expr) => {
        $crate::ConstantPoolReadWrite::read_from($cp, $reader)
    };
}

macro_rules! impl_readwrite_nums {
    ($($i:ty, $s:literal)*) => {
        $(
            impl ReadWrite for $i {
                fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
                    let mut bytes = [0u8; $s];
                    reader.read_exact(&mut bytes)?;
                    Ok(<$i>::from_be_bytes(bytes))
                }
                fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
                    writer.write_all(&self.to_be_bytes())?;
                    Ok(())
                }
            }
        )*
    };
}
impl_readwrite_nums! { u8, 1  i8, 1  u16, 2  i16, 2  u32, 4  i32, 4  f32, 4  u64, 8  i64, 8  f64, 8 }

impl ReadWrite for Cow<'static, str> {
    fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let length = u16::read_from(reader)?;
        let mut buf = vec![0; length as usize];
        reader.read_exact(&mut buf)?;
        Ok(Cow::Owned(crate::mod_utf8::modified_utf8_to_string(&buf)?))
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        let string = crate::mod_utf8::string_to_modified_utf8(self);
        write_len16(string.len(), writer)?;
        writer.write_all(&string)?;
        Ok(())
    }
}

/// Writes a `u16` length prefix, failing if `len` does not fit.
pub(crate) fn write_len16<W: Write>(len: usize, writer: &mut W) -> Result<()> {
    let len = u16::try_from(len)
        .map_err(|_| Error::Invalid("length", format!("{} does not fit in a `u16`", len).into()))?;
    len.write_to(writer)
}

/// Reads `len` bytes of an attribute body without trusting `len` for the allocation.
pub(crate) fn read_payload<R: Read>(reader: &mut R, len: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(Error::Truncated);
    }
    Ok(buf)
}

/// Reads a `u16` count followed by that many items.
pub(crate) fn read_table<T, C, R>(cp: &C, reader: &mut R) -> Result<Vec<T>>
where
    T: ConstantPoolReadWrite,
    C: ConstantPoolReader,
    R: Read,
{
    let count = u16::read_from(reader)?;
    (0..count).map(|_| T::read_from(cp, reader)).collect()
}

/// Writes a `u16` count followed by every item.
pub(crate) fn write_table<T, W>(items: &[T], cp: &mut Relocator<'_>, writer: &mut W) -> Result<()>
where
    T: ConstantPoolReadWrite,
    W: Write,
{
    write_len16(items.len(), writer)?;
    for item in items {
        item.write_to(cp, writer)?;
    }
    Ok(())
}
