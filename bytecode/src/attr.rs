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
//! Attributes of classes, fields and methods.
//!
//! Only `Code` is modelled, since it is the only attribute the stubber rewrites.
//! Every other attribute keeps its payload as read, with indices into the pool the class was read with.

use crate::constant_pool::{Expect, Relocator};
use crate::constants::attr::CODE;
use crate::prelude::*;
use crate::relocate::{map_attribute, map_code};
use crate::{read_payload, read_table, write_table};

/// An attribute kept as its name and undecoded payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawAttribute {
    /// The name of this attribute.
    pub name: Cow<'static, str>,
    /// The inner data of this attribute.
    pub inner: Cow<'static, [u8]>,
}

impl RawAttribute {
    /// Creates a new raw attribute with name and inner data.
    ///
    /// `String` and `Vec<u8>`, string literal and array literal are all accepted because this uses a Cow.
    pub fn new<S: Into<Cow<'static, str>>, B: Into<Cow<'static, [u8]>>>(name: S, inner: B) -> Self {
        Self {
            name: name.into(),
            inner: inner.into(),
        }
    }

    fn from_payload<C: ConstantPoolReader>(
        cp: &C,
        name: Cow<'static, str>,
        inner: Vec<u8>,
    ) -> Result<Self> {
        map_attribute(cp, &name, &inner, &mut |kind, idx| cp.check(kind, idx))?;
        Ok(Self {
            name,
            inner: Cow::Owned(inner),
        })
    }
}

/// Reads `attribute_name_index` and `attribute_length` followed by the payload.
fn read_header<C: ConstantPoolReader, R: Read>(
    cp: &C,
    reader: &mut R,
) -> Result<(Cow<'static, str>, Vec<u8>)> {
    let idx = try_cp_read!(cp, reader, Expect::Utf8)?;
    let name = cp
        .read_utf8(idx)
        .ok_or(Error::Invalid("attribute name", idx.to_string().into()))?;
    let len = u32::read_from(reader)?;
    let payload = read_payload(reader, len)?;
    Ok((Cow::Owned(name.to_owned()), payload))
}

fn write_payload<W: Write>(name: u16, payload: &[u8], writer: &mut W) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::UnwritableConstantPool("attribute longer than 4 GiB".into()))?;
    name.write_to(writer)?;
    len.write_to(writer)?;
    writer.write_all(payload)?;
    Ok(())
}

impl ConstantPoolReadWrite for RawAttribute {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        let (name, payload) = read_header(cp, reader)?;
        Self::from_payload(cp, name, payload)
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        let name = cp.insert_utf8(&self.name)?;
        let payload = map_attribute(cp.source(), &self.name, &self.inner, &mut |kind, idx| {
            cp.relocate(kind, idx)
        })?;
        write_payload(name, &payload, writer)
    }
}

/// An entry of the exception table of a `Code` attribute.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// The caught class, or `0` for a handler that catches everything.
    pub catch_type: u16,
}

impl ConstantPoolReadWrite for ExceptionHandler {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        Ok(ExceptionHandler {
            start_pc: read_from!(reader)?,
            end_pc: read_from!(reader)?,
            handler_pc: read_from!(reader)?,
            catch_type: try_cp_read!(cp, reader, optional Expect::Class)?,
        })
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        self.start_pc.write_to(writer)?;
        self.end_pc.write_to(writer)?;
        self.handler_pc.write_to(writer)?;
        cp.relocate_optional(Expect::Class, self.catch_type)?.write_to(writer)
    }
}

/// The body of a method.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    /// The bytecode, with indices into the pool the class was read with.
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<RawAttribute>,
}

impl ConstantPoolReadWrite for CodeAttribute {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        let max_stack = u16::read_from(reader)?;
        let max_locals = u16::read_from(reader)?;
        let code_length = u32::read_from(reader)?;
        if code_length == 0 || code_length > u16::MAX as u32 {
            return Err(Error::Invalid("code length", code_length.to_string().into()));
        }
        let code = read_payload(reader, code_length)?;
        map_code(&code, &mut |kind, idx| cp.check(kind, idx))?;
        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table: read_table(cp, reader)?,
            attributes: read_table(cp, reader)?,
        })
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        self.max_stack.write_to(writer)?;
        self.max_locals.write_to(writer)?;
        let code = map_code(&self.code, &mut |kind, idx| cp.relocate(kind, idx))?;
        (code.len() as u32).write_to(writer)?;
        writer.write_all(&code)?;
        write_table(&self.exception_table, cp, writer)?;
        write_table(&self.attributes, cp, writer)
    }
}

/// An attribute of a method.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MethodAttribute {
    Code(CodeAttribute),
    Raw(RawAttribute),
}

impl ConstantPoolReadWrite for MethodAttribute {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        let (name, payload) = read_header(cp, reader)?;
        if name != CODE {
            return RawAttribute::from_payload(cp, name, payload).map(MethodAttribute::Raw);
        }
        let declared = payload.len() as u32;
        let mut rest = &payload[..];
        let code = CodeAttribute::read_from(cp, &mut rest).map_err(|e| match e.truncation() {
            Error::Truncated => Error::Invalid(
                "Code attribute",
                format!("contents run past its length of {} bytes", declared).into(),
            ),
            e => e,
        })?;
        if !rest.is_empty() {
            return Err(Error::AttributeLength(declared, declared - rest.len() as u32));
        }
        Ok(MethodAttribute::Code(code))
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        match self {
            MethodAttribute::Code(code) => {
                let name = cp.insert_utf8(CODE)?;
                let mut buf = vec![];
                code.write_to(cp, &mut buf)?;
                write_payload(name, &buf, writer)
            }
            MethodAttribute::Raw(raw) => raw.write_to(cp, writer),
        }
    }
}
