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
//! Walks the pool indices buried in attribute payloads and bytecode.
//!
//! The same walk validates a payload against the pool it was read with, and renumbers it
//! into a new pool when a class is written. Attributes whose layout is not listed here
//! hold no pool indices as far as this crate knows and are copied as they are.

use crate::constant_pool::Expect;
use crate::constants::insn::*;
use crate::{ConstantPoolReader, Error, Result};

pub(crate) type Remap<'m> = dyn FnMut(Expect, u16) -> Result<u16> + 'm;

struct Walker<'a, 'm> {
    pool: &'a dyn ConstantPoolReader,
    input: &'a [u8],
    pos: usize,
    out: Vec<u8>,
    map: &'m mut Remap<'m>,
    /// Source indices of single-byte `ldc` operands, in order.
    narrow: Vec<u16>,
}

impl<'a, 'm> Walker<'a, 'm> {
    fn new(pool: &'a dyn ConstantPoolReader, input: &'a [u8], map: &'m mut Remap<'m>) -> Self {
        Self {
            pool,
            input,
            pos: 0,
            out: Vec::with_capacity(input.len()),
            map,
            narrow: Vec::new(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let input = self.input;
        if n > input.len() - self.pos {
            return Err(Error::AttributeLength(
                input.len() as u32,
                self.pos.saturating_add(n).min(u32::MAX as usize) as u32,
            ));
        }
        let bytes = &input[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn copy(&mut self, n: usize) -> Result<()> {
        let bytes = self.take(n)?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        let b = self.take(1)?[0];
        self.out.push(b);
        Ok(b)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u16(&mut self) -> Result<u16> {
        let v = self.read_u16()?;
        self.out.extend_from_slice(&v.to_be_bytes());
        Ok(v)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32> {
        let v = self.read_u32()? as i32;
        self.out.extend_from_slice(&v.to_be_bytes());
        Ok(v)
    }

    fn index(&mut self, kind: Expect) -> Result<()> {
        let idx = self.read_u16()?;
        let idx = (self.map)(kind, idx)?;
        self.out.extend_from_slice(&idx.to_be_bytes());
        Ok(())
    }

    fn optional(&mut self, kind: Expect) -> Result<()> {
        let idx = self.read_u16()?;
        let idx = if idx == 0 { 0 } else { (self.map)(kind, idx)? };
        self.out.extend_from_slice(&idx.to_be_bytes());
        Ok(())
    }

    fn narrow_index(&mut self, kind: Expect) -> Result<()> {
        let idx = self.take(1)?[0] as u16;
        self.narrow.push(idx);
        let idx = (self.map)(kind, idx)?;
        let idx = u8::try_from(idx).map_err(|_| {
            Error::UnwritableConstantPool(
                format!("ldc operand #{} does not fit in one byte", idx).into(),
            )
        })?;
        self.out.push(idx);
        Ok(())
    }

    fn repeat(&mut self, count: usize, mut f: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
        for _ in 0..count {
            f(self)?;
        }
        Ok(())
    }

    fn table(&mut self, f: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
        let count = self.u16()?;
        self.repeat(count as usize, f)
    }

    fn finish(self) -> Result<Vec<u8>> {
        if self.pos != self.input.len() {
            return Err(Error::AttributeLength(self.input.len() as u32, self.pos as u32));
        }
        Ok(self.out)
    }

    fn attributes(&mut self) -> Result<()> {
        self.table(|w| {
            let pool = w.pool;
            let name = w.read_u16()?;
            let name_str = pool.check(Expect::Utf8, name).and_then(|i| {
                pool.read_utf8(i)
                    .ok_or(Error::Invalid("attribute name", i.to_string().into()))
            })?;
            let name = (w.map)(Expect::Utf8, name)?;
            w.out.extend_from_slice(&name.to_be_bytes());
            let len = w.read_u32()?;
            let payload = w.take(len as usize)?;
            let payload = map_attribute(pool, name_str, payload, &mut *w.map)?;
            w.out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            w.out.extend_from_slice(&payload);
            Ok(())
        })
    }

    fn verification_type(&mut self) -> Result<()> {
        match self.u8()? {
            0..=6 => Ok(()),
            7 => self.index(Expect::Class),
            8 => self.copy(2),
            tag => Err(Error::Invalid("verification type", tag.to_string().into())),
        }
    }

    fn stack_map_frame(&mut self) -> Result<()> {
        match self.u8()? {
            0..=63 => Ok(()),
            64..=127 => self.verification_type(),
            247 => {
                self.copy(2)?;
                self.verification_type()
            }
            248..=251 => self.copy(2),
            ty @ 252..=254 => {
                self.copy(2)?;
                self.repeat((ty - 251) as usize, Self::verification_type)
            }
            255 => {
                self.copy(2)?;
                self.table(Self::verification_type)?;
                self.table(Self::verification_type)
            }
            ty => Err(Error::Invalid("stack map frame type", ty.to_string().into())),
        }
    }

    fn annotation(&mut self) -> Result<()> {
        self.index(Expect::Utf8)?;
        self.table(|w| {
            w.index(Expect::Utf8)?;
            w.element_value()
        })
    }

    fn element_value(&mut self) -> Result<()> {
        match self.u8()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => self.index(Expect::Primitive),
            b's' | b'c' => self.index(Expect::Utf8),
            b'e' => {
                self.index(Expect::Utf8)?;
                self.index(Expect::Utf8)
            }
            b'@' => self.annotation(),
            b'[' => self.table(Self::element_value),
            tag => Err(Error::Invalid("element value tag", (tag as char).to_string().into())),
        }
    }

    fn type_annotation(&mut self) -> Result<()> {
        match self.u8()? {
            0x00 | 0x01 | 0x16 => self.copy(1)?,
            0x10 | 0x17 | 0x42..=0x46 => self.copy(2)?,
            0x11 | 0x12 => self.copy(2)?,
            0x13..=0x15 => {}
            0x40 | 0x41 => self.table(|w| w.copy(6))?,
            0x47..=0x4B => self.copy(3)?,
            ty => {
                return Err(Error::Invalid(
                    "type annotation target",
                    format!("{:#04x}", ty).into(),
                ))
            }
        }
        let path_length = self.u8()?;
        self.copy(path_length as usize * 2)?;
        self.annotation()
    }

    fn module(&mut self) -> Result<()> {
        self.index(Expect::Module)?;
        self.copy(2)?;
        self.optional(Expect::Utf8)?;
        self.table(|w| {
            w.index(Expect::Module)?;
            w.copy(2)?;
            w.optional(Expect::Utf8)
        })?;
        for _ in 0..2 {
            // exports, then opens
            self.table(|w| {
                w.index(Expect::Package)?;
                w.copy(2)?;
                w.table(|w| w.index(Expect::Module))
            })?;
        }
        self.table(|w| w.index(Expect::Class))?;
        self.table(|w| {
            w.index(Expect::Class)?;
            w.table(|w| w.index(Expect::Class))
        })
    }

    fn code(&mut self) -> Result<()> {
        self.copy(4)?;
        let len = self.read_u32()?;
        let code = self.take(len as usize)?;
        let code = map_code(code, &mut *self.map)?;
        self.out.extend_from_slice(&(code.len() as u32).to_be_bytes());
        self.out.extend_from_slice(&code);
        self.table(|w| {
            w.copy(6)?;
            w.optional(Expect::Class)
        })?;
        self.attributes()
    }

    fn instructions(&mut self) -> Result<()> {
        while self.pos < self.input.len() {
            let start = self.pos;
            let op = self.u8()?;
            match op {
                0x00..=0x0F | 0x1A..=0x35 | 0x3B..=0x83 | 0x85..=0x98 | 0xAC..=0xB1 => {}
                0xBE..=0xBF | 0xC2 | 0xC3 => {}
                BIPUSH | NEWARRAY | RET | 0x15..=0x19 | 0x36..=0x3A => self.copy(1)?,
                SIPUSH | IINC | 0x99..=0xA8 | 0xC6 | 0xC7 => self.copy(2)?,
                GOTO_W | JSR_W => self.copy(4)?,
                LDC => self.narrow_index(Expect::Loadable)?,
                LDC_W | LDC2_W => self.index(Expect::Loadable)?,
                GETSTATIC..=INVOKESTATIC => self.index(Expect::Member)?,
                INVOKEINTERFACE => {
                    self.index(Expect::Member)?;
                    self.copy(2)?;
                }
                INVOKEDYNAMIC => {
                    self.index(Expect::InvokeDynamic)?;
                    self.copy(2)?;
                }
                NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => self.index(Expect::Class)?,
                MULTIANEWARRAY => {
                    self.index(Expect::Class)?;
                    self.copy(1)?;
                }
                TABLESWITCH => {
                    self.copy((3 - start % 4) % 4)?;
                    self.copy(4)?;
                    let low = self.i32()? as i64;
                    let high = self.i32()? as i64;
                    if high < low {
                        return Err(Error::Invalid(
                            "tableswitch",
                            format!("bounds {}..{} at offset {}", low, high, start).into(),
                        ));
                    }
                    self.copy_jumps((high - low + 1) as u64 * 4)?;
                }
                LOOKUPSWITCH => {
                    self.copy((3 - start % 4) % 4)?;
                    self.copy(4)?;
                    let pairs = self.i32()?;
                    if pairs < 0 {
                        return Err(Error::Invalid(
                            "lookupswitch",
                            format!("{} pairs at offset {}", pairs, start).into(),
                        ));
                    }
                    self.copy_jumps(pairs as u64 * 8)?;
                }
                WIDE => match self.u8()? {
                    IINC => self.copy(4)?,
                    RET | 0x15..=0x19 | 0x36..=0x3A => self.copy(2)?,
                    op => {
                        return Err(Error::Invalid(
                            "wide opcode",
                            format!("{:#04x} at offset {}", op, start).into(),
                        ))
                    }
                },
                op => {
                    return Err(Error::Invalid(
                        "opcode",
                        format!("{:#04x} at offset {}", op, start).into(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn copy_jumps(&mut self, len: u64) -> Result<()> {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        self.copy(len)
    }
}

/// Validates or renumbers the payload of an attribute called `name`.
///
/// `pool` resolves the names of nested attributes. Every index in the payload is passed
/// through `map` along with the kind of entry it must point at.
pub(crate) fn map_attribute(
    pool: &dyn ConstantPoolReader,
    name: &str,
    payload: &[u8],
    map: &mut Remap<'_>,
) -> Result<Vec<u8>> {
    let mut w = Walker::new(pool, payload, map);
    match name {
        "ConstantValue" => w.index(Expect::Constant)?,
        "Code" => w.code()?,
        "StackMapTable" => w.table(Walker::stack_map_frame)?,
        "Exceptions" | "NestMembers" | "PermittedSubclasses" => {
            w.table(|w| w.index(Expect::Class))?
        }
        "InnerClasses" => w.table(|w| {
            w.index(Expect::Class)?;
            w.optional(Expect::Class)?;
            w.optional(Expect::Utf8)?;
            w.copy(2)
        })?,
        "EnclosingMethod" => {
            w.index(Expect::Class)?;
            w.optional(Expect::NameAndType)?;
        }
        "Signature" | "SourceFile" => w.index(Expect::Utf8)?,
        "LocalVariableTable" | "LocalVariableTypeTable" => w.table(|w| {
            w.copy(4)?;
            w.index(Expect::Utf8)?;
            w.index(Expect::Utf8)?;
            w.copy(2)
        })?,
        "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => w.table(Walker::annotation)?,
        "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
            let params = w.u8()?;
            w.repeat(params as usize, |w| w.table(Walker::annotation))?
        }
        "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
            w.table(Walker::type_annotation)?
        }
        "AnnotationDefault" => w.element_value()?,
        "BootstrapMethods" => w.table(|w| {
            w.index(Expect::MethodHandle)?;
            w.table(|w| w.index(Expect::Loadable))
        })?,
        "MethodParameters" => {
            let params = w.u8()?;
            w.repeat(params as usize, |w| {
                w.optional(Expect::Utf8)?;
                w.copy(2)
            })?
        }
        "Module" => w.module()?,
        "ModulePackages" => w.table(|w| w.index(Expect::Package))?,
        "ModuleMainClass" | "NestHost" => w.index(Expect::Class)?,
        "Record" => w.table(|w| {
            w.index(Expect::Utf8)?;
            w.index(Expect::Utf8)?;
            w.attributes()
        })?,
        _ => return Ok(payload.to_vec()),
    }
    w.finish()
}

/// Validates or renumbers the pool indices in a method's bytecode.
pub(crate) fn map_code(code: &[u8], map: &mut Remap<'_>) -> Result<Vec<u8>> {
    let mut w = Walker::new(&NoPool, code, map);
    w.instructions()?;
    w.finish()
}

/// The source pool indices loaded by single-byte `ldc` instructions in `code`.
pub(crate) fn narrow_operands(code: &[u8]) -> Result<Vec<u16>> {
    let mut identity = |_: Expect, idx: u16| -> Result<u16> { Ok(idx) };
    let mut w = Walker::new(&NoPool, code, &mut identity);
    w.instructions()?;
    Ok(w.narrow)
}

/// Bytecode has no nested attributes, so it never needs to look up a name.
struct NoPool;

impl ConstantPoolReader for NoPool {
    fn read_raw(&self, _idx: u16) -> Option<&crate::constant_pool::RawConstantEntry> {
        None
    }
}
