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
use crate::constant_pool::{Expect, Relocator};
use crate::prelude::*;
use crate::{read_table, write_table};

/// A field of a class.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Field {
    pub access: AccessFlags,
    /// Index of the field name.
    pub name: u16,
    /// Index of the field descriptor.
    pub descriptor: u16,
    pub attributes: Vec<RawAttribute>,
}

impl ConstantPoolReadWrite for Field {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        Ok(Field {
            access: read_from!(reader)?,
            name: try_cp_read!(cp, reader, Expect::Utf8)?,
            descriptor: try_cp_read!(cp, reader, Expect::Utf8)?,
            attributes: read_table(cp, reader)?,
        })
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        self.access.write_to(writer)?;
        cp.relocate(Expect::Utf8, self.name)?.write_to(writer)?;
        cp.relocate(Expect::Utf8, self.descriptor)?.write_to(writer)?;
        write_table(&self.attributes, cp, writer)
    }
}

/// A method of a class.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Method {
    pub access: AccessFlags,
    /// Index of the method name.
    pub name: u16,
    /// Index of the method descriptor.
    pub descriptor: u16,
    pub attributes: Vec<MethodAttribute>,
}

impl Method {
    /// The body of this method. Abstract and native methods have none.
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|a| match a {
            MethodAttribute::Code(c) => Some(c),
            MethodAttribute::Raw(_) => None,
        })
    }

    pub fn code_mut(&mut self) -> Option<&mut CodeAttribute> {
        self.attributes.iter_mut().find_map(|a| match a {
            MethodAttribute::Code(c) => Some(c),
            MethodAttribute::Raw(_) => None,
        })
    }
}

impl ConstantPoolReadWrite for Method {
    fn read_from<C: ConstantPoolReader, R: Read>(cp: &C, reader: &mut R) -> Result<Self> {
        Ok(Method {
            access: read_from!(reader)?,
            name: try_cp_read!(cp, reader, Expect::Utf8)?,
            descriptor: try_cp_read!(cp, reader, Expect::Utf8)?,
            attributes: read_table(cp, reader)?,
        })
    }

    fn write_to<W: Write>(&self, cp: &mut Relocator<'_>, writer: &mut W) -> Result<()> {
        self.access.write_to(writer)?;
        cp.relocate(Expect::Utf8, self.name)?.write_to(writer)?;
        cp.relocate(Expect::Utf8, self.descriptor)?.write_to(writer)?;
        write_table(&self.attributes, cp, writer)
    }
}
