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
//! The class file as a whole.

use crate::constant_pool::{ConstantPool, Expect, Relocator};
use crate::constants::attr::BOOTSTRAP_METHODS;
use crate::constants::JVM_MAGIC;
use crate::prelude::*;
use crate::relocate::narrow_operands;
use crate::{read_table, write_len16, write_table};

/// A parsed class file.
///
/// Everything that refers to the constant pool does so by index into [`constant_pool`](ClassFile::constant_pool),
/// which holds the pool exactly as it was read. Writing builds a new pool holding only the entries
/// that are still referenced, numbered in the order the writer first meets them.
#[derive(Clone, Debug)]
pub struct ClassFile {
    pub version: JavaVersion,
    pub constant_pool: ConstantPool,
    pub access: AccessFlags,
    pub this_class: u16,
    /// `0` for `java/lang/Object` and `module-info`.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<RawAttribute>,
}

impl ClassFile {
    /// Creates a class with no members and no attributes.
    pub fn new(
        version: JavaVersion,
        access: AccessFlags,
        name: &str,
        super_name: Option<&str>,
    ) -> Result<Self> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.insert_class(name)?;
        let super_class = match super_name {
            Some(s) => constant_pool.insert_class(s)?,
            None => 0,
        };
        Ok(ClassFile {
            version,
            constant_pool,
            access,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        })
    }

    /// Parses a complete class file. Bytes after the last attribute are an error.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let class = Self::read_from(&mut reader).map_err(Error::truncation)?;
        if !reader.is_empty() {
            return Err(Error::ExtraBytes(reader.len()));
        }
        Ok(class)
    }

    /// Serializes this class with a freshly built constant pool.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![];
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// The internal name of this class, such as `java/lang/String`.
    pub fn name(&self) -> Option<&str> {
        self.constant_pool.read_class(self.this_class)
    }

    pub fn super_name(&self) -> Option<&str> {
        self.constant_pool.read_class(self.super_class)
    }
}

impl ReadWrite for ClassFile {
    fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let magic = u32::read_from(reader)?;
        if magic != JVM_MAGIC {
            return Err(Error::Invalid("magic", format!("{:#010X}", magic).into()));
        }
        let version = JavaVersion::read_from(reader)?;
        let constant_pool = ConstantPool::read_from(reader)?;
        constant_pool.validate()?;
        let cp = &constant_pool;
        let access = AccessFlags::read_from(reader)?;
        let this_class = try_cp_read!(cp, reader, Expect::Class)?;
        let super_class = try_cp_read!(cp, reader, optional Expect::Class)?;
        let interface_count = u16::read_from(reader)?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(try_cp_read!(cp, reader, Expect::Class)?);
        }
        let fields = read_table(cp, reader)?;
        let methods = read_table(cp, reader)?;
        let attributes = read_table(cp, reader)?;
        Ok(ClassFile {
            version,
            constant_pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        let mut cp = Relocator::new(&self.constant_pool);
        // `ldc` only has one byte for its operand
        let mut narrow = vec![];
        for code in self.methods.iter().filter_map(Method::code) {
            narrow.extend(narrow_operands(&code.code)?);
        }
        cp.reserve(Expect::Loadable, &narrow)?;

        let mut buf = vec![];
        self.access.write_to(&mut buf)?;
        cp.relocate(Expect::Class, self.this_class)?.write_to(&mut buf)?;
        cp.relocate_optional(Expect::Class, self.super_class)?.write_to(&mut buf)?;
        write_len16(self.interfaces.len(), &mut buf)?;
        for &itf in &self.interfaces {
            cp.relocate(Expect::Class, itf)?.write_to(&mut buf)?;
        }
        write_table(&self.fields, &mut cp, &mut buf)?;
        write_table(&self.methods, &mut cp, &mut buf)?;

        // BootstrapMethods goes last, and only if something still needs it.
        let (bootstrap, attributes): (Vec<_>, Vec<_>) = self
            .attributes
            .iter()
            .partition(|a| a.name == BOOTSTRAP_METHODS);
        let mut attrs = vec![];
        for attr in &attributes {
            attr.write_to(&mut cp, &mut attrs)?;
        }
        let mut count = attributes.len();
        if cp.has_dynamic() {
            for attr in &bootstrap {
                attr.write_to(&mut cp, &mut attrs)?;
            }
            count += bootstrap.len();
        }
        write_len16(count, &mut buf)?;
        buf.extend_from_slice(&attrs);

        JVM_MAGIC.write_to(writer)?;
        self.version.write_to(writer)?;
        cp.into_pool().write_to(writer)?;
        writer.write_all(&buf)?;
        Ok(())
    }
}
