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
//! Constants that can be found in Java class files.

/// The magic header file that exists on top of every class file with java version > 1.0.2.
pub const JVM_MAGIC: u32 = 0xCAFEBABE;

/// Suffix of archive entries that hold a class file.
pub const CLASS_SUFFIX: &str = ".class";

pub mod attr;
pub mod insn;
