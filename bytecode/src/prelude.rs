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
//! Useful re-exports that can be reused.

pub use std::borrow::Cow;
pub use std::io::{Read, Write};
pub use crate::{
    read_from, try_cp_read, ConstantPoolReadWrite, ConstantPoolReader, ConstantPoolWriter, Error,
    ReadWrite, Result,
};
pub use crate::access::AccessFlags;
pub use crate::attr::*;
pub use crate::class::ClassFile;
pub use crate::constant_pool::{ConstantPool, Expect, RawConstantEntry};
pub use crate::member::*;
pub use crate::stub::Stubber;
pub use crate::version::*;
