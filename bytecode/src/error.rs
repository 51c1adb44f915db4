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
use std::borrow::Cow;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Unexpected end of class file")]
    Truncated,
    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, Cow<'static, str>),
    #[error(transparent)]
    MUTF(#[from] crate::mod_utf8::MUTFError),
    #[error("Attribute length mismatch: declared length ({0} bytes) differs from length consumed ({1} bytes)")]
    AttributeLength(u32, u32),
    #[error("Extra bytes ({0}) remaining in class file")]
    ExtraBytes(usize),
    /// The model refers to something the new constant pool cannot hold.
    ///
    /// A model produced by the reader and the stubber never does this.
    #[error("Unable to write constant pool: {0}")]
    UnwritableConstantPool(Cow<'static, str>),
}

impl Error {
    /// Whether this error describes bad input rather than a broken model.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Error::UnwritableConstantPool(_))
    }

    /// Short reads surface as I/O errors from `read_exact`.
    pub(crate) fn truncation(self) -> Self {
        match self {
            Error::IO(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Error::Truncated,
            e => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
