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
//! this module defines the class file version.

/// the version of a java class.
///
/// Stubbing never changes the version, so any major version is accepted and kept as is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, ReadWrite)]
pub struct JavaVersion {
    /// The minor version.
    pub minor: u16,
    /// The major version.
    pub major: u16,
}

impl JavaVersion {
    pub const J8: JavaVersion = JavaVersion { minor: 0, major: 52 };
    pub const J17: JavaVersion = JavaVersion { minor: 0, major: 61 };
}
