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
//! Parsing of field and method descriptors, used to size a method's parameters.

use nom::branch::alt;
use nom::bytes::complete::take_till1;
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, map, value};
use nom::multi::{many0, many0_count};
use nom::sequence::{delimited, pair};
use nom::IResult;

use crate::{Error, Result};

/// A field type, as found in descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// One of `BCDFIJSZ`.
    Base(char),
    /// A class, by internal name.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// The number of local variable slots a value of this type takes.
    pub fn slots(&self) -> u16 {
        match self {
            FieldType::Base('J') | FieldType::Base('D') => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    /// `None` for `void`.
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    /// The number of local variable slots the parameters take, not counting `this`.
    pub fn parameter_slots(&self) -> u16 {
        self.parameters.iter().map(FieldType::slots).fold(0, u16::saturating_add)
    }
}

fn element_type(input: &str) -> IResult<&str, FieldType> {
    alt((
        map(one_of("BCDFIJSZ"), FieldType::Base),
        map(
            delimited(char('L'), take_till1(|c: char| c == ';'), char(';')),
            |name: &str| FieldType::Object(name.to_owned()),
        ),
    ))(input)
}

// Array dimensions are counted rather than recursed into so that a long run of `[` cannot exhaust the stack.
fn field_type(input: &str) -> IResult<&str, FieldType> {
    map(pair(many0_count(char('[')), element_type), |(dims, ty)| {
        (0..dims).fold(ty, |ty, _| FieldType::Array(Box::new(ty)))
    })(input)
}

fn return_type(input: &str) -> IResult<&str, Option<FieldType>> {
    alt((value(None, char('V')), map(field_type, Some)))(input)
}

fn method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    map(
        pair(delimited(char('('), many0(field_type), char(')')), return_type),
        |(parameters, return_type)| MethodDescriptor {
            parameters,
            return_type,
        },
    )(input)
}

/// Parses a method descriptor such as `(I[Ljava/lang/String;)V`.
pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor> {
    all_consuming(method_descriptor)(descriptor)
        .map(|(_, d)| d)
        .map_err(|_| Error::Invalid("method descriptor", descriptor.to_owned().into()))
}
