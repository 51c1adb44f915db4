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
//! Replacing method bodies with `throw new RuntimeException()`.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::constants::insn::{ATHROW, DUP, INVOKESPECIAL, NEW};
use crate::descriptor::parse_method_descriptor;
use crate::prelude::*;

/// The exception stubbed methods throw unless told otherwise.
pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

/// The operand stack holds the exception twice, once for `<init>` and once for `athrow`.
const STUB_MAX_STACK: u16 = 2;

/// The instructions of a stubbed method body.
///
/// `exception` is the index of the thrown class and `init` the index of its no-argument constructor.
pub fn stub_body(exception: u16, init: u16) -> Vec<u8> {
    let [e1, e2] = exception.to_be_bytes();
    let [i1, i2] = init.to_be_bytes();
    vec![NEW, e1, e2, DUP, INVOKESPECIAL, i1, i2, ATHROW]
}

/// Turns every method with a body into one that throws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stubber {
    exception: Cow<'static, str>,
}

impl Default for Stubber {
    fn default() -> Self {
        Self::new(RUNTIME_EXCEPTION)
    }
}

impl Stubber {
    /// Creates a stubber that throws `exception`, given as an internal name like `java/lang/Error`.
    ///
    /// The class must have a public constructor taking no arguments.
    pub fn new<S: Into<Cow<'static, str>>>(exception: S) -> Self {
        Self {
            exception: exception.into(),
        }
    }

    pub fn exception(&self) -> &str {
        &self.exception
    }

    /// Stubs every method of `class` that has a `Code` attribute, returning how many there were.
    ///
    /// Exception handlers and the attributes nested in `Code` describe the old body and are dropped.
    /// `max_locals` is kept so the method still has room for its parameters.
    pub fn stub(&self, class: &mut ClassFile) -> Result<usize> {
        if class.methods.iter().all(|m| m.code().is_none()) {
            return Ok(0);
        }
        let pool = &mut class.constant_pool;
        let exception = pool.insert_class(&self.exception)?;
        let init = pool.insert_method(&self.exception, "<init>", "()V")?;
        let body = stub_body(exception, init);

        let pool = &class.constant_pool;
        let mut stubbed = 0;
        for method in &mut class.methods {
            let needed = parameter_slots(pool, method);
            let name = pool.read_utf8(method.name).unwrap_or_default();
            let code = match method.code_mut() {
                Some(code) => code,
                None => continue,
            };
            if let Some(needed) = needed {
                if code.max_locals < needed {
                    warn!(
                        method = name,
                        max_locals = code.max_locals,
                        needed,
                        "max_locals is smaller than the parameters need"
                    );
                }
            }
            code.max_stack = STUB_MAX_STACK;
            code.code = body.clone();
            code.exception_table.clear();
            code.attributes.clear();
            stubbed += 1;
        }
        debug!(class = class.name().unwrap_or_default(), stubbed, "stubbed methods");
        Ok(stubbed)
    }
}

/// Slots taken by the parameters of `method`, including `this` for instance methods.
fn parameter_slots(pool: &ConstantPool, method: &Method) -> Option<u16> {
    let descriptor = pool.read_utf8(method.descriptor)?;
    match parse_method_descriptor(descriptor) {
        Ok(d) => {
            let this = if method.access.contains(AccessFlags::ACC_STATIC) { 0 } else { 1 };
            Some(d.parameter_slots().saturating_add(this))
        }
        Err(e) => {
            warn!(descriptor, "{}", e);
            None
        }
    }
}
