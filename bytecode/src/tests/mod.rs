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

mod archive;
mod stub;

use crate::prelude::*;

lazy_static::lazy_static! {
    /// `Foo` as written by the class writer.
    pub(crate) static ref FOO: Vec<u8> = foo().to_bytes().unwrap();
}

pub(crate) fn method(
    cp: &mut ConstantPool,
    access: AccessFlags,
    name: &str,
    descriptor: &str,
    attributes: Vec<MethodAttribute>,
) -> Method {
    Method {
        access,
        name: cp.insert_utf8(name).unwrap(),
        descriptor: cp.insert_utf8(descriptor).unwrap(),
        attributes,
    }
}

pub(crate) fn code(max_stack: u16, max_locals: u16, code: Vec<u8>) -> CodeAttribute {
    CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table: vec![],
        attributes: vec![],
    }
}

pub(crate) fn be(idx: u16) -> [u8; 2] {
    idx.to_be_bytes()
}

/// Roughly what javac makes of
///
/// ```java
/// public abstract class Foo {
///     static final int ANSWER = 42;
///     public int add(int a, int b) { try { return a + b; } catch (ArithmeticException e) { return 0; } }
///     public String greet() { return "hello"; }
///     public static long big() { return 1234567890123L; }
///     public abstract void run() throws java.io.IOException;
/// }
/// ```
pub(crate) fn foo() -> ClassFile {
    let mut class = ClassFile::new(
        JavaVersion::J8,
        AccessFlags::ACC_PUBLIC | AccessFlags::ACC_SUPER | AccessFlags::ACC_ABSTRACT,
        "Foo",
        Some("java/lang/Object"),
    )
    .unwrap();
    let cp = &mut class.constant_pool;

    let answer = cp.insert_raw(RawConstantEntry::Int(42)).unwrap();
    class.fields.push(Field {
        access: AccessFlags::ACC_STATIC | AccessFlags::ACC_FINAL,
        name: cp.insert_utf8("ANSWER").unwrap(),
        descriptor: cp.insert_utf8("I").unwrap(),
        attributes: vec![RawAttribute::new("ConstantValue", be(answer).to_vec())],
    });

    let object_init = cp.insert_method("java/lang/Object", "<init>", "()V").unwrap();
    let [hi, lo] = be(object_init);
    let init = method(
        cp,
        AccessFlags::ACC_PUBLIC,
        "<init>",
        "()V",
        vec![MethodAttribute::Code(code(1, 1, vec![0x2a, 0xb7, hi, lo, 0xb1]))],
    );

    let arithmetic = cp.insert_class("java/lang/ArithmeticException").unwrap();
    let mut add_body = code(2, 3, vec![0x1b, 0x1c, 0x60, 0xac, 0x03, 0xac]);
    add_body.exception_table.push(ExceptionHandler {
        start_pc: 0,
        end_pc: 4,
        handler_pc: 4,
        catch_type: arithmetic,
    });
    add_body
        .attributes
        .push(RawAttribute::new("LineNumberTable", vec![0, 1, 0, 0, 0, 3]));
    let add = method(
        cp,
        AccessFlags::ACC_PUBLIC,
        "add",
        "(II)I",
        vec![MethodAttribute::Code(add_body)],
    );

    let hello = cp.insert_utf8("hello").unwrap();
    let hello = cp.insert_raw(RawConstantEntry::String(hello)).unwrap();
    let greet = method(
        cp,
        AccessFlags::ACC_PUBLIC,
        "greet",
        "()Ljava/lang/String;",
        vec![MethodAttribute::Code(code(1, 1, vec![0x12, hello as u8, 0xb0]))],
    );

    let long = cp.insert_raw(RawConstantEntry::Long(1234567890123)).unwrap();
    let [hi, lo] = be(long);
    let big = method(
        cp,
        AccessFlags::ACC_PUBLIC | AccessFlags::ACC_STATIC,
        "big",
        "()J",
        vec![MethodAttribute::Code(code(2, 0, vec![0x14, hi, lo, 0xad]))],
    );

    let io = cp.insert_class("java/io/IOException").unwrap();
    let [hi, lo] = be(io);
    let run = method(
        cp,
        AccessFlags::ACC_PUBLIC | AccessFlags::ACC_ABSTRACT,
        "run",
        "()V",
        vec![MethodAttribute::Raw(RawAttribute::new("Exceptions", vec![0, 1, hi, lo]))],
    );

    let source = cp.insert_utf8("Foo.java").unwrap();
    class
        .attributes
        .push(RawAttribute::new("SourceFile", be(source).to_vec()));
    class.methods = vec![init, add, greet, big, run];
    class
}

/// Assembles a class by hand, so that malformed input can be produced.
///
/// The pool is `#1 Utf8 "A"`, `#2 Class #1`, `#3 Utf8 "m"`, `#4 Utf8 "()V"`, `#5 Utf8 <attribute>`,
/// and the class has one method `m()V` carrying a single attribute.
pub(crate) struct Assembler {
    pub count: u16,
    pub class_name: Vec<u8>,
    pub this_class: u16,
    pub attribute: &'static str,
    pub payload: Vec<u8>,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler {
            count: 6,
            class_name: b"A".to_vec(),
            this_class: 2,
            attribute: "Code",
            // max_stack 1, max_locals 1, `return`, no handlers, no attributes
            payload: vec![0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0],
        }
    }
}

impl Assembler {
    pub fn with_code(code: &[u8]) -> Self {
        let mut payload = vec![0, 1, 0, 1];
        payload.extend_from_slice(&(code.len() as u32).to_be_bytes());
        payload.extend_from_slice(code);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        Assembler {
            payload,
            ..Assembler::default()
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        fn utf8(out: &mut Vec<u8>, bytes: &[u8]) {
            out.push(1);
            out.extend_from_slice(&be(bytes.len() as u16));
            out.extend_from_slice(bytes);
        }
        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
        out.extend_from_slice(&be(self.count));
        utf8(&mut out, &self.class_name);
        out.extend_from_slice(&[7, 0, 1]);
        utf8(&mut out, b"m");
        utf8(&mut out, b"()V");
        utf8(&mut out, self.attribute.as_bytes());
        out.extend_from_slice(&[0x00, 0x21]);
        out.extend_from_slice(&be(self.this_class));
        // super, interfaces, fields
        out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        // one method: public m()V with one attribute
        out.extend_from_slice(&[0, 1, 0, 1, 0, 3, 0, 4, 0, 1, 0, 5]);
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        // no class attributes
        out.extend_from_slice(&[0, 0]);
        out
    }
}
