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
use super::{foo, FOO};
use crate::constants::insn::{ATHROW, DUP, INVOKESPECIAL, NEW};
use crate::prelude::*;
use crate::stub::{stub_body, RUNTIME_EXCEPTION};

fn stubbed(bytes: &[u8], stubber: &Stubber) -> Vec<u8> {
    let mut class = ClassFile::parse(bytes).unwrap();
    stubber.stub(&mut class).unwrap();
    class.to_bytes().unwrap()
}

fn find<'a>(class: &'a ClassFile, name: &str) -> &'a Method {
    class
        .methods
        .iter()
        .find(|m| class.constant_pool.read_utf8(m.name) == Some(name))
        .unwrap()
}

fn operand(code: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([code[at], code[at + 1]])
}

#[test]
fn test_stub_body() {
    assert_eq!(
        stub_body(0x0102, 0x0304),
        vec![NEW, 1, 2, DUP, INVOKESPECIAL, 3, 4, ATHROW]
    );
}

#[test]
fn test_stub_add() {
    let mut class = ClassFile::parse(&FOO).unwrap();
    assert_eq!(Stubber::default().stub(&mut class).unwrap(), 4);

    let class = ClassFile::parse(&class.to_bytes().unwrap()).unwrap();
    let add = find(&class, "add").code().unwrap();
    assert_eq!(add.max_stack, 2);
    assert_eq!(add.max_locals, 3);
    assert!(add.exception_table.is_empty());
    assert!(add.attributes.is_empty());

    let code = &add.code;
    assert_eq!(code.len(), 8);
    assert_eq!((code[0], code[3], code[4], code[7]), (NEW, DUP, INVOKESPECIAL, ATHROW));
    assert_eq!(class.constant_pool.read_class(operand(code, 1)), Some(RUNTIME_EXCEPTION));
    assert_eq!(
        class.constant_pool.read_member(operand(code, 5)),
        Some((RUNTIME_EXCEPTION, "<init>", "()V"))
    );

    for method in class.methods.iter().filter_map(Method::code) {
        assert_eq!(method.code, *code);
    }
}

#[test]
fn test_abstract_method_untouched() {
    let class = ClassFile::parse(&stubbed(&FOO, &Stubber::default())).unwrap();
    let run = find(&class, "run");
    assert!(run.code().is_none());
    assert_eq!(run.attributes.len(), 1);
    match &run.attributes[0] {
        MethodAttribute::Raw(raw) => {
            assert_eq!(raw.name, "Exceptions");
            let idx = operand(&raw.inner, 2);
            assert_eq!(class.constant_pool.read_class(idx), Some("java/io/IOException"));
        }
        other => panic!("unexpected attribute {:?}", other),
    }
}

#[test]
fn test_idempotent() {
    let once = stubbed(&FOO, &Stubber::default());
    let twice = stubbed(&once, &Stubber::default());
    assert_eq!(once, twice);
}

#[test]
fn test_deterministic() {
    assert_eq!(
        stubbed(&FOO, &Stubber::default()),
        stubbed(&FOO, &Stubber::default())
    );
}

#[test]
fn test_pool_is_minimal() {
    let out = stubbed(&FOO, &Stubber::default());
    let class = ClassFile::parse(&out).unwrap();
    assert_eq!(class.to_bytes().unwrap(), out);
    for (_, entry) in class.constant_pool.iter() {
        assert!(!matches!(entry, RawConstantEntry::Long(_)));
        assert!(!matches!(entry, RawConstantEntry::String(_)));
        assert_ne!(entry, &RawConstantEntry::UTF8("hello".into()));
        assert_ne!(entry, &RawConstantEntry::UTF8("java/lang/ArithmeticException".into()));
        assert_ne!(entry, &RawConstantEntry::UTF8("LineNumberTable".into()));
    }
    // still referenced by the field and the abstract method
    assert!(class.constant_pool.iter().any(|(_, e)| *e == RawConstantEntry::Int(42)));
    let io = RawConstantEntry::UTF8("java/io/IOException".into());
    assert!(class.constant_pool.iter().any(|(_, e)| *e == io));
}

#[test]
fn test_custom_exception() {
    let stubber = Stubber::new("java/lang/UnsupportedOperationException");
    assert_eq!(stubber.exception(), "java/lang/UnsupportedOperationException");
    let class = ClassFile::parse(&stubbed(&FOO, &stubber)).unwrap();
    let code = &find(&class, "greet").code().unwrap().code;
    assert_eq!(
        class.constant_pool.read_class(operand(code, 1)),
        Some("java/lang/UnsupportedOperationException")
    );
}

#[test]
fn test_no_code_no_change() {
    let mut class = foo();
    class.methods.retain(|m| m.code().is_none());
    let count = class.constant_pool.count();
    assert_eq!(Stubber::default().stub(&mut class).unwrap(), 0);
    assert_eq!(class.constant_pool.count(), count);
}

#[test]
fn test_small_max_locals_is_kept() {
    let mut class = foo();
    for method in &mut class.methods {
        if let Some(code) = method.code_mut() {
            code.max_locals = 0;
        }
    }
    Stubber::default().stub(&mut class).unwrap();
    let class = ClassFile::parse(&class.to_bytes().unwrap()).unwrap();
    assert!(class
        .methods
        .iter()
        .filter_map(Method::code)
        .all(|c| c.max_locals == 0));
}
