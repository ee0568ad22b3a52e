//! The identity derivation engine.
//!
//! Converts an arbitrary value into a stable string that stands in for the
//! value in a computation fingerprint. Two invocations whose inputs derive
//! the same identity are treated as cache-equivalent, so the rules here err
//! on the side of distinguishing: a false negative merely recomputes, a
//! false positive would replay a stale result.
//!
//! The rules, in order of preference:
//! - tables, series and arrays are identified by their content digest,
//!   independent of physical memory layout;
//! - primitives are identified by their string representation concatenated
//!   with their type name, so `1` and `"1"` never collide;
//! - containers recurse into their elements;
//! - functions are identified by their structural type signature and raise
//!   a [`Caveat`], since behaviorally identical functions with different
//!   signatures cannot be told apart (and vice versa);
//! - everything else can opt in through [`opaque`] or a
//!   `#[derive(Identity)]`, which concatenates `name:identity` pairs of the
//!   fields in declaration order.

use std::any::type_name;
use std::fmt::{Debug, Write};

use crate::caveat::{self, Caveat};
use crate::content::{Array2, ContentHash, Scalar};
use crate::frame::{Frame, Series, Value};

/// Types with a derivable identity string.
pub trait Identity {
    /// Append this value's identity to the output.
    fn write_identity(&self, out: &mut String);
}

/// Derive the identity string of a value.
pub fn identity<T: Identity + ?Sized>(value: &T) -> String {
    let mut out = String::new();
    value.write_identity(&mut out);
    out
}

/// Append one `name:identity` pair to a fingerprint.
///
/// The identity is length-prefixed. Identities are free-form strings that
/// may contain `:` and `-` themselves (the str rule, for one), so a plain
/// join would let distinct argument lists compose into one identical
/// fingerprint; the prefix pins where each identity ends.
pub fn write_labeled(out: &mut String, name: &str, id: &str) {
    write!(out, "{name}:{}:{id}-", id.len()).unwrap();
}

/// Best-effort identity for values without structured handling.
///
/// Uses the debug representation concatenated with the type name and emits
/// a [`Caveat::OpaqueValue`], because changes that do not alter the debug
/// representation will not be detected.
pub fn opaque<T: Debug>(value: &T) -> String {
    caveat::emit(Caveat::OpaqueValue { type_name: type_name::<T>() });
    format!("{value:?}{}", type_name::<T>())
}

macro_rules! primitive {
    ($($ty:ty),*) => {
        $(impl Identity for $ty {
            fn write_identity(&self, out: &mut String) {
                write!(out, "{self}{}", type_name::<Self>()).unwrap();
            }
        })*
    };
}

primitive! {
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64, bool, char
}

impl Identity for str {
    fn write_identity(&self, out: &mut String) {
        out.push_str(self);
        out.push_str("str");
    }
}

impl Identity for String {
    fn write_identity(&self, out: &mut String) {
        self.as_str().write_identity(out);
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    fn write_identity(&self, out: &mut String) {
        (**self).write_identity(out);
    }
}

impl<T: Identity + ?Sized> Identity for &mut T {
    fn write_identity(&self, out: &mut String) {
        (**self).write_identity(out);
    }
}

impl<T: Identity + ?Sized> Identity for Box<T> {
    fn write_identity(&self, out: &mut String) {
        (**self).write_identity(out);
    }
}

impl<T: Identity> Identity for Option<T> {
    fn write_identity(&self, out: &mut String) {
        match self {
            Some(value) => {
                out.push_str("Some(");
                value.write_identity(out);
                out.push(')');
            }
            None => {
                out.push_str("None");
                out.push_str(type_name::<Self>());
            }
        }
    }
}

fn write_sequence<'a, T: Identity + 'a>(
    items: impl Iterator<Item = &'a T>,
    out: &mut String,
) {
    out.push('[');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(',');
        }
        item.write_identity(out);
    }
    out.push(']');
}

impl<T: Identity> Identity for [T] {
    fn write_identity(&self, out: &mut String) {
        write_sequence(self.iter(), out);
    }
}

impl<T: Identity, const N: usize> Identity for [T; N] {
    fn write_identity(&self, out: &mut String) {
        write_sequence(self.iter(), out);
    }
}

impl<T: Identity> Identity for Vec<T> {
    fn write_identity(&self, out: &mut String) {
        write_sequence(self.iter(), out);
    }
}

macro_rules! tuple {
    ($($idx:tt: $field:ident),*) => {
        impl<$($field: Identity),*> Identity for ($($field,)*) {
            fn write_identity(&self, out: &mut String) {
                out.push('(');
                $(
                    self.$idx.write_identity(out);
                    out.push(',');
                )*
                out.push(')');
            }
        }
    };
}

tuple! {}
tuple! { 0: A }
tuple! { 0: A, 1: B }
tuple! { 0: A, 1: B, 2: C }
tuple! { 0: A, 1: B, 2: C, 3: D }
tuple! { 0: A, 1: B, 2: C, 3: D, 4: E }
tuple! { 0: A, 1: B, 2: C, 3: D, 4: E, 5: F }
tuple! { 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G }
tuple! { 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H }

impl Identity for Frame {
    /// Tables are identified purely by content digest: cell values, row
    /// labels and column labels.
    fn write_identity(&self, out: &mut String) {
        write!(out, "frame:{:032x}", self.content_hash()).unwrap();
    }
}

impl Identity for Series {
    fn write_identity(&self, out: &mut String) {
        write!(out, "series:{:032x}", self.content_hash()).unwrap();
    }
}

impl<T: Scalar> Identity for Array2<T> {
    fn write_identity(&self, out: &mut String) {
        write!(out, "array:{:032x}", self.content_hash()).unwrap();
    }
}

impl Identity for Value {
    fn write_identity(&self, out: &mut String) {
        match self {
            Value::Int(int) => int.write_identity(out),
            Value::Float(float) => float.write_identity(out),
            Value::Str(s) => s.write_identity(out),
            Value::Null => out.push_str("null"),
        }
    }
}

macro_rules! function {
    ($($arg:ident),*) => {
        impl<Ret, $($arg),*> Identity for fn($($arg),*) -> Ret {
            /// Functions admit only a structural identity: the type
            /// signature. This distinguishes differently-typed functions
            /// but not different functions of the same type, hence the
            /// caveat.
            fn write_identity(&self, out: &mut String) {
                caveat::emit(Caveat::FunctionArgument {
                    signature: type_name::<Self>(),
                });
                out.push_str(type_name::<Self>());
            }
        }
    };
}

function! {}
function! { A }
function! { A, B }
function! { A, B, C }
function! { A, B, C, D }
function! { A, B, C, D, E }
function! { A, B, C, D, E, F }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caveat::drain_caveats;

    #[test]
    fn test_determinism() {
        let value = (1i64, "one", vec![1.5f64, 2.5]);
        assert_eq!(identity(&value), identity(&value));
    }

    #[test]
    fn test_primitives_carry_type() {
        // `1` and `"1"` must never collide, nor must int and float.
        assert_ne!(identity(&1i64), identity(&"1"));
        assert_ne!(identity(&2i64), identity(&2.0f64));
        assert_ne!(identity(&2i32), identity(&2i64));
    }

    #[test]
    fn test_table_identity_is_content_based() {
        let frame = Frame::parse_delimited("a,b\n1,2\n3,4\n", b',', true);
        assert_eq!(identity(&frame), identity(&frame.transpose().transpose()));
        let mut changed = frame.clone();
        changed.set(1, 1, Value::Int(9));
        assert_ne!(identity(&frame), identity(&changed));
    }

    #[test]
    fn test_function_argument_caveat() {
        fn double(x: i64) -> i64 {
            2 * x
        }
        drain_caveats();
        let id = identity(&(double as fn(i64) -> i64));
        assert!(id.contains("fn(i64) -> i64"));
        assert_eq!(drain_caveats().len(), 1);
    }

    #[test]
    fn test_opaque_fallback() {
        #[derive(Debug)]
        struct Exotic;
        drain_caveats();
        let id = opaque(&Exotic);
        assert!(id.starts_with("Exotic"));
        assert!(matches!(
            drain_caveats().as_slice(),
            [Caveat::OpaqueValue { .. }]
        ));
    }
}
