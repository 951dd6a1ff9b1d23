//! Fixed-arity immutable records, `Struct0` through `Struct12`.
//!
//! The types are rendered at build time by the same code the `generate`
//! subcommand uses. Each `StructN` is a public tuple struct with `new`, typed
//! accessors `get0()..`, and conversions to and from the matching tuple.

use std::any::Any;

pub use crate::codegen::render::MAX_STRUCT_ARITY;

/// Positional access shared by every generated struct.
pub trait Struct {
    fn arity(&self) -> usize;

    /// Field `i` as `Any`, or `None` past the last field.
    fn get(&self, i: usize) -> Option<&dyn Any>;
}

include!(concat!(env!("OUT_DIR"), "/structs.rs"));

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_accessors_and_arity() {
        let s = Struct3::new(1u8, "two", 3.0f64);
        assert_eq!(*s.get0(), 1);
        assert_eq!(*s.get1(), "two");
        assert_eq!(s.arity(), 3);
        assert_eq!(Struct::get(&s, 1).and_then(|v| v.downcast_ref::<&str>()), Some(&"two"));
        assert!(Struct::get(&s, 3).is_none());
        assert_eq!(Struct0::new().arity(), 0);
    }

    #[test]
    fn test_tuple_conversions() {
        let s: Struct2<i32, char> = (7, 'x').into();
        assert_eq!(s, Struct2(7, 'x'));
        let t: (i32, char) = s.into();
        assert_eq!(t, (7, 'x'));
        let one: Struct1<u8> = (9,).into();
        assert_eq!(one.0, 9);
    }

    #[test]
    fn test_largest_arity_is_generated() {
        let s = Struct12::new(0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11);
        assert_eq!(s.arity(), MAX_STRUCT_ARITY - 1);
        assert_eq!(*s.get11(), 11);
    }

    #[test]
    fn test_ordering_and_serde() {
        let set: BTreeSet<Struct2<u8, u8>> =
            [Struct2(2, 0), Struct2(1, 9), Struct2(1, 3)].into_iter().collect();
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(ordered, vec![Struct2(1, 3), Struct2(1, 9), Struct2(2, 0)]);
        let json = serde_json::to_string(&Struct2(1, "a")).unwrap();
        assert_eq!(json, "[1,\"a\"]");
    }
}
