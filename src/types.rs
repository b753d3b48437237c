//! The closed set of built-in types and the assignability relation between
//! them (§3, §4.3).
use enum_map::{enum_map, Enum, EnumMap};
use static_assertions::assert_impl_all;

/// A built-in PLC type. `Any` and `Comparable` are abstract assignability
/// targets: they are never the resolved type of an expression or the
/// declared type of a variable, only ever the *target* side of an
/// [Type::is_assignable_to] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum Type {
    Any,
    Nil,
    Comparable,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
}

// `Type` is looked up as an `EnumMap` key and stashed in side tables keyed
// by `NodeId`, both of which assume cheap, non-allocating copies.
assert_impl_all!(Type: Copy, Send, Sync);

struct Names {
    display: &'static str,
    target: &'static str,
}

fn name_table() -> EnumMap<Type, Names> {
    enum_map! {
        Type::Any => Names { display: "Any", target: "Object" },
        Type::Nil => Names { display: "Nil", target: "Void" },
        Type::Comparable => Names { display: "Comparable", target: "Object" },
        Type::Boolean => Names { display: "Boolean", target: "boolean" },
        Type::Integer => Names { display: "Integer", target: "int" },
        Type::Decimal => Names { display: "Decimal", target: "double" },
        Type::Character => Names { display: "Character", target: "char" },
        Type::String => Names { display: "String", target: "String" },
    }
}

impl Type {
    /// The source-side spelling, as written by a PLC programmer.
    pub fn display_name(self) -> &'static str {
        name_table()[self].display
    }

    /// The codegen-side spelling emitted by [crate::generator].
    pub fn target_name(self) -> &'static str {
        name_table()[self].target
    }

    /// Resolves a source-side type name to a [Type]. Returns `None` for
    /// anything that isn't one of the eight built-in spellings.
    pub fn from_display_name(name: &str) -> Option<Type> {
        use Type::*;
        Some(match name {
            "Any" => Any,
            "Nil" => Nil,
            "Comparable" => Comparable,
            "Boolean" => Boolean,
            "Integer" => Integer,
            "Decimal" => Decimal,
            "Character" => Character,
            "String" => String,
            _ => return None,
        })
    }

    /// `target ≟ source`: does a value of type `source` fit in a slot
    /// declared as `self`? Per §4.3:
    ///
    /// - `target == source` always passes.
    /// - `target == Any` always passes.
    /// - `target == Comparable` passes iff `source` is one of `Integer`,
    ///   `Decimal`, `Character`, `String`.
    /// - Everything else fails. This relation is not symmetric.
    pub fn is_assignable_from(self, source: Type) -> bool {
        use Type::*;
        if self == source || self == Any {
            return true;
        }
        if self == Comparable {
            return matches!(source, Integer | Decimal | Character | String);
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use Type::*;

    const ALL: [Type; 8] = [Any, Nil, Comparable, Boolean, Integer, Decimal, Character, String];

    #[test]
    fn any_accepts_everything() {
        for &t in ALL.iter() {
            assert!(Any.is_assignable_from(t), "Any should accept {t:?}");
        }
    }

    #[test]
    fn comparable_accepts_only_orderable_scalars() {
        for &t in ALL.iter() {
            let expected = matches!(t, Integer | Decimal | Character | String);
            assert_eq!(Comparable.is_assignable_from(t), expected, "Comparable vs {t:?}");
        }
    }

    #[test]
    fn every_type_accepts_itself() {
        for &t in ALL.iter() {
            assert!(t.is_assignable_from(t));
        }
    }

    #[test]
    fn assignability_is_not_symmetric() {
        assert!(Comparable.is_assignable_from(Integer));
        assert!(!Integer.is_assignable_from(Comparable));

        assert!(Any.is_assignable_from(Boolean));
        assert!(!Boolean.is_assignable_from(Any));
    }

    #[test]
    fn unrelated_concrete_types_fail_both_ways() {
        assert!(!Integer.is_assignable_from(String));
        assert!(!String.is_assignable_from(Integer));
        assert!(!Boolean.is_assignable_from(Character));
    }

    #[test]
    fn display_and_target_names_round_trip() {
        for &t in ALL.iter() {
            assert_eq!(Type::from_display_name(t.display_name()), Some(t));
        }
        assert_eq!(Integer.target_name(), "int");
        assert_eq!(String.target_name(), "String");
        assert_eq!(Nil.target_name(), "Void");
    }
}
