//! Runtime representation of PLC values (§3).
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::types::Type;

/// A runtime value. Lists are reference-shared via `Rc<RefCell<_>>`: two
/// `Value::List`s that were produced by aliasing the same variable/global
/// observe each other's in-place mutations, matching §3's "aliased updates
/// are observable through all aliases" rule. Every other variant is plain
/// data, cloned by value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Character(char),
    Integer(BigInt),
    Decimal(BigDecimal),
    String(String),
    List(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    /// The runtime "kind" of a value, used to check that two operands of a
    /// binary operator agree at runtime (§4.4: "Arithmetic requires
    /// matching numeric kinds").
    pub fn kind(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Boolean(_) => Type::Boolean,
            Value::Character(_) => Type::Character,
            Value::Integer(_) => Type::Integer,
            Value::Decimal(_) => Type::Decimal,
            Value::String(_) => Type::String,
            Value::List(_) => Type::Any,
        }
    }

    /// Structural value equality, used by `==`/`!=` and by `SWITCH` case
    /// matching. Values of different kinds are never equal.
    pub fn structural_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Character(a), Character(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (List(a), List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            _ => false,
        }
    }

    /// Total ordering for the `Comparable` family (`<`, `>`). Returns
    /// `None` for operand kinds that don't support ordering; callers rely
    /// on the analyzer having already guaranteed both operands share a
    /// `Comparable`-assignable type.
    pub fn partial_cmp_comparable(&self, other: &Value) -> Option<std::cmp::Ordering> {
        use Value::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) => a.partial_cmp(b),
            (Character(a), Character(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Character(c) => write!(f, "{c}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lists_alias_through_shared_rc() {
        let list = Value::list(vec![Value::Integer(BigInt::from(1))]);
        let alias = list.clone();

        if let (Value::List(a), Value::List(b)) = (&list, &alias) {
            a.borrow_mut().push(Value::Integer(BigInt::from(2)));
            assert_eq!(b.borrow().len(), 2);
        } else {
            panic!("expected lists");
        }
    }

    #[test]
    fn structural_equality_ignores_kind_mismatch() {
        assert!(!Value::Integer(BigInt::from(1))
            .structural_eq(&Value::Decimal(BigDecimal::from_str("1").unwrap())));
        assert!(Value::Integer(BigInt::from(1)).structural_eq(&Value::Integer(BigInt::from(1))));
    }

    #[test]
    fn display_formats_plain_values() {
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
        assert_eq!(
            Value::list(vec![Value::Integer(BigInt::from(1)), Value::Integer(BigInt::from(2))])
                .to_string(),
            "[1, 2]"
        );
    }
}
