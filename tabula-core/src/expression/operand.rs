use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Like,
    ILike,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// Right hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Unary operators like `IS NULL`.
    None,
    Value(Value),
    /// Members of `IN` and `NOT IN`.
    List(Vec<Value>),
}
