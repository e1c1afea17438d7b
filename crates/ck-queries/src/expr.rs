//! Predicate expression trees
//!
//! Filter predicates are plain data: a small tagged union that the parser
//! produces, the printer renders, and the compiler turns into a closure over
//! an entity. Programmatic callers build the same trees with the helpers at
//! the bottom of this module:
//!
//! ```
//! use ck_queries::expr::{field, Expr};
//!
//! let adult_johns: Expr = field("Age").gt(18).and(field("Name").equals("John"));
//! assert_eq!(adult_johns.to_string(), r#"Age > 18 && Name == "John""#);
//! ```

use ck_core::Value;
use std::fmt;

/// Deepest expression tree the parser and binder accept
pub const MAX_DEPTH: usize = 256;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical not (`!`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
}

/// Binary operators, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// Binding strength; all binary operators are left-associative
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::Or | Self::And)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// Methods callable on a member or constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    ToLower,
    ToUpper,
    Trim,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::ToLower => "ToLower",
            Self::ToUpper => "ToUpper",
            Self::Trim => "Trim",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Contains" => Some(Self::Contains),
            "StartsWith" => Some(Self::StartsWith),
            "EndsWith" => Some(Self::EndsWith),
            "ToLower" | "ToLowerInvariant" => Some(Self::ToLower),
            "ToUpper" | "ToUpperInvariant" => Some(Self::ToUpper),
            "Trim" => Some(Self::Trim),
            _ => None,
        }
    }

    /// Number of arguments the method takes
    pub fn arity(&self) -> usize {
        match self {
            Self::Contains | Self::StartsWith | Self::EndsWith => 1,
            Self::ToLower | Self::ToUpper | Self::Trim => 0,
        }
    }
}

/// A predicate or value expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    /// Property path from the entity root, e.g. `["Address", "City"]`
    Member(Vec<String>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        target: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(target: Expr, method: Method, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: Box::new(target),
            method,
            args,
        }
    }

    pub fn and(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::And, self, other.into())
    }

    pub fn or(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Or, self, other.into())
    }

    pub fn equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Eq, self, other.into())
    }

    pub fn not_equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ne, self, other.into())
    }

    pub fn lt(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Lt, self, other.into())
    }

    pub fn le(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Le, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Gt, self, other.into())
    }

    pub fn ge(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ge, self, other.into())
    }

    pub fn plus(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Add, self, other.into())
    }

    pub fn minus(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Sub, self, other.into())
    }

    pub fn times(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Mul, self, other.into())
    }

    pub fn contains(self, other: impl Into<Expr>) -> Self {
        Self::call(self, Method::Contains, vec![other.into()])
    }

    pub fn starts_with(self, other: impl Into<Expr>) -> Self {
        Self::call(self, Method::StartsWith, vec![other.into()])
    }

    pub fn ends_with(self, other: impl Into<Expr>) -> Self {
        Self::call(self, Method::EndsWith, vec![other.into()])
    }

    pub fn to_lower(self) -> Self {
        Self::call(self, Method::ToLower, vec![])
    }

    pub fn to_upper(self) -> Self {
        Self::call(self, Method::ToUpper, vec![])
    }

    pub fn trim(self) -> Self {
        Self::call(self, Method::Trim, vec![])
    }

    /// AND all expressions together, left to right. `None` for an empty input.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(|acc, e| acc.and(e))
    }

    /// OR all expressions together, left to right. `None` for an empty input.
    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(|acc, e| acc.or(e))
    }

    /// Height of the tree; a constant or member alone has depth 1.
    /// Computed without recursion so arbitrarily deep trees can be measured.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((expr, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match expr {
                Expr::Constant(_) | Expr::Member(_) => {}
                Expr::Unary { operand, .. } => stack.push((operand, depth + 1)),
                Expr::Binary { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
                Expr::Call { target, args, .. } => {
                    stack.push((target, depth + 1));
                    stack.extend(args.iter().map(|arg| (arg, depth + 1)));
                }
            }
        }
        deepest
    }

    /// Visit every member path in the tree
    pub fn member_paths(&self) -> Vec<&[String]> {
        let mut paths = Vec::new();
        self.collect_members(&mut paths);
        paths
    }

    fn collect_members<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Member(path) => out.push(path),
            Expr::Unary { operand, .. } => operand.collect_members(out),
            Expr::Binary { left, right, .. } => {
                left.collect_members(out);
                right.collect_members(out);
            }
            Expr::Call { target, args, .. } => {
                target.collect_members(out);
                for arg in args {
                    arg.collect_members(out);
                }
            }
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::print(self))
    }
}

macro_rules! constant_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Constant(Value::from(value))
                }
            }
        )*
    };
}

constant_from!(bool, i32, i64, u32, f64, &str, String);

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Constant(value)
    }
}

/// Member access from the entity root; dots separate navigation steps
pub fn field(path: &str) -> Expr {
    Expr::Member(path.split('.').map(str::to_string).collect())
}

/// Constant value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsl_builds_expected_tree() {
        let expr = field("Age").gt(18);
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Gt,
                left: Box::new(Expr::Member(vec!["Age".into()])),
                right: Box::new(Expr::Constant(Value::Int(18))),
            }
        );
    }

    #[test]
    fn test_member_paths() {
        let expr = field("Address.City")
            .equals("Oslo")
            .or(field("Name").to_lower().contains("ann"));
        let paths: Vec<String> = expr.member_paths().iter().map(|p| p.join(".")).collect();
        assert_eq!(paths, vec!["Address.City", "Name"]);
    }

    #[test]
    fn test_depth() {
        assert_eq!(field("Age").depth(), 1);
        assert_eq!(field("Age").gt(18).depth(), 2);
        assert_eq!((!field("Name").to_lower().contains("a")).depth(), 4);
    }

    #[test]
    fn test_all_and_any() {
        assert!(Expr::all(Vec::new()).is_none());
        let combined = Expr::all(vec![field("A").equals(1), field("B").equals(2)]).unwrap();
        assert!(matches!(combined, Expr::Binary { op: BinaryOp::And, .. }));
        let either = Expr::any(vec![field("A").equals(1)]).unwrap();
        assert!(matches!(either, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in [
            Method::Contains,
            Method::StartsWith,
            Method::EndsWith,
            Method::ToLower,
            Method::ToUpper,
            Method::Trim,
        ] {
            assert_eq!(Method::from_name(method.name()), Some(method));
        }
        assert_eq!(Method::from_name("Substring"), None);
    }
}
