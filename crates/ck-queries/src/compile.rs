//! Binding and compilation of predicate trees
//!
//! Binding resolves member paths against an entity schema and rewrites them to
//! canonical property names. Compilation turns a bound tree into a closure.
//!
//! Equality is null-safe: `null == null` holds and `x != c` holds when `x` is
//! null. Ordering comparisons involving null are false, arithmetic on null
//! yields null, and only a boolean `true` satisfies a predicate.

use std::cmp::Ordering;
use std::sync::Arc;

use ck_core::{find_property, Entity, PropertyType, QsError, QsResult, Value};

use crate::expr::{BinaryOp, Expr, Method, UnaryOp, MAX_DEPTH};

/// Compiled predicate over an entity
pub type Compiled<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

type ValueFn<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

/// Resolve a property path against `T`'s schema.
///
/// Returns the canonical path and the declared type of its last segment.
/// Every segment but the last must be an object-typed property.
pub fn resolve_path<T: Entity>(path: &[String]) -> QsResult<(Vec<String>, PropertyType)> {
    if path.is_empty() {
        return Err(QsError::Validation("property path cannot be empty".to_string()));
    }

    let mut owner = T::TYPE_NAME;
    let mut properties = T::properties();
    let mut canonical = Vec::with_capacity(path.len());

    for (i, segment) in path.iter().enumerate() {
        let descriptor = find_property(properties, segment)
            .ok_or_else(|| QsError::unknown_property(owner, path.join(".")))?;
        canonical.push(descriptor.name.to_string());

        if i + 1 == path.len() {
            return Ok((canonical, descriptor.ty));
        }

        match descriptor.ty {
            PropertyType::Object(shape) => {
                owner = shape.type_name;
                properties = shape.properties();
            }
            _ => return Err(QsError::unknown_property(owner, path.join("."))),
        }
    }

    Err(QsError::Internal(format!("unresolved path {}", path.join("."))))
}

/// Resolve a dotted property path
pub fn resolve_dotted<T: Entity>(path: &str) -> QsResult<(Vec<String>, PropertyType)> {
    let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
    resolve_path::<T>(&segments)
}

/// Validate an expression against `T` and rewrite member paths to their
/// canonical names
pub fn bind<T: Entity>(expr: &Expr) -> QsResult<Expr> {
    let depth = expr.depth();
    if depth > MAX_DEPTH {
        return Err(QsError::Validation(format!(
            "expression nested too deeply ({} levels, limit {})",
            depth, MAX_DEPTH
        )));
    }
    bind_node::<T>(expr)
}

fn bind_node<T: Entity>(expr: &Expr) -> QsResult<Expr> {
    Ok(match expr {
        Expr::Constant(Value::Object(_)) => {
            return Err(QsError::Validation(
                "object constants are not supported in predicates".to_string(),
            ))
        }
        Expr::Constant(value) => Expr::Constant(value.clone()),
        Expr::Member(path) => Expr::Member(resolve_path::<T>(path)?.0),
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(bind_node::<T>(operand)?),
        },
        Expr::Binary { op, left, right } => {
            Expr::binary(*op, bind_node::<T>(left)?, bind_node::<T>(right)?)
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            if args.len() != method.arity() {
                return Err(QsError::Validation(format!(
                    "{} takes {} argument(s), got {}",
                    method.name(),
                    method.arity(),
                    args.len()
                )));
            }
            let args = args.iter().map(bind_node::<T>).collect::<QsResult<Vec<_>>>()?;
            Expr::call(bind_node::<T>(target)?, *method, args)
        }
    })
}

/// Compile a bound expression into a predicate
pub fn compile_predicate<T: Entity>(expr: &Expr) -> Compiled<T> {
    let value = compile_value::<T>(expr);
    Arc::new(move |entity: &T| value(entity).is_true())
}

/// Read a property path from an entity; missing segments read as null
pub fn read_path<T: Entity>(entity: &T, path: &[String]) -> Value {
    let Some((first, rest)) = path.split_first() else {
        return Value::Null;
    };
    let mut current = entity.property(first).unwrap_or_default();
    for segment in rest {
        current = match current.member(segment) {
            Some(value) => value.clone(),
            None => return Value::Null,
        };
    }
    current
}

fn compile_value<T: Entity>(expr: &Expr) -> ValueFn<T> {
    match expr {
        Expr::Constant(value) => {
            let value = value.clone();
            Box::new(move |_: &T| value.clone())
        }
        Expr::Member(path) => {
            let path = path.clone();
            Box::new(move |entity: &T| read_path(entity, &path))
        }
        Expr::Unary { op, operand } => {
            let operand = compile_value::<T>(operand);
            match op {
                UnaryOp::Not => Box::new(move |entity: &T| {
                    operand(entity).as_bool().map_or(Value::Null, |b| Value::Bool(!b))
                }),
                UnaryOp::Negate => Box::new(move |entity: &T| match operand(entity) {
                    Value::Int(i) => i.checked_neg().map_or(Value::Null, Value::Int),
                    Value::Float(x) => Value::Float(-x),
                    _ => Value::Null,
                }),
            }
        }
        Expr::Binary { op, left, right } => {
            let op = *op;
            let left = compile_value::<T>(left);
            let right = compile_value::<T>(right);
            match op {
                BinaryOp::And => Box::new(move |entity: &T| {
                    Value::Bool(left(entity).is_true() && right(entity).is_true())
                }),
                BinaryOp::Or => Box::new(move |entity: &T| {
                    Value::Bool(left(entity).is_true() || right(entity).is_true())
                }),
                BinaryOp::Eq => Box::new(move |entity: &T| Value::Bool(left(entity).loose_eq(&right(entity)))),
                BinaryOp::Ne => Box::new(move |entity: &T| Value::Bool(!left(entity).loose_eq(&right(entity)))),
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    Box::new(move |entity: &T| {
                        let ordering = left(entity).compare(&right(entity));
                        Value::Bool(relational(op, ordering))
                    })
                }
                _ => Box::new(move |entity: &T| arithmetic(op, left(entity), right(entity))),
            }
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            let method = *method;
            let target = compile_value::<T>(target);
            let args: Vec<ValueFn<T>> = args.iter().map(compile_value::<T>).collect();
            Box::new(move |entity: &T| {
                let argument = args.first().map(|arg| arg(entity)).unwrap_or_default();
                call_method(method, target(entity), argument)
            })
        }
    }
}

fn relational(op: BinaryOp, ordering: Option<Ordering>) -> bool {
    match (op, ordering) {
        (_, None) => false,
        (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
        (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
        (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
        (BinaryOp::Ge, Some(o)) => o != Ordering::Less,
        _ => false,
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Value::Null,
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Rem => a.checked_rem(b),
                _ => None,
            };
            result.map_or(Value::Null, Value::Int)
        }
        (Value::Text(a), Value::Text(b)) if op == BinaryOp::Add => Value::Text(a + &b),
        (left, right) => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Value::Null,
            }),
            _ => Value::Null,
        },
    }
}

fn call_method(method: Method, target: Value, argument: Value) -> Value {
    match (method, target) {
        (_, Value::Null) => Value::Null,
        (Method::Contains, Value::List(items)) => {
            Value::Bool(items.iter().any(|item| item.loose_eq(&argument)))
        }
        (Method::Contains, Value::Text(s)) => text_test(&argument, |needle| s.contains(needle)),
        (Method::StartsWith, Value::Text(s)) => text_test(&argument, |prefix| s.starts_with(prefix)),
        (Method::EndsWith, Value::Text(s)) => text_test(&argument, |suffix| s.ends_with(suffix)),
        (Method::ToLower, Value::Text(s)) => Value::Text(s.to_lowercase()),
        (Method::ToUpper, Value::Text(s)) => Value::Text(s.to_uppercase()),
        (Method::Trim, Value::Text(s)) => Value::Text(s.trim().to_string()),
        _ => Value::Null,
    }
}

fn text_test(argument: &Value, test: impl Fn(&str) -> bool) -> Value {
    argument.as_str().map_or(Value::Null, |s| Value::Bool(test(s)))
}
