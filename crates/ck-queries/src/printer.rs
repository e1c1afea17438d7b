//! Canonical text rendering of predicate trees
//!
//! Output uses bare member names, double-quoted strings and only the
//! parentheses precedence requires, so `parse(print(e)) == e` for any bound
//! expression.

use ck_core::Value;

use crate::expr::{Expr, UnaryOp};

/// Render an expression as canonical predicate text
pub fn print(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Constant(value) => write_constant(out, value),
        Expr::Member(path) => out.push_str(&path.join(".")),
        Expr::Unary { op, operand } => {
            out.push_str(match op {
                UnaryOp::Not => "!",
                UnaryOp::Negate => "-",
            });
            write_operand(out, operand, matches!(**operand, Expr::Binary { .. }));
        }
        Expr::Binary { op, left, right } => {
            let precedence = op.precedence();
            let left_parens =
                matches!(&**left, Expr::Binary { op: inner, .. } if inner.precedence() < precedence);
            let right_parens =
                matches!(&**right, Expr::Binary { op: inner, .. } if inner.precedence() <= precedence);

            write_operand(out, left, left_parens);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_operand(out, right, right_parens);
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            let parens = matches!(**target, Expr::Binary { .. } | Expr::Unary { .. })
                || matches!(**target, Expr::Constant(Value::Int(i)) if i < 0)
                || matches!(**target, Expr::Constant(Value::Float(x)) if x < 0.0);
            write_operand(out, target, parens);
            out.push('.');
            out.push_str(method.name());
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
    }
}

fn write_operand(out: &mut String, expr: &Expr, parens: bool) {
    if parens {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_constant(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(x) => {
            let text = x.to_string();
            out.push_str(&text);
            if x.is_finite() && !text.contains('.') {
                out.push_str(".0");
            }
        }
        Value::Text(s) => write_string(out, s),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_constant(out, item);
            }
            out.push(']');
        }
        Value::Object(_) => out.push_str(&value.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, lit};

    #[test]
    fn test_minimal_parentheses() {
        let expr = field("Age").gt(18).and(field("Name").equals("John"));
        assert_eq!(print(&expr), r#"Age > 18 && Name == "John""#);

        let expr = field("A").equals(1).or(field("B").equals(2)).and(field("C").equals(3));
        assert_eq!(print(&expr), "(A == 1 || B == 2) && C == 3");

        let expr = field("A").equals(1).and(field("B").equals(2).or(field("C").equals(3)));
        assert_eq!(print(&expr), "A == 1 && (B == 2 || C == 3)");
    }

    #[test]
    fn test_right_associativity_needs_parentheses() {
        let expr = field("A").minus(field("B").minus(field("C")));
        assert_eq!(print(&expr), "A - (B - C)");

        let expr = field("A").minus(field("B")).minus(field("C"));
        assert_eq!(print(&expr), "A - B - C");
    }

    #[test]
    fn test_unary_and_calls() {
        let expr = !field("Active").and(field("Age").lt(3));
        assert_eq!(print(&expr), "!(Active && Age < 3)");

        let expr = field("Name").to_lower().contains("ann");
        assert_eq!(print(&expr), r#"Name.ToLower().Contains("ann")"#);

        let expr = field("Address.City").starts_with("O");
        assert_eq!(print(&expr), r#"Address.City.StartsWith("O")"#);
    }

    #[test]
    fn test_constants() {
        assert_eq!(print(&lit(2.0)), "2.0");
        assert_eq!(print(&lit(-1.25)), "-1.25");
        assert_eq!(print(&lit(Value::Null)), "null");
        assert_eq!(print(&lit("say \"hi\"\\")), r#""say \"hi\"\\""#);
        assert_eq!(
            print(&lit(Value::List(vec![Value::Int(1), Value::Text("a".into())]))),
            r#"[1, "a"]"#
        );
    }
}
