//! Predicate text parser
//!
//! Precedence, loosest first:
//! `||`, `&&`, equality, relational, additive, multiplicative, unary, postfix.
//! An optional lambda header (`x => x.Age > 18`) is accepted; its parameter
//! qualifier is stripped from member paths.

use ck_core::Value;

use crate::expr::{BinaryOp, Expr, Method, UnaryOp, MAX_DEPTH};
use crate::lexer::{Lexer, SyntaxError, Token};

/// Parse predicate text into an unbound expression tree
pub fn parse(text: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(normalize(text)).tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.lambda_header();
    let (expr, _) = parser.expression(1)?;
    parser.finish()?;
    Ok(expr)
}

/// Trim the text and drop one layer of parentheses that encloses all of it
pub fn normalize(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('(') && closing_paren(trimmed) == Some(trimmed.len() - 1) {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Byte index of the parenthesis closing the one at index 0, skipping quoted text
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// An expression and the height of its tree
type Node = (Expr, usize);

/// Magnitude of `i64::MIN`, only valid directly after a unary minus
const MIN_INT_MAGNITUDE: u64 = 1 << 63;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    parameter: Option<String>,
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>) -> Self {
        Self {
            tokens,
            pos: 0,
            parameter: None,
            nesting: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |(_, token)| token)
    }

    fn peek_second(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .map_or(&Token::Eof, |(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(position, _)| *position)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected)))
        }
    }

    fn unexpected(&self, context: &str) -> SyntaxError {
        SyntaxError::new(
            self.position(),
            format!("{}, found {}", context, self.peek()),
        )
    }

    fn too_deep(&self) -> SyntaxError {
        SyntaxError::new(
            self.position(),
            format!("expression nested too deeply (limit {})", MAX_DEPTH),
        )
    }

    /// Run a recursive step one nesting level down
    fn nested<R>(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<R, SyntaxError>,
    ) -> Result<R, SyntaxError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let result = step(self);
        self.nesting -= 1;
        result
    }

    /// Wrap a node one level deeper, rejecting trees past the limit
    fn deeper(&self, expr: Expr, depth: usize) -> Result<Node, SyntaxError> {
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok((expr, depth))
    }

    fn lambda_header(&mut self) {
        if let (Some((_, Token::Ident(name))), Some((_, Token::Arrow))) =
            (self.tokens.first(), self.tokens.get(1))
        {
            self.parameter = Some(name.clone());
            self.pos = 2;
        }
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("expected end of expression")),
        }
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Node, SyntaxError> {
        let (mut left, mut depth) = self.unary()?;

        while let Some(op) = binary_op(self.peek()) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let (right, right_depth) = self.expression(precedence + 1)?;
            (left, depth) = self.deeper(Expr::binary(op, left, right), depth.max(right_depth) + 1)?;
        }

        Ok((left, depth))
    }

    fn unary(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            Token::Bang => {
                self.advance();
                let (operand, depth) = self.nested(Self::unary)?;
                self.deeper(!operand, depth + 1)
            }
            Token::Minus => {
                self.advance();
                if *self.peek() == Token::Int(MIN_INT_MAGNITUDE) && *self.peek_second() != Token::Dot {
                    self.advance();
                    return Ok((Expr::Constant(Value::Int(i64::MIN)), 1));
                }
                let (operand, depth) = self.nested(Self::unary)?;
                match operand {
                    Expr::Constant(Value::Int(i)) if i != i64::MIN => {
                        Ok((Expr::Constant(Value::Int(-i)), depth))
                    }
                    Expr::Constant(Value::Float(x)) => Ok((Expr::Constant(Value::Float(-x)), depth)),
                    operand => self.deeper(
                        Expr::Unary {
                            op: UnaryOp::Negate,
                            operand: Box::new(operand),
                        },
                        depth + 1,
                    ),
                }
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Node, SyntaxError> {
        let (mut expr, mut depth) = self.primary()?;

        while *self.peek() == Token::Dot {
            self.advance();
            let position = self.position();
            let name = match self.advance() {
                Token::Ident(name) => name,
                other => {
                    return Err(SyntaxError::new(
                        position,
                        format!("expected member name after '.', found {}", other),
                    ))
                }
            };

            if *self.peek() == Token::LParen {
                let method = Method::from_name(&name).ok_or_else(|| {
                    SyntaxError::new(position, format!("unsupported method '{}'", name))
                })?;
                let (args, args_depth) = self.nested(Self::arguments)?;
                (expr, depth) = self.deeper(Expr::call(expr, method, args), depth.max(args_depth) + 1)?;
            } else {
                match &mut expr {
                    Expr::Member(path) => path.push(name),
                    _ => {
                        return Err(SyntaxError::new(
                            position,
                            format!("member '{}' can only be accessed on a property", name),
                        ))
                    }
                }
            }
        }

        Ok((expr, depth))
    }

    /// Call arguments and the depth of the deepest one
    fn arguments(&mut self) -> Result<(Vec<Expr>, usize), SyntaxError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        let mut deepest = 0;
        if *self.peek() == Token::RParen {
            self.advance();
            return Ok((args, deepest));
        }
        loop {
            let (arg, depth) = self.expression(1)?;
            args.push(arg);
            deepest = deepest.max(depth);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => return Ok((args, deepest)),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("expected ',' or ')'"));
                }
            }
        }
    }

    fn list(&mut self) -> Result<Node, SyntaxError> {
        let mut items = Vec::new();
        if *self.peek() == Token::RBracket {
            self.advance();
            return Ok((Expr::Constant(Value::List(items)), 1));
        }
        loop {
            let position = self.position();
            match self.unary()? {
                (Expr::Constant(value), _) => items.push(value),
                _ => {
                    return Err(SyntaxError::new(
                        position,
                        "list literals may only contain constants",
                    ))
                }
            }
            match self.advance() {
                Token::Comma => continue,
                Token::RBracket => return Ok((Expr::Constant(Value::List(items)), 1)),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("expected ',' or ']'"));
                }
            }
        }
    }

    fn primary(&mut self) -> Result<Node, SyntaxError> {
        let position = self.position();
        let constant = |value: Value| -> Result<Node, SyntaxError> { Ok((Expr::Constant(value), 1)) };
        match self.advance() {
            Token::Int(n) => match i64::try_from(n) {
                Ok(i) => constant(Value::Int(i)),
                Err(_) => Err(SyntaxError::new(
                    position,
                    format!("integer '{}' is too large", n),
                )),
            },
            Token::Float(x) => constant(Value::Float(x)),
            Token::Str(s) => constant(Value::Text(s)),
            Token::True => constant(Value::Bool(true)),
            Token::False => constant(Value::Bool(false)),
            Token::Null => constant(Value::Null),
            Token::LParen => self.nested(|parser| {
                let inner = parser.expression(1)?;
                parser.expect(Token::RParen)?;
                Ok(inner)
            }),
            Token::LBracket => self.nested(Self::list),
            Token::Ident(name) => {
                if self.parameter.as_deref() == Some(name.as_str()) {
                    if *self.peek() != Token::Dot {
                        return Err(SyntaxError::new(
                            position,
                            format!("parameter '{}' cannot be used as a value", name),
                        ));
                    }
                    self.advance();
                    match self.advance() {
                        Token::Ident(member) => Ok((Expr::Member(vec![member]), 1)),
                        _ => {
                            self.pos -= 1;
                            Err(self.unexpected("expected member name"))
                        }
                    }
                } else {
                    Ok((Expr::Member(vec![name]), 1))
                }
            }
            Token::Eof => Err(SyntaxError::new(position, "unexpected end of input")),
            other => Err(SyntaxError::new(
                position,
                format!("unexpected {}", other),
            )),
        }
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::OrOr => BinaryOp::Or,
        Token::AndAnd => BinaryOp::And,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, lit};
    use crate::printer::print;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse(r#"Age > 18 && Name == "John""#).unwrap();
        assert_eq!(expr, field("Age").gt(18).and(field("Name").equals("John")));
    }

    #[test]
    fn test_lambda_header_and_outer_parens_are_normalized() {
        let expected = field("Age").gt(18).and(field("Name").equals("John"));
        for text in [
            "x => x.Age > 18 && x.Name == 'John'",
            "(Age > 18 && Name == \"John\")",
            "  Age > 18 AndAlso Name == 'John'  ",
        ] {
            assert_eq!(parse(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn test_normalize_keeps_non_enclosing_parens() {
        assert_eq!(normalize(" (A) && (B) "), "(A) && (B)");
        assert_eq!(normalize("((A == 1))"), "(A == 1)");
        assert_eq!(normalize("(Name == ')')"), "Name == ')'");
    }

    #[test]
    fn test_precedence() {
        let expr = parse("A == 1 || B == 2 && C == 3").unwrap();
        assert_eq!(
            expr,
            field("A").equals(1).or(field("B").equals(2).and(field("C").equals(3)))
        );

        let expr = parse("A + 2 * 3 > 10").unwrap();
        assert_eq!(expr, field("A").plus(lit(2).times(3)).gt(10));
    }

    #[test]
    fn test_methods_and_nested_members() {
        let expr = parse("x => x.Address.City.ToLower().StartsWith('os')").unwrap();
        assert_eq!(expr, field("Address.City").to_lower().starts_with("os"));
    }

    #[test]
    fn test_unary_and_negative_literals() {
        assert_eq!(parse("Score > -1.5").unwrap(), field("Score").gt(-1.5));
        assert_eq!(parse("!Active").unwrap(), !field("Active"));
        assert_eq!(parse("not (Age < 3)").unwrap(), !field("Age").lt(3));
    }

    #[test]
    fn test_list_literal() {
        let expr = parse("[1, 2, 3].Contains(Age)").unwrap();
        assert_eq!(
            expr,
            lit(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])).contains(field("Age"))
        );
    }

    #[test]
    fn test_print_parse_round_trip() {
        let samples = vec![
            field("Age").gt(18).and(field("Name").equals("John")),
            field("A").minus(field("B").minus(field("C"))).equals(0),
            !field("Active").or(field("Email").equals(Value::Null)),
            field("Tags").contains("vip").and(field("Score").le(4.0)),
        ];
        for expr in samples {
            assert_eq!(parse(&print(&expr)).unwrap(), expr);
        }
    }

    #[test]
    fn test_min_integer_round_trips() {
        let expr = field("Age").gt(i64::MIN);
        assert_eq!(print(&expr), "Age > -9223372036854775808");
        assert_eq!(parse(&print(&expr)).unwrap(), expr);

        assert!(parse("Age > 9223372036854775808").is_err());
        assert_eq!(parse("Age > -9223372036854775807").unwrap(), field("Age").gt(-i64::MAX));
        assert_eq!(
            parse("Age > --9223372036854775808").unwrap(),
            field("Age").gt(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(lit(i64::MIN)),
            })
        );
    }

    #[test]
    fn test_nesting_limit() {
        for text in [
            format!("{}Active", "!".repeat(20_000)),
            format!("{}Active{}", "(".repeat(20_000), ")".repeat(20_000)),
            format!("{}1", "-".repeat(20_000)),
            format!("{}1{}", "[".repeat(20_000), "]".repeat(20_000)),
            format!("Name{}", ".Trim()".repeat(20_000)),
            vec!["Age > 1"; 20_000].join(" || "),
        ] {
            let err = parse(&text).unwrap_err();
            assert!(err.message.contains("nested too deeply"), "{}", err.message);
        }

        let shallow = format!("{}Active", "!".repeat(100));
        assert_eq!(parse(&shallow).unwrap().depth(), 101);
    }

    #[test]
    fn test_syntax_errors() {
        for text in ["Age >", "Age > 18 &&", "(Age > 1", "Age > 18)", "x => x", "Name.Substring(1)", ""] {
            assert!(parse(text).is_err(), "{text}");
        }
        let err = parse("Age > > 3").unwrap_err();
        assert_eq!(err.position, 6);
    }
}
