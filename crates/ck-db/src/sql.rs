//! SQL rendering of plans
//!
//! Translates a [`Queryable`] into a parameterized PostgreSQL statement.
//! Predicates become the WHERE clause (one condition per predicate, joined
//! with AND), sort keys become ORDER BY, and paging becomes LIMIT/OFFSET.
//! Constants are always bound as `$n` parameters.
//!
//! Only columns of the entity's own table can be rendered. Paths through
//! navigations or value objects are rejected; include paths are loaded by the
//! provider with follow-up statements and are not part of the output.

use ck_core::{ElementType, Entity, PropertyType, QsError, QsResult, Value};
use ck_queries::compile::resolve_path;
use ck_queries::{BinaryOp, Expr, Method, Queryable, SortDirection, SortKey, UnaryOp};

/// A statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Renders plans for one entity type
pub struct SqlRenderer;

impl SqlRenderer {
    /// `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT $n] [OFFSET $m]`
    pub fn select<T: Entity>(plan: &Queryable<T>) -> QsResult<SqlStatement> {
        let mut params = Params::default();
        let columns = Self::columns::<T>();
        let where_clause = Self::build_where_clause::<T>(plan, &mut params)?;
        let order_clause = Self::build_order_clause::<T>(plan.ordering())?;

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), T::TABLE_NAME);
        if !where_clause.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }
        if !order_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&order_clause);
        }
        if let Some(limit) = plan.limit() {
            let placeholder = params.bind(Value::Int(limit as i64));
            sql.push_str(&format!(" LIMIT {}", placeholder));
        }
        if let Some(offset) = plan.offset() {
            let placeholder = params.bind(Value::Int(offset as i64));
            sql.push_str(&format!(" OFFSET {}", placeholder));
        }

        tracing::trace!(entity = T::TYPE_NAME, sql = %sql, "Rendered select statement");
        Ok(SqlStatement {
            sql,
            params: params.values,
        })
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE ..]`; ordering and paging are ignored
    pub fn count<T: Entity>(plan: &Queryable<T>) -> QsResult<SqlStatement> {
        let mut params = Params::default();
        let where_clause = Self::build_where_clause::<T>(plan, &mut params)?;

        let mut sql = format!("SELECT COUNT(*) FROM {}", T::TABLE_NAME);
        if !where_clause.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }
        Ok(SqlStatement {
            sql,
            params: params.values,
        })
    }

    /// Readable columns stored on the entity's own table
    fn columns<T: Entity>() -> Vec<String> {
        T::properties()
            .iter()
            .filter(|p| p.readable && stored_inline(&p.ty))
            .map(|p| column_name(p.name))
            .collect()
    }

    fn build_where_clause<T: Entity>(plan: &Queryable<T>, params: &mut Params) -> QsResult<String> {
        let mut conditions = Vec::new();
        for predicate in plan.predicates() {
            let mut writer = ExprWriter::<T>::new(params);
            conditions.push(writer.operand(predicate.expr(), BinaryOp::And.precedence())?);
        }
        Ok(conditions.join(" AND "))
    }

    fn build_order_clause<T: Entity>(ordering: &[SortKey]) -> QsResult<String> {
        if ordering.is_empty() {
            return Ok(String::new());
        }
        let parts = ordering
            .iter()
            .map(sort_to_sql::<T>)
            .collect::<QsResult<Vec<_>>>()?;
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

/// Nulls sort first ascending, matching in-memory evaluation
fn sort_to_sql<T: Entity>(key: &SortKey) -> QsResult<String> {
    let column = column_for::<T>(&key.path)?.0;
    Ok(match key.direction {
        SortDirection::Asc => format!("{} ASC NULLS FIRST", column),
        SortDirection::Desc => format!("{} DESC NULLS LAST", column),
    })
}

#[derive(Default)]
struct Params {
    values: Vec<Value>,
}

impl Params {
    fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }
}

struct ExprWriter<'p, T> {
    params: &'p mut Params,
    _entity: std::marker::PhantomData<fn() -> T>,
}

impl<'p, T: Entity> ExprWriter<'p, T> {
    fn new(params: &'p mut Params) -> Self {
        Self {
            params,
            _entity: std::marker::PhantomData,
        }
    }

    /// Render `expr`, parenthesized if it binds looser than `min_precedence`
    fn operand(&mut self, expr: &Expr, min_precedence: u8) -> QsResult<String> {
        let sql = self.expr(expr)?;
        Ok(match expr {
            Expr::Binary { op, .. } if sql_precedence(*op) < min_precedence => format!("({})", sql),
            _ => sql,
        })
    }

    fn expr(&mut self, expr: &Expr) -> QsResult<String> {
        match expr {
            Expr::Constant(Value::Null) => Ok("NULL".to_string()),
            Expr::Constant(Value::List(_) | Value::Object(_)) => Err(QsError::Validation(
                "list and object constants can only appear as the target of Contains".to_string(),
            )),
            Expr::Constant(value) => Ok(self.params.bind(value.clone())),
            Expr::Member(path) => Ok(column_for::<T>(path)?.0),
            Expr::Unary { op, operand } => {
                let inner = self.expr(operand)?;
                Ok(match (op, operand.as_ref()) {
                    // Comparisons are two-valued in memory, so an unknown result negates to true
                    (UnaryOp::Not, Expr::Binary { op, .. }) if op.is_logical() || op.is_comparison() => {
                        format!("NOT COALESCE({}, FALSE)", inner)
                    }
                    (UnaryOp::Not, Expr::Binary { .. }) => format!("NOT ({})", inner),
                    (UnaryOp::Not, _) => format!("NOT {}", inner),
                    (UnaryOp::Negate, Expr::Binary { .. }) => format!("-({})", inner),
                    (UnaryOp::Negate, _) => format!("-{}", inner),
                })
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Call {
                target,
                method,
                args,
            } => self.call(target, *method, args),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> QsResult<String> {
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let other = match (left, right) {
                (other, Expr::Constant(Value::Null)) | (Expr::Constant(Value::Null), other) => {
                    Some(other)
                }
                _ => None,
            };
            if let Some(other) = other {
                let keyword = if op == BinaryOp::Eq { "IS NULL" } else { "IS NOT NULL" };
                let operand = self.operand(other, sql_precedence(op) + 1)?;
                return Ok(format!("{} {}", operand, keyword));
            }
        }

        // Null-safe equality unless one side is a constant, where `=` already rejects null
        let operator = match op {
            BinaryOp::Ne => "IS DISTINCT FROM",
            BinaryOp::Eq if !is_constant(left) && !is_constant(right) => "IS NOT DISTINCT FROM",
            op => sql_operator(op),
        };

        let precedence = sql_precedence(op);
        // Comparisons do not associate in PostgreSQL
        let left_min = if op.is_comparison() { precedence + 1 } else { precedence };
        let left = self.operand(left, left_min)?;
        let right = self.operand(right, precedence + 1)?;
        Ok(format!("{} {} {}", left, operator, right))
    }

    fn call(&mut self, target: &Expr, method: Method, args: &[Expr]) -> QsResult<String> {
        match method {
            Method::ToLower => Ok(format!("LOWER({})", self.expr(target)?)),
            Method::ToUpper => Ok(format!("UPPER({})", self.expr(target)?)),
            Method::Trim => Ok(format!("TRIM({})", self.expr(target)?)),
            Method::Contains | Method::StartsWith | Method::EndsWith => {
                let arg = args.first().ok_or_else(|| {
                    QsError::Validation(format!("{} requires an argument", method.name()))
                })?;
                self.pattern_call(target, method, arg)
            }
        }
    }

    fn pattern_call(&mut self, target: &Expr, method: Method, arg: &Expr) -> QsResult<String> {
        if method == Method::Contains {
            // Membership in a constant list
            if let Expr::Constant(Value::List(items)) = target {
                if items.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let needle = self.operand(arg, u8::MAX)?;
                let placeholders: Vec<String> =
                    items.iter().map(|item| self.params.bind(item.clone())).collect();
                return Ok(format!("{} IN ({})", needle, placeholders.join(", ")));
            }
            // Membership in an array column
            if let Expr::Member(path) = target {
                if let (column, PropertyType::Collection(_)) = column_for::<T>(path)? {
                    let needle = self.operand(arg, u8::MAX)?;
                    return Ok(format!("{} = ANY({})", needle, column));
                }
            }
        }

        let subject = self.operand(target, u8::MAX)?;
        let pattern = match arg {
            Expr::Constant(Value::Text(text)) => {
                let escaped = escape_like(text);
                self.params.bind(Value::Text(match method {
                    Method::StartsWith => format!("{}%", escaped),
                    Method::EndsWith => format!("%{}", escaped),
                    _ => format!("%{}%", escaped),
                }))
            }
            other => {
                let inner = self.operand(other, u8::MAX)?;
                match method {
                    Method::StartsWith => format!("({} || '%')", inner),
                    Method::EndsWith => format!("('%' || {})", inner),
                    _ => format!("('%' || {} || '%')", inner),
                }
            }
        };
        Ok(format!("{} LIKE {} ESCAPE '\\'", subject, pattern))
    }
}

fn sql_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 3,
        BinaryOp::Add | BinaryOp::Sub => 4,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 5,
    }
}

fn sql_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "OR",
        BinaryOp::And => "AND",
        BinaryOp::Eq => "=",
        other => other.symbol(),
    }
}

fn is_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(_))
}

/// Scalars, text and collections of primitives live on the entity's table
fn stored_inline(ty: &PropertyType) -> bool {
    match ty {
        PropertyType::Scalar(_) | PropertyType::Text => true,
        PropertyType::Collection(ElementType::Scalar(_) | ElementType::Text) => true,
        PropertyType::Collection(ElementType::Object(_)) | PropertyType::Object(_) => false,
    }
}

fn column_for<T: Entity>(path: &[String]) -> QsResult<(String, PropertyType)> {
    let (canonical, ty) = resolve_path::<T>(path)?;
    if canonical.len() != 1 || !stored_inline(&ty) {
        return Err(QsError::Validation(format!(
            "{} on {} is not a column of {}",
            canonical.join("."),
            T::TYPE_NAME,
            T::TABLE_NAME
        )));
    }
    Ok((column_name(&canonical[0]), ty))
}

/// Convert a property name to its column name (`DeletedAt` -> `deleted_at`)
pub fn column_name(property: &str) -> String {
    let mut column = String::with_capacity(property.len() + 4);
    let mut prev_lower = false;
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                column.push('_');
            }
            column.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            column.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    column
}

/// Escape string for LIKE patterns
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
