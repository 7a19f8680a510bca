use crate::{
    Arg, Column, Context, Error, Operand, Operator, QueryString, Result, SqlWriter,
};
use std::ops::{BitAnd, BitOr};

/// Boolean filter tree used by `WHERE` clauses.
///
/// Built from column predicates (`band.column("name")?.eq("Pythonistas")`) and
/// combined with `&` and `|`.
#[derive(Debug, Clone)]
pub enum Condition {
    Where {
        column: Column,
        operator: Operator,
        operand: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    /// Hand written SQL with its own arguments.
    Raw(QueryString),
}

impl Condition {
    pub fn raw(query: QueryString) -> Self {
        Condition::Raw(query)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Every column the condition reads, in textual order.
    pub fn columns(&self) -> Vec<&Column> {
        let mut result = Vec::new();
        self.collect_columns(&mut result);
        result
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a Column>) {
        match self {
            Condition::Where { column, .. } => out.push(column),
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
            Condition::Raw(..) => {}
        }
    }

    pub fn has_chained_columns(&self) -> bool {
        self.columns().iter().any(|c| c.is_chained())
    }

    pub fn querystring(&self, writer: &dyn SqlWriter, qualify_columns: bool) -> Result<QueryString> {
        match self {
            Condition::Where {
                column,
                operator,
                operand,
            } => {
                let mut context = Context::new(qualify_columns);
                let mut template = String::with_capacity(32);
                column.write_name(writer, &mut context, &mut template);
                template.push(' ');
                writer.write_operator(&mut context, &mut template, operator);
                match operand {
                    Operand::None => QueryString::new(template, []),
                    Operand::Value(value) => {
                        template.push_str(" {}");
                        QueryString::new(template, [Arg::Value(value.clone())])
                    }
                    Operand::List(values) => {
                        if values.is_empty() {
                            return Err(Error::Usage(format!(
                                "The list of values compared with {} is empty",
                                column.path()
                            )));
                        }
                        template.push_str(" (");
                        template.push_str(&vec!["{}"; values.len()].join(", "));
                        template.push(')');
                        QueryString::new(template, values.iter().cloned().map(Arg::Value))
                    }
                }
            }
            Condition::And(lhs, rhs) => QueryString::new(
                "({} AND {})",
                [
                    Arg::Nested(lhs.querystring(writer, qualify_columns)?),
                    Arg::Nested(rhs.querystring(writer, qualify_columns)?),
                ],
            ),
            Condition::Or(lhs, rhs) => QueryString::new(
                "({} OR {})",
                [
                    Arg::Nested(lhs.querystring(writer, qualify_columns)?),
                    Arg::Nested(rhs.querystring(writer, qualify_columns)?),
                ],
            ),
            Condition::Raw(query) => Ok(query.clone()),
        }
    }
}

impl BitAnd for Condition {
    type Output = Condition;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Condition {
    type Output = Condition;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}
