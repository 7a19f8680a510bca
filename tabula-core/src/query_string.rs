use crate::{Context, Error, GenericSqlWriter, Result, SqlWriter, Value, truncate_long};
use std::{
    fmt::{self, Display},
    mem,
    sync::Arc,
};

/// Text spliced verbatim into the rendered SQL, never bound as a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unquoted(pub String);

impl From<&str> for Unquoted {
    fn from(value: &str) -> Self {
        Unquoted(value.into())
    }
}

impl From<String> for Unquoted {
    fn from(value: String) -> Self {
        Unquoted(value)
    }
}

/// What fills a `{}` slot of a [`QueryString`].
#[derive(Debug, Clone)]
pub enum Arg {
    /// Bound as a parameter.
    Value(Value),
    /// Inserted as raw text.
    Unquoted(Unquoted),
    /// Rendered in place, its own args join the parameter list.
    Nested(QueryString),
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Unquoted> for Arg {
    fn from(value: Unquoted) -> Self {
        Arg::Unquoted(value)
    }
}

impl From<QueryString> for Arg {
    fn from(value: QueryString) -> Self {
        Arg::Nested(value)
    }
}

/// SQL ready to hand to an engine: text with dialect placeholders and the
/// values bound to them, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Display for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// A SQL template with `{}` slots and one [`Arg`] per slot.
///
/// Query strings nest: a slot can hold another query string, which is
/// rendered in place when the outer one is compiled. Compilation walks the
/// tree depth first so placeholders are numbered in textual order across the
/// whole statement. `{{` and `}}` stand for literal braces.
///
/// Cloning is cheap, the template and arguments are shared.
#[derive(Debug, Clone)]
pub struct QueryString {
    template: Arc<str>,
    segments: Arc<[String]>,
    args: Arc<[Arg]>,
}

impl QueryString {
    /// Build from a template and its arguments, the number of `{}` slots must
    /// match the number of arguments.
    pub fn new(template: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Result<Self> {
        let template = template.into();
        let segments = parse_template(&template)?;
        let args: Arc<[Arg]> = args.into_iter().collect();
        if segments.len() - 1 != args.len() {
            return Err(Error::Usage(format!(
                "The template `{}` has {} placeholders but {} arguments were given",
                truncate_long!(template),
                segments.len() - 1,
                args.len(),
            )));
        }
        Ok(Self {
            template: template.into(),
            segments: segments.into(),
            args,
        })
    }

    /// Plain SQL without any slot, braces are taken literally.
    pub fn text(sql: impl AsRef<str>) -> Self {
        let sql = sql.as_ref();
        Self {
            template: escape_braces(sql).into(),
            segments: Arc::new([sql.to_owned()]),
            args: Arc::new([]),
        }
    }

    /// Join several query strings into one, keeping their arguments.
    pub fn join(parts: impl IntoIterator<Item = QueryString>, separator: &str) -> Self {
        let args: Arc<[Arg]> = parts.into_iter().map(Arg::Nested).collect();
        if args.is_empty() {
            return Self::text("");
        }
        let mut segments = Vec::with_capacity(args.len() + 1);
        segments.push(String::new());
        segments.extend((1..args.len()).map(|_| separator.to_owned()));
        segments.push(String::new());
        Self {
            template: vec!["{}"; args.len()].join(&escape_braces(separator)).into(),
            segments: segments.into(),
            args,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.segments.iter().all(String::is_empty)
    }

    /// Render for the given dialect.
    pub fn compile(&self, writer: &dyn SqlWriter) -> Compiled {
        let mut context = Context::default();
        let mut result = Compiled {
            sql: String::with_capacity(self.template.len() + 16),
            values: Vec::new(),
        };
        self.write_query(writer, &mut context, &mut result.sql, &mut result.values);
        result
    }

    /// Render into `out`, appending bound values to `values`.
    pub fn write_query(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        values: &mut Vec<Value>,
    ) {
        let mut segments = self.segments.iter();
        if let Some(first) = segments.next() {
            out.push_str(first);
        }
        for (arg, segment) in self.args.iter().zip(segments) {
            match arg {
                Arg::Value(value) if context.inline_values => {
                    writer.write_value(context, out, value)
                }
                Arg::Value(value) => {
                    writer.write_placeholder(context, out);
                    values.push(value.clone());
                }
                Arg::Unquoted(Unquoted(text)) => out.push_str(text),
                Arg::Nested(nested) => nested.write_query(writer, context, out, values),
            }
            out.push_str(segment);
        }
    }

    /// Every bound value, in placeholder order.
    pub fn bind_values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        self.collect_values(&mut values);
        values
    }

    fn collect_values(&self, values: &mut Vec<Value>) {
        for arg in self.args.iter() {
            match arg {
                Arg::Value(value) => values.push(value.clone()),
                Arg::Unquoted(..) => {}
                Arg::Nested(nested) => nested.collect_values(values),
            }
        }
    }
}

impl Display for QueryString {
    /// Values are written inline, useful for logs and debugging only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut context = Context::inlined();
        let mut out = String::new();
        self.write_query(&GenericSqlWriter, &mut context, &mut out, &mut Vec::new());
        f.write_str(&out)
    }
}

impl PartialEq for QueryString {
    fn eq(&self, other: &Self) -> bool {
        self.compile(&GenericSqlWriter) == other.compile(&GenericSqlWriter)
    }
}

/// Double the braces so that `text` survives as a template.
pub fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

fn parse_template(template: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = template.chars();
    let malformed = |brace: char| {
        Error::Usage(format!(
            "Unmatched `{brace}` in template `{}`",
            truncate_long!(template)
        ))
    };
    while let Some(c) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some('{') => current.push('{'),
                Some('}') => segments.push(mem::take(&mut current)),
                _ => return Err(malformed('{')),
            },
            '}' => match chars.next() {
                Some('}') => current.push('}'),
                _ => return Err(malformed('}')),
            },
            c => current.push(c),
        }
    }
    segments.push(current);
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteSqlWriter;

    #[test]
    fn placeholders_numbered_depth_first() {
        let inner = QueryString::new("b = {}", [Arg::value(2)]).unwrap();
        let outer = QueryString::new(
            "SELECT {} WHERE a = {} AND {} AND c = {}",
            [
                Arg::Unquoted("*".into()),
                Arg::value(1),
                Arg::Nested(inner),
                Arg::value(3),
            ],
        )
        .unwrap();
        let compiled = outer.compile(&GenericSqlWriter);
        assert_eq!(
            compiled.sql,
            "SELECT * WHERE a = $1 AND b = $2 AND c = $3"
        );
        assert_eq!(
            compiled.values,
            [Value::Int32(Some(1)), Value::Int32(Some(2)), Value::Int32(Some(3))]
        );
        assert_eq!(outer.bind_values(), compiled.values);
        let compiled = outer.compile(&SqliteSqlWriter);
        assert_eq!(compiled.sql, "SELECT * WHERE a = ? AND b = ? AND c = ?");
        assert_eq!(compiled.sql.matches('?').count(), compiled.values.len());
    }

    #[test]
    fn argument_count_must_match() {
        assert!(matches!(
            QueryString::new("a = {} AND b = {}", [Arg::value(1)]),
            Err(Error::Usage(..))
        ));
        assert!(matches!(
            QueryString::new("a = {", []),
            Err(Error::Usage(..))
        ));
        assert!(QueryString::new("json = '{{}}'", []).is_ok());
    }

    #[test]
    fn text_keeps_braces() {
        let query = QueryString::text("SELECT '{}'");
        assert_eq!(query.template(), "SELECT '{{}}'");
        assert_eq!(query.compile(&GenericSqlWriter).sql, "SELECT '{}'");
        assert!(query.bind_values().is_empty());
    }

    #[test]
    fn join_keeps_arguments() {
        let joined = QueryString::join(
            [
                QueryString::new("a = {}", [Arg::value("x")]).unwrap(),
                QueryString::text("b IS NULL"),
                QueryString::new("c = {}", [Arg::value(true)]).unwrap(),
            ],
            " AND ",
        );
        let compiled = joined.compile(&GenericSqlWriter);
        assert_eq!(compiled.sql, "a = $1 AND b IS NULL AND c = $2");
        assert_eq!(compiled.values.len(), 2);
        assert!(QueryString::join([], ", ").is_empty());
    }

    #[test]
    fn display_inlines_values() {
        let query = QueryString::new(
            "UPDATE \"band\" SET name = {} WHERE popularity > {}",
            [Arg::value("Pythonistas"), Arg::value(1000i64)],
        )
        .unwrap();
        assert_eq!(
            query.to_string(),
            "UPDATE \"band\" SET name = 'Pythonistas' WHERE popularity > 1000"
        );
    }
}
