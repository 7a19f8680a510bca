use crate::{Action, ColumnType, EngineType, Operator, Value, separated_by, writer::Context};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident, $out:ident, $value:expr) => {{
        if $value.is_finite() {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        } else {
            $this.write_value_non_finite($context, $out, $value as f64);
        }
    }};
}

/// Dialect printer converting semantic constructs into concrete SQL strings.
///
/// The default methods produce the PostgreSQL flavour, other dialects override
/// what differs.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn engine_type(&self) -> EngineType;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Emit the next bind parameter marker.
    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('$');
        write_integer!(out, context.counter);
    }

    /// Keyword standing for the primary key of a row being inserted.
    fn primary_key_insert_keyword(&self) -> &'static str {
        "DEFAULT"
    }

    /// Whether several `ALTER TABLE` actions can share one statement.
    fn batches_alterations(&self) -> bool {
        true
    }

    /// Whether the engine can change the type of an existing column.
    fn alters_column_types(&self) -> bool {
        true
    }

    /// Whether `DROP TABLE` accepts `CASCADE`.
    fn drops_cascade(&self) -> bool {
        true
    }

    fn write_column_type(&self, context: &mut Context, out: &mut String, value: &ColumnType) {
        match value {
            ColumnType::Serial => out.push_str("SERIAL"),
            ColumnType::SmallInt => out.push_str("SMALLINT"),
            ColumnType::Integer => out.push_str("INTEGER"),
            ColumnType::BigInt => out.push_str("BIGINT"),
            ColumnType::Real => out.push_str("REAL"),
            ColumnType::DoublePrecision => out.push_str("DOUBLE PRECISION"),
            ColumnType::Numeric(digits) => {
                out.push_str("NUMERIC");
                if let Some((precision, scale)) = digits {
                    let _ = write!(out, "({}, {})", precision, scale);
                }
            }
            ColumnType::Varchar(length) => {
                let _ = write!(out, "VARCHAR({})", length);
            }
            ColumnType::Text => out.push_str("TEXT"),
            ColumnType::Boolean => out.push_str("BOOLEAN"),
            ColumnType::Date => out.push_str("DATE"),
            ColumnType::Time => out.push_str("TIME"),
            ColumnType::Timestamp => out.push_str("TIMESTAMP"),
            ColumnType::Timestamptz => out.push_str("TIMESTAMPTZ"),
            ColumnType::Uuid => out.push_str("UUID"),
            ColumnType::Json => out.push_str("JSON"),
            ColumnType::Bytea => out.push_str("BYTEA"),
            ColumnType::ForeignKey(..) => {
                self.write_column_type(context, out, &ColumnType::Integer)
            }
        }
    }

    fn write_operator(&self, _context: &mut Context, out: &mut String, value: &Operator) {
        out.push_str(match value {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        });
    }

    fn write_action(&self, _context: &mut Context, out: &mut String, value: &Action) {
        out.push_str(match value {
            Action::NoAction => "NO ACTION",
            Action::Restrict => "RESTRICT",
            Action::Cascade => "CASCADE",
            Action::SetNull => "SET NULL",
            Action::SetDefault => "SET DEFAULT",
        });
    }

    /// Query returning a single boolean row telling if the table exists, the
    /// table name is left as a `{}` parameter.
    fn table_exists_template(&self) -> &'static str {
        "SELECT EXISTS(SELECT * FROM information_schema.tables WHERE table_name = {}) AS \"exists\""
    }

    /// Render a concrete value literal.
    fn write_value(&self, context: &mut Context, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(context, out),
            Value::Boolean(Some(v)) => self.write_value_bool(context, out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, context, out, *v),
            Value::Float64(Some(v)) => write_float!(self, context, out, *v),
            Value::Decimal(Some(v)) => drop(write!(out, "{}", v)),
            Value::Varchar(Some(v)) => self.write_value_string(context, out, v),
            Value::Blob(Some(v)) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(Some(v)) => self.write_value_date(context, out, v, false),
            Value::Time(Some(v)) => self.write_value_time(context, out, v, false),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(context, out, v),
            Value::TimestampWithTimezone(Some(v)) => {
                self.write_value_timestamptz(context, out, v)
            }
            Value::Uuid(Some(v)) => drop(write!(out, "'{}'", v)),
            Value::Json(Some(v)) => self.write_value_string(context, out, v),
            Value::List(Some(v), ..) => self.write_value_list(context, out, v),
            _ => self.write_value_none(context, out),
        }
    }

    fn write_value_none(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_value_bool(&self, _context: &mut Context, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    /// Render infinities and NaN as quoted special values.
    fn write_value_non_finite(&self, _context: &mut Context, out: &mut String, value: f64) {
        out.push_str(if value.is_nan() {
            "'NaN'"
        } else if value.is_sign_negative() {
            "'-Infinity'"
        } else {
            "'Infinity'"
        });
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(context, out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        let _ = write!(out, "'\\x{}'", hex::encode(value));
    }

    fn write_value_date(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Date,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Time,
        timestamp: bool,
    ) {
        let mut subsecond = value.nanosecond();
        let mut width = 9;
        while width > 1 && subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}.{:0width$}{b}",
            value.hour(),
            value.minute(),
            value.second(),
            subsecond
        );
    }

    fn write_value_timestamp(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &PrimitiveDateTime,
    ) {
        out.push('\'');
        self.write_value_date(context, out, &value.date(), true);
        out.push('T');
        self.write_value_time(context, out, &value.time(), true);
        out.push('\'');
    }

    fn write_value_timestamptz(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &OffsetDateTime,
    ) {
        let date_time = value.to_utc();
        self.write_value_timestamp(
            context,
            out,
            &PrimitiveDateTime::new(date_time.date(), date_time.time()),
        );
    }

    fn write_value_list(&self, context: &mut Context, out: &mut String, value: &[Value]) {
        out.push_str("ARRAY[");
        separated_by(
            out,
            value,
            |out, v| self.write_value(context, out, v),
            ", ",
        );
        out.push(']');
    }
}

/// PostgreSQL flavoured writer, the default dialect.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
    fn engine_type(&self) -> EngineType {
        EngineType::Postgres
    }
}
