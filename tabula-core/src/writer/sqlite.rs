use crate::{ColumnType, EngineType, Operator, SqlWriter, writer::Context};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter;

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn engine_type(&self) -> EngineType {
        EngineType::Sqlite
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('?');
    }

    fn primary_key_insert_keyword(&self) -> &'static str {
        "NULL"
    }

    fn batches_alterations(&self) -> bool {
        false
    }

    fn alters_column_types(&self) -> bool {
        false
    }

    fn drops_cascade(&self) -> bool {
        false
    }

    fn write_column_type(&self, context: &mut Context, out: &mut String, value: &ColumnType) {
        match value {
            ColumnType::Serial => out.push_str("INTEGER"),
            ColumnType::Timestamptz => out.push_str("TIMESTAMP"),
            ColumnType::Uuid | ColumnType::Json => out.push_str("TEXT"),
            ColumnType::Bytea => out.push_str("BLOB"),
            _ => {
                // Shared with the generic dialect
                crate::GenericSqlWriter.write_column_type(context, out, value)
            }
        }
    }

    fn write_operator(&self, context: &mut Context, out: &mut String, value: &Operator) {
        match value {
            // LIKE is already case insensitive for ASCII
            Operator::ILike => out.push_str("LIKE"),
            _ => crate::GenericSqlWriter.write_operator(context, out, value),
        }
    }

    fn table_exists_template(&self) -> &'static str {
        "SELECT EXISTS(SELECT * FROM sqlite_master WHERE type = 'table' AND name = {}) AS \"exists\""
    }

    fn write_value_bool(&self, _context: &mut Context, out: &mut String, value: bool) {
        out.push(['0', '1'][value as usize]);
    }

    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        let _ = write!(out, "X'{}'", hex::encode_upper(value));
    }
}
