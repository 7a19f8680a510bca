use crate::{
    Arg, ColumnDef, ColumnDefault, ColumnType, Condition, Context, Error, ForeignKey, Operand, Operator, Order,
    Ordered, QueryString, Registry, Result, SqlWriter, Table, Unquoted, Value,
};
use std::{
    fmt::{self, Debug},
    sync::{Arc, Weak},
};

/// Immutable part of a column, shared by every handle to it.
#[derive(Debug)]
struct ColumnMeta {
    name: String,
    tablename: String,
    table: Weak<Table>,
    def: ColumnDef,
    primary_key: bool,
}

/// One foreign key traversed to reach a column of another table.
#[derive(Clone)]
pub struct ForeignKeyHop {
    /// The foreign key column, without a chain of its own.
    pub foreign_key: Column,
    /// Table the foreign key points to.
    pub target: Arc<Table>,
}

impl Debug for ForeignKeyHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKeyHop")
            .field("foreign_key", &self.foreign_key.name())
            .field("target", &self.target.tablename())
            .finish()
    }
}

/// Column attached to a table.
///
/// Cloning is cheap. A column reached through foreign keys (`band.manager.name`)
/// carries the hops in its call chain, queries turn that chain into joins.
#[derive(Clone)]
pub struct Column {
    meta: Arc<ColumnMeta>,
    call_chain: Vec<ForeignKeyHop>,
}

impl Column {
    pub(crate) fn stamp(
        name: impl Into<String>,
        def: ColumnDef,
        table: Weak<Table>,
        tablename: &str,
        primary_key: bool,
    ) -> Self {
        Self {
            meta: Arc::new(ColumnMeta {
                name: name.into(),
                tablename: tablename.into(),
                table,
                def,
                primary_key,
            }),
            call_chain: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }
    pub fn tablename(&self) -> &str {
        &self.meta.tablename
    }
    /// Owning table, `None` only while it is being dropped.
    pub fn table(&self) -> Option<Arc<Table>> {
        self.meta.table.upgrade()
    }
    pub fn def(&self) -> &ColumnDef {
        &self.meta.def
    }
    pub fn column_type(&self) -> &ColumnType {
        &self.meta.def.column_type
    }
    pub fn is_primary_key(&self) -> bool {
        self.meta.primary_key
    }
    pub fn is_nullable(&self) -> bool {
        self.meta.def.null
    }
    pub fn is_unique(&self) -> bool {
        self.meta.def.unique
    }
    pub fn has_default(&self) -> bool {
        self.meta.def.default.is_some()
    }
    /// Evaluate the default, `Value::Null` when there is none.
    pub fn default_value(&self) -> Value {
        self.meta.def.default_value()
    }
    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.meta.def.foreign_key_def()
    }
    pub fn call_chain(&self) -> &[ForeignKeyHop] {
        &self.call_chain
    }
    pub fn is_chained(&self) -> bool {
        !self.call_chain.is_empty()
    }

    /// Same declared column, regardless of the path used to reach it.
    pub fn same_column(&self, other: &Column) -> bool {
        Arc::ptr_eq(&self.meta, &other.meta)
    }

    /// Table the call chain starts from, the owning table when unchained.
    pub fn root_table(&self) -> Option<Arc<Table>> {
        match self.call_chain.first() {
            Some(hop) => hop.foreign_key.table(),
            None => self.table(),
        }
    }

    /// This column without any call chain.
    pub fn unchained(&self) -> Column {
        Column {
            meta: self.meta.clone(),
            call_chain: Vec::new(),
        }
    }

    fn registry(&self) -> Result<Arc<Registry>> {
        self.table()
            .ok_or_else(|| {
                Error::Resolution(format!(
                    "The table `{}` owning column `{}` was dropped",
                    self.tablename(),
                    self.name()
                ))
            })?
            .registry()
    }

    /// Table this foreign key points to.
    pub fn referenced_table(&self) -> Result<Arc<Table>> {
        let Some(fk) = self.foreign_key() else {
            return Err(Error::Usage(format!(
                "{} isn't a ForeignKey",
                self.name()
            )));
        };
        fk.references.resolve(&self.registry()?)
    }

    /// Follow this foreign key to the column `name` of the referenced table.
    pub fn join(&self, name: &str) -> Result<Column> {
        let target = self.referenced_table()?;
        let mut column = target.get_column_by_name(name)?;
        column.call_chain = self.call_chain.clone();
        column.call_chain.push(ForeignKeyHop {
            foreign_key: self.unchained(),
            target,
        });
        Ok(column)
    }

    /// Alias of the table instance this column is read from, the hops are
    /// appended to the root table name with `$`.
    pub fn table_alias(&self) -> String {
        let Some(first) = self.call_chain.first() else {
            return self.tablename().to_owned();
        };
        let mut alias = first.foreign_key.tablename().to_owned();
        for hop in &self.call_chain {
            alias.push('$');
            alias.push_str(hop.foreign_key.name());
        }
        alias
    }

    /// Dotted path from the root table, like `manager.name`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for hop in &self.call_chain {
            path.push_str(hop.foreign_key.name());
            path.push('.');
        }
        path.push_str(self.name());
        path
    }

    /// Write the column name, prefixed by its table alias when columns are qualified.
    pub fn write_name(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        if context.qualify_columns {
            writer.write_identifier_quoted(context, out, &self.table_alias());
            out.push('.');
        }
        out.push_str(self.name());
    }

    pub fn sql_name(&self, writer: &dyn SqlWriter, qualify_columns: bool) -> String {
        let mut out = String::new();
        self.write_name(writer, &mut Context::new(qualify_columns), &mut out);
        out
    }

    /// Column definition as it appears in `CREATE TABLE` and `ADD COLUMN`.
    pub fn definition(&self, writer: &dyn SqlWriter) -> Result<QueryString> {
        let mut context = Context::default();
        let mut out = String::with_capacity(64);
        out.push_str(self.name());
        out.push(' ');
        writer.write_column_type(&mut context, &mut out, self.column_type());
        if self.is_primary_key() {
            out.push_str(" PRIMARY KEY");
        } else {
            if self.is_unique() {
                out.push_str(" UNIQUE");
            }
            if !self.is_nullable() {
                out.push_str(" NOT NULL");
            }
        }
        if let Some(fk) = self.foreign_key() {
            let target = self.referenced_table()?;
            out.push_str(" REFERENCES ");
            writer.write_identifier_quoted(&mut context, &mut out, target.tablename());
            out.push_str(" (");
            out.push_str(target.primary_key().name());
            out.push_str(") ON DELETE ");
            writer.write_action(&mut context, &mut out, &fk.on_delete);
            out.push_str(" ON UPDATE ");
            writer.write_action(&mut context, &mut out, &fk.on_update);
        }
        let mut args = Vec::new();
        if let Some(ColumnDefault::Value(value)) = &self.def().default {
            if !value.is_null() {
                let mut literal = String::new();
                writer.write_value(&mut Context::inlined(), &mut literal, value);
                out.push_str(" DEFAULT {}");
                args.push(Arg::Unquoted(Unquoted(literal)));
            }
        }
        QueryString::new(out, args)
    }

    fn condition(&self, operator: Operator, operand: Operand) -> Condition {
        Condition::Where {
            column: self.clone(),
            operator,
            operand,
        }
    }

    /// Equality, comparing with a NULL becomes `IS NULL`.
    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        let value = value.into();
        if value.is_null() {
            return self.is_null();
        }
        self.condition(Operator::Equal, Operand::Value(value))
    }
    /// Inequality, comparing with a NULL becomes `IS NOT NULL`.
    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        let value = value.into();
        if value.is_null() {
            return self.is_not_null();
        }
        self.condition(Operator::NotEqual, Operand::Value(value))
    }
    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        self.condition(Operator::Less, Operand::Value(value.into()))
    }
    pub fn le(&self, value: impl Into<Value>) -> Condition {
        self.condition(Operator::LessEqual, Operand::Value(value.into()))
    }
    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        self.condition(Operator::Greater, Operand::Value(value.into()))
    }
    pub fn ge(&self, value: impl Into<Value>) -> Condition {
        self.condition(Operator::GreaterEqual, Operand::Value(value.into()))
    }
    pub fn like(&self, pattern: impl Into<String>) -> Condition {
        self.condition(Operator::Like, Operand::Value(Value::Varchar(Some(pattern.into()))))
    }
    pub fn ilike(&self, pattern: impl Into<String>) -> Condition {
        self.condition(Operator::ILike, Operand::Value(Value::Varchar(Some(pattern.into()))))
    }
    pub fn not_like(&self, pattern: impl Into<String>) -> Condition {
        self.condition(Operator::NotLike, Operand::Value(Value::Varchar(Some(pattern.into()))))
    }
    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect();
        self.condition(Operator::In, Operand::List(values))
    }
    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect();
        self.condition(Operator::NotIn, Operand::List(values))
    }
    pub fn is_null(&self) -> Condition {
        self.condition(Operator::IsNull, Operand::None)
    }
    pub fn is_not_null(&self) -> Condition {
        self.condition(Operator::IsNotNull, Operand::None)
    }

    pub fn asc(&self) -> Ordered {
        Ordered {
            column: self.clone(),
            order: Order::ASC,
        }
    }
    pub fn desc(&self) -> Ordered {
        Ordered {
            column: self.clone(),
            order: Order::DESC,
        }
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.same_column(other)
            && self.call_chain.len() == other.call_chain.len()
            && self
                .call_chain
                .iter()
                .zip(&other.call_chain)
                .all(|(a, b)| a.foreign_key.same_column(&b.foreign_key))
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({}.{})", self.tablename(), self.path())
    }
}
