use crate::{LazyTableReference, Registry, Result, Table, Value};
use rust_decimal::Decimal;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// Storage type of a column.
#[derive(Debug, Clone)]
pub enum ColumnType {
    /// Auto incrementing integer, used by primary keys.
    Serial,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    /// Optional `(precision, scale)`.
    Numeric(Option<(u8, u8)>),
    Varchar(u32),
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Uuid,
    Json,
    Bytea,
    ForeignKey(ForeignKey),
}

impl ColumnType {
    /// Default a column of this type gets when the declaration has none.
    pub fn implicit_default(&self) -> Option<Value> {
        Some(match self {
            ColumnType::SmallInt => Value::Int16(Some(0)),
            ColumnType::Integer => Value::Int32(Some(0)),
            ColumnType::BigInt => Value::Int64(Some(0)),
            ColumnType::Real => Value::Float32(Some(0.0)),
            ColumnType::DoublePrecision => Value::Float64(Some(0.0)),
            ColumnType::Numeric(..) => Value::Decimal(Some(Decimal::ZERO)),
            ColumnType::Varchar(..) | ColumnType::Text => Value::Varchar(Some(String::new())),
            ColumnType::Boolean => Value::Boolean(Some(false)),
            _ => return None,
        })
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self, ColumnType::ForeignKey(..))
    }
}

/// Referential action for `ON DELETE` and `ON UPDATE`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoAction,
    Restrict,
    #[default]
    Cascade,
    SetNull,
    SetDefault,
}

/// Table a foreign key points to, either known at declaration time or
/// located later by name.
#[derive(Clone)]
pub enum References {
    Table(Arc<Table>),
    Lazy(Arc<LazyTableReference>),
}

impl References {
    pub fn resolve(&self, registry: &Arc<Registry>) -> Result<Arc<Table>> {
        match self {
            References::Table(table) => Ok(table.clone()),
            References::Lazy(reference) => reference.resolve(registry),
        }
    }

    pub fn lazy(&self) -> Option<&Arc<LazyTableReference>> {
        match self {
            References::Lazy(reference) => Some(reference),
            References::Table(..) => None,
        }
    }
}

impl Debug for References {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            References::Table(table) => f.debug_tuple("Table").field(&table.class_name()).finish(),
            References::Lazy(reference) => f.debug_tuple("Lazy").field(reference).finish(),
        }
    }
}

impl From<Arc<Table>> for References {
    fn from(value: Arc<Table>) -> Self {
        References::Table(value)
    }
}

impl From<&Arc<Table>> for References {
    fn from(value: &Arc<Table>) -> Self {
        References::Table(value.clone())
    }
}

impl From<LazyTableReference> for References {
    fn from(value: LazyTableReference) -> Self {
        References::Lazy(Arc::new(value))
    }
}

impl From<Arc<LazyTableReference>> for References {
    fn from(value: Arc<LazyTableReference>) -> Self {
        References::Lazy(value)
    }
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub references: References,
    pub on_delete: Action,
    pub on_update: Action,
}
