use crate::{Action, ColumnType, ForeignKey, References, Value};
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// Default applied when a row is created without a value for the column.
#[derive(Clone)]
pub enum ColumnDefault {
    /// Fixed value, also rendered as `DEFAULT` in the table DDL.
    Value(Value),
    /// Evaluated each time a default is needed.
    Callable(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl ColumnDefault {
    pub fn get(&self) -> Value {
        match self {
            ColumnDefault::Value(v) => v.clone(),
            ColumnDefault::Callable(f) => f(),
        }
    }
}

impl Debug for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ColumnDefault::Callable(..) => f.write_str("Callable"),
        }
    }
}

/// Declaration of a column, before it is attached to a table.
///
/// ```rust
/// use tabula_core::ColumnDef;
/// let popularity = ColumnDef::integer().default(1000).index(true);
/// let name = ColumnDef::varchar(50).unique(true).help_text("Band name");
/// ```
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Storage type.
    pub column_type: ColumnType,
    /// Nullability flag.
    pub null: bool,
    /// Unique constraint.
    pub unique: bool,
    /// Create an index on the column together with the table.
    pub index: bool,
    /// Value used when a row does not provide one.
    pub default: Option<ColumnDefault>,
    /// Free text describing the column.
    pub help_text: Option<String>,
}

impl ColumnDef {
    pub fn new(column_type: ColumnType) -> Self {
        let default = column_type.implicit_default().map(ColumnDefault::Value);
        let null = column_type.is_foreign_key();
        Self {
            column_type,
            null,
            unique: false,
            index: false,
            default,
            help_text: None,
        }
    }
    pub fn serial() -> Self {
        Self::new(ColumnType::Serial)
    }
    pub fn small_int() -> Self {
        Self::new(ColumnType::SmallInt)
    }
    pub fn integer() -> Self {
        Self::new(ColumnType::Integer)
    }
    pub fn big_int() -> Self {
        Self::new(ColumnType::BigInt)
    }
    pub fn real() -> Self {
        Self::new(ColumnType::Real)
    }
    pub fn double_precision() -> Self {
        Self::new(ColumnType::DoublePrecision)
    }
    pub fn numeric(digits: Option<(u8, u8)>) -> Self {
        Self::new(ColumnType::Numeric(digits))
    }
    pub fn varchar(length: u32) -> Self {
        Self::new(ColumnType::Varchar(length))
    }
    pub fn text() -> Self {
        Self::new(ColumnType::Text)
    }
    pub fn boolean() -> Self {
        Self::new(ColumnType::Boolean)
    }
    pub fn date() -> Self {
        Self::new(ColumnType::Date)
    }
    pub fn time() -> Self {
        Self::new(ColumnType::Time)
    }
    pub fn timestamp() -> Self {
        Self::new(ColumnType::Timestamp)
    }
    pub fn timestamptz() -> Self {
        Self::new(ColumnType::Timestamptz)
    }
    pub fn uuid() -> Self {
        Self::new(ColumnType::Uuid)
    }
    pub fn json() -> Self {
        Self::new(ColumnType::Json)
    }
    pub fn bytea() -> Self {
        Self::new(ColumnType::Bytea)
    }
    /// Integer column pointing at the primary key of another table, nullable
    /// and cascading by default.
    pub fn foreign_key(references: impl Into<References>) -> Self {
        Self::new(ColumnType::ForeignKey(ForeignKey {
            references: references.into(),
            on_delete: Action::Cascade,
            on_update: Action::Cascade,
        }))
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }
    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(ColumnDefault::Callable(Arc::new(f)));
        self
    }
    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }
    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }
    /// Only meaningful on foreign keys, ignored otherwise.
    pub fn on_delete(mut self, action: Action) -> Self {
        if let ColumnType::ForeignKey(fk) = &mut self.column_type {
            fk.on_delete = action;
        }
        self
    }
    /// Only meaningful on foreign keys, ignored otherwise.
    pub fn on_update(mut self, action: Action) -> Self {
        if let ColumnType::ForeignKey(fk) = &mut self.column_type {
            fk.on_update = action;
        }
        self
    }

    pub fn foreign_key_def(&self) -> Option<&ForeignKey> {
        match &self.column_type {
            ColumnType::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }

    /// The default value, `Value::Null` when there is none.
    pub fn default_value(&self) -> Value {
        self.default.as_ref().map(ColumnDefault::get).unwrap_or_default()
    }
}
