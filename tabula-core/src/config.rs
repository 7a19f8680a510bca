use crate::{Engine, Error, GenericSqlWriter, Result, SqlWriter, SqliteSqlWriter};
use std::{
    env,
    fmt::{self, Debug, Display},
    str::FromStr,
    sync::Arc,
};

/// SQL dialect family a table renders for.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineType {
    #[default]
    Postgres,
    Sqlite,
}

impl EngineType {
    pub fn sql_writer(&self) -> &'static dyn SqlWriter {
        match self {
            EngineType::Postgres => &GenericSqlWriter,
            EngineType::Sqlite => &SqliteSqlWriter,
        }
    }
}

impl FromStr for EngineType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(EngineType::Postgres),
            "sqlite" => Ok(EngineType::Sqlite),
            other => Err(Error::Configuration(format!(
                "Unknown engine type `{other}`, expected `postgres` or `sqlite`"
            ))),
        }
    }
}

impl Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineType::Postgres => "postgres",
            EngineType::Sqlite => "sqlite",
        })
    }
}

/// Defaults applied to tables that do not carry an engine of their own.
#[derive(Clone, Default)]
pub struct Config {
    engine: Option<Arc<dyn Engine>>,
    engine_type: EngineType,
}

impl Config {
    /// Environment variable selecting the dialect when no engine is configured.
    pub const ENGINE_VAR: &'static str = "TABULA_ENGINE";

    pub fn new() -> Self {
        Default::default()
    }

    /// Read the defaults from the environment, missing variables keep the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Ok(value) = env::var(Self::ENGINE_VAR) {
            config.engine_type = value.parse()?;
            log::debug!("Default engine type `{}` from the environment", config.engine_type);
        }
        Ok(config)
    }

    pub fn engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine_type = engine.engine_type();
        self.engine = Some(engine);
        self
    }

    pub fn engine_type(mut self, engine_type: EngineType) -> Self {
        self.engine_type = engine_type;
        self
    }

    pub fn default_engine(&self) -> Option<&Arc<dyn Engine>> {
        self.engine.as_ref()
    }

    pub fn default_engine_type(&self) -> EngineType {
        self.engine_type
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("engine", &self.engine.as_ref().map(|v| v.engine_type()))
            .field("engine_type", &self.engine_type)
            .finish()
    }
}
