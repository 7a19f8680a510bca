/// State threaded through a single rendering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Placeholders emitted so far, the next one is `counter + 1`.
    pub counter: u32,
    /// Prefix column names with the alias of the table they belong to.
    pub qualify_columns: bool,
    /// Write values as literals instead of placeholders.
    pub inline_values: bool,
}

impl Context {
    pub fn new(qualify_columns: bool) -> Self {
        Self {
            counter: 0,
            qualify_columns,
            inline_values: false,
        }
    }
    pub fn inlined() -> Self {
        Self {
            inline_values: true,
            ..Default::default()
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(false)
    }
}
