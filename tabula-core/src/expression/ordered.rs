use crate::{Column, SqlWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    ASC,
    DESC,
}

#[derive(Debug, Clone)]
pub struct Ordered {
    pub column: Column,
    pub order: Order,
}

impl Ordered {
    pub fn sql(&self, writer: &dyn SqlWriter, qualify_columns: bool) -> String {
        let mut out = self.column.sql_name(writer, qualify_columns);
        out.push_str(match self.order {
            Order::ASC => " ASC",
            Order::DESC => " DESC",
        });
        out
    }
}
