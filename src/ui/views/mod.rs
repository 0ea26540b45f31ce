mod list;
mod rows;

pub use list::ListView;
pub use rows::TableRow;
