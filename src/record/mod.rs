mod data_type;
mod predicate;
mod record;
mod scan;
mod schema;
mod table;
mod value;

pub use data_type::DataType;
pub use predicate::{CmpOp, Expr, Predicate};
pub use record::Record;
pub use scan::Scan;
pub use schema::{Attribute, Schema};
pub use table::Table;
pub use value::Value;
