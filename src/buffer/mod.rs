mod frame;
mod page_guard;
mod pool;
mod replacer;

pub use frame::*;
pub use page_guard::*;
pub use pool::*;
pub use replacer::*;
