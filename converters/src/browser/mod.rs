mod convert;
mod holder;
mod supervisor;

pub use convert::convert;
pub use holder::Holder;
pub use supervisor::{BrowserRef, Supervisor};
