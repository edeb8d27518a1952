mod supervisor;
mod worker;

pub use supervisor::Supervisor;
pub use worker::Worker;
