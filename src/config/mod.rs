//! Константы времени компиляции и конфигурация ПИД.

pub mod pid;
pub mod requests;
pub mod robot;
pub mod store;

pub use pid::PidConfig;
pub use requests::{ConfigRequestSource, RequestInbox};
pub use robot::*;
pub use store::{ConfigStore, RamStore};
