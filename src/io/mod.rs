pub mod config_io;
pub mod history;
pub mod lock;
pub mod store;
pub mod workspace;
