pub mod config;
pub mod focus;
pub mod node;
pub mod operation;
pub mod snapshot;
pub mod tag;

pub use config::*;
pub use focus::*;
pub use node::*;
pub use operation::*;
pub use snapshot::*;
pub use tag::*;
