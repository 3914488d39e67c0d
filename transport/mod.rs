// Transport module: send primitive contract, deferred notification and concrete channels
pub mod traits;
pub mod scheduler;
pub mod listeners;
pub mod config;
pub mod transport;
pub mod inbox;
pub mod unix;
pub mod tcp;

pub use freebird_core::*;

pub use traits::*;
pub use scheduler::*;
pub use listeners::*;
pub use config::*;
pub use transport::*;
pub use inbox::*;
pub use unix::*;
pub use tcp::*;
