//! Commands and queries routed through the [`Bus`](crate::bus::Bus).
//!
//! Every type here implements [`Message`](crate::bus::Message); its `Output`
//! is the result the single registered handler produces.

pub mod alert;
pub mod evaluation;
pub mod notification;
pub mod search;

pub use alert::*;
pub use evaluation::*;
pub use notification::*;
pub use search::*;
