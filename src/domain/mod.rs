mod catalog;
mod item;
mod schedule;
mod service_event;
mod stats;
mod vehicle;

pub use catalog::*;
pub use item::*;
pub use schedule::*;
pub use service_event::*;
pub use stats::*;
pub use vehicle::*;
