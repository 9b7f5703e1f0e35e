pub mod reading;
pub mod timestamp;

pub use reading::{Channels, Reading, RemoteReading};
