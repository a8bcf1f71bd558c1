pub mod denon;
pub mod protocol;

pub use denon::*;
pub use protocol::*;
