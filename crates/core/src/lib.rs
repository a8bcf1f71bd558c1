pub mod applicator;
pub mod classifier;
pub mod codec;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod models;
pub mod traits;
pub mod trim;

pub use applicator::*;
pub use classifier::*;
pub use codec::*;
pub use coordinator::*;
pub use debounce::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use trim::*;
