pub mod diagnostic;
pub mod messages;
pub mod types;

pub use diagnostic::*;
pub use messages::*;
pub use types::*;
