//! Database models split into domain-specific modules.

pub mod class;
pub mod notification;
pub mod reservation;
pub mod user;

pub use class::*;
pub use notification::*;
pub use reservation::*;
pub use user::*;
