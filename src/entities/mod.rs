//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

/// Failed command log
pub mod error_log;
/// Per-user session record
pub mod user;

pub use error_log::{Column as ErrorLogColumn, Entity as ErrorLog, Model as ErrorLogModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, SessionStatus};
