//! Value objects exchanged with callers of the repositories.

mod notifier;
mod profile;

pub use notifier::Notifier;
pub use profile::{AdminToken, Module, Profile};
