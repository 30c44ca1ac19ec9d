//! Stateless repositories: every method takes `&Connection` and executes SQL.

pub mod character;
pub mod work;

pub use character::CharacterRepo;
pub use work::WorkRepo;
