//! Extractores de axum para los handlers.

mod identity;
mod locale;
mod path;

pub use identity::Identity;
pub use locale::Locale;
pub use path::{CollectionPath, DetailPath};
