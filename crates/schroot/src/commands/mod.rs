//! Informational commands shared by the front-ends.

mod config;
mod info;
mod list;
mod location;

pub use config::config;
pub use info::info;
pub use list::list;
pub use location::location;
