pub mod files;
pub mod logging;
pub mod spacing;
