pub mod base;
pub mod logging;
pub mod ssr;

pub use base::*;
pub use logging::*;
pub use ssr::*;
