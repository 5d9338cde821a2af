pub mod audio;
pub mod common;
pub mod configs;
pub mod extension;
pub mod params;
pub mod ssr;

pub use common::{SsrError, SsrResult};
pub use extension::{AudioExtension, ExtensionSet};
pub use params::StrParms;
pub use ssr::SurroundRecord;
