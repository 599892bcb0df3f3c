pub mod access;
pub mod catalog;
pub mod importer;
pub mod picker;
pub mod progress;
pub mod recent;

pub use access::*;
pub use catalog::*;
pub use importer::*;
pub use picker::*;
pub use progress::*;
pub use recent::*;
