pub mod category;
pub mod file;

pub use category::*;
pub use file::*;
