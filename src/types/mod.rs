pub mod errors;
pub mod mount;
pub mod report;

pub use errors::*;
pub use mount::*;
pub use report::*;
