pub mod capture;
pub mod measurement;
pub mod record;
pub mod table;

pub use capture::*;
pub use measurement::*;
pub use record::*;
pub use table::*;
