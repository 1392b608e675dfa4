pub mod decoder;
pub mod dedup;
pub mod header;
pub mod helpers;
pub mod main;
pub mod reassembly;
pub mod stream;

pub use decoder::*;
pub use dedup::*;
pub use header::*;
pub use helpers::*;
pub use main::*;
pub use reassembly::*;
pub use stream::*;
