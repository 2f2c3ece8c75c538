pub mod draft;
pub mod enums;
pub mod intake;

pub use draft::*;
pub use enums::*;
pub use intake::*;
