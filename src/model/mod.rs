pub mod document;
pub mod facility;
pub mod status;

pub use document::*;
pub use facility::*;
pub use status::*;
