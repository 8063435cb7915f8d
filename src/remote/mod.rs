pub mod cache;
pub mod client;

pub use cache::*;
pub use client::*;
