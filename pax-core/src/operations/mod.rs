pub mod provision;

pub use provision::{open_sources, provision};
