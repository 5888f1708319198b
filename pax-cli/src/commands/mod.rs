pub mod feature;
pub mod list;
pub mod provision;
