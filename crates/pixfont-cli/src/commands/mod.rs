pub mod build;
pub mod names;
pub mod trace;
