pub mod audio;
pub mod questions;
pub mod repositories;
