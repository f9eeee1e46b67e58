pub mod config;
pub mod sequence;
pub mod view;
