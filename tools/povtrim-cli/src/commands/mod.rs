pub mod check;
pub mod config;
pub mod info;
pub mod plan;
pub mod players;
pub mod trim;
