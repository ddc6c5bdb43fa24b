pub mod migration;
pub mod problem;
