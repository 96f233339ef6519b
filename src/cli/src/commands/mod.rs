pub mod check;
pub mod config;
pub mod health;
pub mod probe;
pub mod scope;
