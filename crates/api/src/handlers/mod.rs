pub mod health;
pub mod links;
pub mod statistics;
pub mod tasks;
