pub mod health;
pub mod qa;
