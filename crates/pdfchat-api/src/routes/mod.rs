pub mod document;
pub mod health;
pub mod messages;
pub mod threads;
