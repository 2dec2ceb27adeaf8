pub mod health;
pub mod messages;
pub mod streams;
pub mod ws;
