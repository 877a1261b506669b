pub mod application;
pub mod job;
pub mod session;
pub mod setting;
pub mod ticket;
pub mod user;
