//! Domain value objects and the ports the engine depends on.

pub mod history;
pub mod notification;
pub mod ports;
pub mod user;
pub mod wallet;
