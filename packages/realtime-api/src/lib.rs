pub mod connections;
pub mod events;
pub mod handlers;
pub mod rate_limit;
pub mod rooms;
pub mod state;
pub mod sweeper;
