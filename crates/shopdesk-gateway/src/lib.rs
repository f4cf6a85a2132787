//! # ShopDesk Gateway
//! HTTP API over [`shopdesk_agent::ShopAssistant`]: chat, return requests,
//! orders and document administration.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
