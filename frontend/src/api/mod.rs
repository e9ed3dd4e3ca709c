mod analytics;
mod auth;
pub mod client;
mod otp;
pub mod service;
pub mod types;
mod users;

pub use client::*;
pub use service::*;
pub use types::*;
