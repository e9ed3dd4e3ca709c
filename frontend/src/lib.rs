//! Client core for the SMS gateway: session guard, phone verification and paced bulk
//! dispatch, talking to the messaging service over HTTP.

pub mod admin;
pub mod api;
pub mod app;
pub mod bulk;
pub mod config;
pub mod error;
pub mod logging;
pub mod otp;
pub mod router;
pub mod state;
pub mod utils;

pub use app::Frontend;
pub use config::RuntimeConfig;
pub use error::{ClientError, ErrorKind, Notice};
