pub mod client;
pub mod error;

pub use client::QbitClient;
pub use error::QbitError;
