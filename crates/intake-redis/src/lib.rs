//! # Intake Redis
//!
//! Low-level Redis client for the form intake server.
//!
//! - **No business logic**: pure infrastructure layer
//! - **No dependencies** on other intake-* crates
//! - Connection management with automatic reconnection
//! - Server-side clock (`TIME`) so every instance agrees on "now"
//!
//! ## Example
//!
//! ```rust,no_run
//! use intake_redis::RedisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RedisClient::connect("redis://localhost:6379").await?;
//!
//!     client.set_ex("key", "value", 2).await?;
//!     let value: Option<String> = client.get("key").await?;
//!     let now = client.server_time().await?;
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::RedisClient;

// Re-export commonly used types
pub use redis::{RedisError, Script};

/// Result type for Redis operations
pub type Result<T> = std::result::Result<T, RedisError>;
