//! Core components shared by the bridge vendor clients.
//!
//! This crate provides the foundational types for talking to Chinese
//! cloud and payment vendors: a dependency-injection [`Context`], the
//! common [`Error`] taxonomy, and the hashing, RSA and time helpers the
//! per-vendor signing schemes are built from.
//!
//! ## Overview
//!
//! - **Context**: holds the HTTP transport, file reader and cache store
//!   a client uses, with `with_*` builders to swap implementations
//! - **Traits**: [`HttpSend`], [`FileRead`] and [`CacheStore`] are the
//!   seams where transports, key loading and token caches plug in
//! - **Error**: a kind + message + source error carrying the vendor's
//!   own error code and request id when a gateway rejects a call
//!
//! ## Example
//!
//! ```no_run
//! use bridge_core::{CacheStore, Context, MemoryCache};
//!
//! # async fn example() -> bridge_core::Result<()> {
//! let ctx = Context::new().with_cache(MemoryCache::new());
//! ctx.cache_set("wechat_official_access_token_wx123", "token", 6900).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: base64, MD5, SHA and HMAC helpers
//! - [`rsa`]: tolerant key parsing and PKCS#1 v1.5 signatures
//! - [`time`]: vendor date formats
//! - [`utils`]: secret redaction and nonce generation

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod rsa;
pub mod time;
pub mod utils;

mod config;
pub use config::{require_config, require_options};

mod context;
pub use context::{Context, NoopFileRead, NoopHttpSend};
mod fs;
pub use fs::FileRead;
mod http;
pub use http::HttpSend;
mod cache;
pub use cache::{CacheStore, MemoryCache, NoopCache};

mod error;
pub use error::{Error, ErrorKind, Result};
