//! Qiniu Kodo client.
//!
//! Management APIs sign with an HMAC-SHA1 token over the request
//! line, host and headers; uploads carry a token embedding the upload
//! policy. Three facades cover the API surface: [`Service`] for the
//! account, [`Bucket`] for space management and [`Objects`] for the
//! content of one bucket.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridge_core::Context;
//! use bridge_qiniu_kodo::{Config, Objects, UploadOptions};
//!
//! # async fn example() -> bridge_core::Result<()> {
//!     // Configure a real HTTP transport, e.g. bridge-http-send-reqwest.
//!     let ctx = Context::new();
//!
//!     let config = Config {
//!         access_key: "your-access-key".to_string(),
//!         secret_key: "your-secret-key".to_string(),
//!         region_id: "z1".to_string(),
//!         access_domain: "cdn.example.com".to_string(),
//!         bucket_name: "mybucket".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let objects = Objects::new(ctx, config)?;
//!     objects
//!         .upload("hello.txt", b"hello", UploadOptions::default())
//!         .await?;
//!     println!("{}", objects.access_path("hello.txt"));
//!     Ok(())
//! # }
//! ```

mod config;
pub use config::Config;

pub mod region;
pub use region::Region;

pub mod sign;
pub use sign::UploadPolicy;

mod client;
pub use client::KodoClient;

mod service;
pub use service::Service;

mod bucket;
pub use bucket::Bucket;

mod objects;
pub use objects::{BatchOperation, Lifecycle, Objects, UploadOptions};
