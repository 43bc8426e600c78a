//! Aliyun OSS client with V4 header signing.
//!
//! Every request is signed with the `OSS4-HMAC-SHA256` scheme over the
//! canonical resource, query and headers; responses decode from XML
//! (or JSON) into `serde_json::Value`. Two facades cover the API
//! surface: [`Bucket`] for space management and [`Objects`] for the
//! content of one bucket.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridge_aliyun_oss::{Config, Objects, PutOptions};
//! use bridge_core::Context;
//!
//! # async fn example() -> bridge_core::Result<()> {
//!     // Configure a real HTTP transport, e.g. bridge-http-send-reqwest.
//!     let ctx = Context::new();
//!
//!     let config = Config {
//!         access_key_id: "your-access-key-id".to_string(),
//!         access_key_secret: "your-access-key-secret".to_string(),
//!         region_id: "cn-hangzhou".to_string(),
//!         bucket_name: "mybucket".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let objects = Objects::new(ctx, config)?;
//!     objects
//!         .put("hello.txt", "hello".to_string(), PutOptions::default())
//!         .await?;
//!     println!("{}", objects.access_path("hello.txt")?);
//!     Ok(())
//! # }
//! ```

mod config;
pub use config::Config;

pub mod region;
pub use region::Region;

pub mod sign;

mod xml;

mod client;
pub use client::OssClient;

mod bucket;
pub use bucket::Bucket;

mod objects;
pub use objects::{
    CopyOptions, GetOptions, InitPartOptions, ListOptions, Objects, PartTaskListOptions,
    PutOptions,
};
