//! WeChat clients: Pay v3, official accounts and mini programs.
//!
//! - [`Payment`] drives the Pay v3 REST gateway: requests signed with
//!   the merchant key (`WECHATPAY2-SHA256-RSA2048`), webhooks verified
//!   against the lazily fetched platform certificate, sealed payloads
//!   opened with AEAD_AES_256_GCM under the APIv3 key
//! - [`official`] covers web OAuth, the JS-SDK signature, template
//!   messages and user management for official accounts
//! - [`miniapp`] covers mini-program login and user data
//!
//! Official-account and mini-app calls share an access-token cache and
//! retry once when the vendor reports a stale token.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridge_core::Context;
//! use bridge_wechat::{PayClient, Payment, PaymentConfig};
//! use serde_json::json;
//!
//! # async fn example() -> bridge_core::Result<()> {
//!     // Configure a real file reader and HTTP transport, e.g.
//!     // bridge-file-read-tokio and bridge-http-send-reqwest.
//!     let ctx = Context::new();
//!
//!     let config = PaymentConfig {
//!         app_id: "wx0000000000000000".to_string(),
//!         mch_id: "1600000000".to_string(),
//!         mch_key: "your-32-byte-api-v3-key---------".to_string(),
//!         ssl_cert: "/etc/wechat/apiclient_cert.pem".to_string(),
//!         ssl_key: "/etc/wechat/apiclient_key.pem".to_string(),
//!     };
//!
//!     let payment = Payment::new(PayClient::new(ctx, config).await?);
//!     let package = payment
//!         .jsapi(
//!             json!({
//!                 "out_trade_no": "ORDER-1",
//!                 "amount": {"total": 100},
//!                 "description": "test order",
//!                 "payer": {"openid": "oABCD"},
//!             }),
//!             "https://example.com/notify",
//!         )
//!         .await?;
//!     println!("{package}");
//!     Ok(())
//! # }
//! ```

mod config;
pub use config::{MiniappConfig, OfficialConfig, PaymentConfig};

pub mod sign;

mod client;
pub use client::PayClient;

mod payment;
pub use payment::Payment;

mod token;

pub mod miniapp;
pub mod official;
