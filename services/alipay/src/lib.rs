//! Alipay payment clients.
//!
//! Two protocol profiles are supported:
//!
//! - the OpenAPI **v3 REST** gateway: JSON bodies signed with an
//!   `ALIPAY-SHA256withRSA` Authorization header, verified responses,
//!   optional AES-128-CBC content encryption and certificate mode
//! - the legacy **form gateway** (`gateway.do`): sorted `key=value`
//!   parameter signing, auto-submitting HTML payment forms and signed
//!   JSON response nodes
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridge_alipay::{Config, GatewayClient, Trade};
//! use bridge_core::Context;
//!
//! # async fn example() -> bridge_core::Result<()> {
//!     // Configure a real HTTP transport, e.g. bridge-http-send-reqwest.
//!     let ctx = Context::new();
//!
//!     let config = Config {
//!         app_id: "2021000000000000".to_string(),
//!         private_key: "your-app-private-key".to_string(),
//!         alipay_public_key: "alipay-public-key".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let trade = Trade::new(GatewayClient::new(ctx, config).await?);
//!     let order = trade.query(Some("ORDER-1"), None, &[], None).await?;
//!     println!("{order}");
//!     Ok(())
//! # }
//! ```

mod config;
pub use config::{Config, SignType};

mod cert;
pub use cert::{cert_sn, root_cert_sn, CertProfile};

pub mod sign;

mod form;

mod client;
pub use client::GatewayClient;

mod trade;
pub use trade::Trade;

mod fund;
pub use fund::Fund;

mod payment;
pub use payment::Payment;
