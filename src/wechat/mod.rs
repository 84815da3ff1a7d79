//! 微信支付。v2走XML接口（MD5/HMAC-SHA256对称签名），
//! v3走REST接口（RSA-SHA256头部签名 + 平台证书验签）。

pub mod client;
pub mod config;
pub mod models;
pub mod notify;
pub mod v3;
pub mod xml;

pub use client::{TradeType, WxClient, WxOrder};
pub use config::{WxConfig, WxV3Config};
pub use models::*;
pub use notify::{ACK_FAILURE, ACK_SUCCESS, WxNotify};
pub use v3::{PlatformCertificate, V3Order, WxV3Client};
