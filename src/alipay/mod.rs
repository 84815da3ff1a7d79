//! 支付宝openapi客户端（RSA/RSA2表单签名）。

pub mod client;
pub mod config;
pub mod models;
pub mod notify;

pub use client::{AlipayClient, TradeOrder};
pub use config::AlipayConfig;
pub use models::{
    AlipayResponse, PrecreateResponse, RefundRequest, RefundResponse, TradeCreateResponse,
    TradeQueryResponse, TransferRequest, TransferResponse,
};
pub use notify::{ACK_FAILURE, ACK_SUCCESS, AlipayNotify};
