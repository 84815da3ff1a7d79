use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 支付宝配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlipayConfig {
    /// 应用ID
    pub app_id: String,

    /// 商户RSA私钥（PKCS#8或PKCS#1，裸base64或PEM均可）
    pub private_key: String,

    /// 支付宝公钥（验签用）
    pub public_key: String,

    /// 异步通知地址
    pub notify_url: String,

    /// 网关地址
    pub gateway_url: String,
}

impl AlipayConfig {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            app_id: std::env::var("ALIPAY_APP_ID").expect("ALIPAY_APP_ID must be set"),
            private_key: std::env::var("ALIPAY_PRIVATE_KEY")
                .expect("ALIPAY_PRIVATE_KEY must be set"),
            public_key: std::env::var("ALIPAY_PUBLIC_KEY").expect("ALIPAY_PUBLIC_KEY must be set"),
            notify_url: std::env::var("ALIPAY_NOTIFY_URL").unwrap_or_else(|_| String::new()),
            gateway_url: std::env::var("ALIPAY_GATEWAY_URL")
                .unwrap_or_else(|_| "https://openapi.alipay.com/gateway.do".to_string()),
        })
    }
}
