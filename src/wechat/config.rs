use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 微信支付v2（XML接口）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WxConfig {
    /// APPID
    pub app_id: String,

    /// 商户号
    pub mch_id: String,

    /// 子商户号（服务商模式，可选）
    #[serde(default)]
    pub sub_mch_id: Option<String>,

    /// API密钥（签名用对称密钥）
    pub pay_key: String,

    /// 异步通知地址
    pub notify_url: String,

    /// API基础URL
    pub base_url: String,
}

impl WxConfig {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            app_id: std::env::var("WECHAT_APPID").expect("WECHAT_APPID must be set"),
            mch_id: std::env::var("WECHAT_MCHID").expect("WECHAT_MCHID must be set"),
            sub_mch_id: std::env::var("WECHAT_SUB_MCHID").ok(),
            pay_key: std::env::var("WECHAT_PAY_KEY").expect("WECHAT_PAY_KEY must be set"),
            notify_url: std::env::var("WECHAT_NOTIFY_URL").unwrap_or_else(|_| String::new()),
            base_url: std::env::var("WECHAT_BASE_URL")
                .unwrap_or_else(|_| "https://api.mch.weixin.qq.com".to_string()),
        })
    }
}

/// 微信支付v3（REST接口）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WxV3Config {
    /// APPID
    pub app_id: String,

    /// 商户号
    pub mch_id: String,

    /// 商户API证书序列号
    pub serial_no: String,

    /// 商户API私钥（PKCS#8，裸base64或PEM均可）
    pub private_key: String,

    /// 商户API v3密钥（回调通知解密，32字节）
    pub api_v3_key: String,

    /// 微信支付平台证书（验签与敏感信息加密，可选）
    #[serde(default)]
    pub platform_cert: Option<String>,

    /// 异步通知地址
    pub notify_url: String,

    /// API基础URL
    pub base_url: String,
}

impl WxV3Config {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            app_id: std::env::var("WECHAT_APPID").expect("WECHAT_APPID must be set"),
            mch_id: std::env::var("WECHAT_MCHID").expect("WECHAT_MCHID must be set"),
            serial_no: std::env::var("WECHAT_SERIAL_NO").expect("WECHAT_SERIAL_NO must be set"),
            private_key: std::env::var("WECHAT_PRIVATE_KEY")
                .expect("WECHAT_PRIVATE_KEY must be set"),
            api_v3_key: std::env::var("WECHAT_API_V3_KEY").expect("WECHAT_API_V3_KEY must be set"),
            platform_cert: std::env::var("WECHAT_PLATFORM_CERT").ok(),
            notify_url: std::env::var("WECHAT_NOTIFY_URL").unwrap_or_else(|_| String::new()),
            base_url: std::env::var("WECHAT_BASE_URL")
                .unwrap_or_else(|_| "https://api.mch.weixin.qq.com".to_string()),
        })
    }
}
