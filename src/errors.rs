use thiserror::Error;

/// SDK错误类型
#[derive(Error, Debug)]
pub enum PayError {
    /// 密钥格式错误（无法解析或算法不匹配）
    #[error("Key format error: {0}")]
    KeyFormat(String),

    /// 签名验证失败
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// 编码错误
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// 参数验证错误
    #[error("Validation error: {0}")]
    Validation(String),

    /// 网关业务错误
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// 加解密错误
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// XML编解码错误
    #[error("XML error: {0}")]
    Xml(String),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SDK结果类型
pub type PayResult<T> = Result<T, PayError>;
