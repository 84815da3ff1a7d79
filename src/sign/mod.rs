//! 请求规范化与签名引擎。
//!
//! 调用方组装参数集，这里负责生成确定性的签名串、计算签名、
//! 以及对回调参数验签。密钥材料在客户端构造时解析一次，之后只读。

pub mod canonical;
pub mod engine;
pub mod keys;

pub use canonical::{SECRET_FIELD, SIGN_FIELD, SIGN_TYPE_FIELD, canonicalize, canonicalize_with_secret};
pub use engine::{SignType, sign, sign_params, verify};
pub use keys::{KeyMaterial, certificate_public_key, load_certificate, load_private_key, load_public_key, pem_armor};
