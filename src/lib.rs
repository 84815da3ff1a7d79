//! 聚合支付SDK：支付宝与微信支付的下单、查询、退款、转账与回调验签。
//!
//! 核心是`sign`模块的请求规范化与签名引擎：参数集按字段名
//! 字节序排序拼成签名串，再按签名算法计算/验证签名。支付宝、
//! 微信v2共用这一套，微信v3走头部签名，在`wechat::v3`单独实现。
//!
//! 回调验签失败一律返回[`errors::PayError::SignatureMismatch`]，
//! 调用方必须拒绝对应通知，应答各渠道的失败应答串。

pub mod alipay;
pub mod errors;
pub mod sign;
pub mod util;
pub mod wechat;

pub use errors::{PayError, PayResult};
pub use sign::{KeyMaterial, SignType};
