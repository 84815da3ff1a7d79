use crate::errors::{PayError, PayResult};
use crate::sign::{KeyMaterial, SIGN_TYPE_FIELD, SignType, verify};
use serde::Deserialize;
use std::collections::HashMap;

/// 验签通过后回给支付宝的应答体
pub const ACK_SUCCESS: &str = "success";
/// 处理失败时的应答体（支付宝会重试通知）
pub const ACK_FAILURE: &str = "failure";

/// 支付宝异步通知。只能通过[`AlipayNotify::from_form_body`]构造，
/// 构造成功即表示验签通过；验签失败的回调拿不到业务字段。
#[derive(Debug, Clone, Deserialize)]
pub struct AlipayNotify {
    pub app_id: String,
    pub out_trade_no: String,
    pub trade_no: String,
    pub trade_status: String,
    pub total_amount: String,
    #[serde(default)]
    pub buyer_id: Option<String>,
    #[serde(default)]
    pub buyer_logon_id: Option<String>,
    #[serde(default)]
    pub gmt_payment: Option<String>,
    #[serde(default)]
    pub notify_id: Option<String>,
    #[serde(default)]
    pub passback_params: Option<String>,
}

impl AlipayNotify {
    /// 解析并验签form编码的回调体。
    ///
    /// 先把`+`还原为空格再做percent解码（时间字段里的空格按
    /// x-www-form-urlencoded规则传成`+`，decode之后才出现的`+`
    /// 是签名里的原始字符，必须保留）。
    pub fn from_form_body(body: &str, key: &KeyMaterial) -> PayResult<Self> {
        let params = parse_form(body)?;

        let sign_type_name = params
            .get(SIGN_TYPE_FIELD)
            .ok_or_else(|| PayError::Validation("missing sign_type".to_string()))?;
        let sign_type = match SignType::from_name(sign_type_name) {
            Some(t @ (SignType::Rsa | SignType::Rsa2)) => t,
            _ => {
                return Err(PayError::Validation(format!(
                    "unsupported sign_type: {}",
                    sign_type_name
                )));
            }
        };

        // 验签失败直接返回错误，绝不把未验签的回调当成有效支付
        verify(&params, key, sign_type)?;

        let value = serde_json::to_value(&params)?;
        Ok(serde_json::from_value(value)?)
    }

    /// 交易是否已支付成功
    pub fn is_paid(&self) -> bool {
        self.trade_status == "TRADE_SUCCESS" || self.trade_status == "TRADE_FINISHED"
    }
}

fn parse_form(body: &str) -> PayResult<HashMap<String, String>> {
    let body = body.replace('+', " ");
    let mut params = HashMap::new();
    for pair in body.split('&') {
        if let Some((k, v)) = pair.split_once('=') {
            let value = urlencoding::decode(v)
                .map_err(|e| PayError::Encoding(format!("invalid form encoding: {}", e)))?;
            params.insert(k.to_string(), value.into_owned());
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::{SIGN_FIELD, canonicalize, sign};
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    fn gateway_key() -> (KeyMaterial, KeyMaterial) {
        // 支付宝侧持有私钥签名，商户侧持有公钥验签
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = private_key.to_public_key();
        (
            KeyMaterial::Rsa {
                private_key: Some(private_key),
                public_key: None,
            },
            KeyMaterial::Rsa {
                private_key: None,
                public_key: Some(public_key),
            },
        )
    }

    fn signed_notify_params(signer: &KeyMaterial) -> HashMap<String, String> {
        let mut m: HashMap<String, String> = [
            ("app_id", "2021000000000001"),
            ("out_trade_no", "T20240601001"),
            ("trade_no", "2024060122001400001"),
            ("trade_status", "TRADE_SUCCESS"),
            ("total_amount", "12.50"),
            ("gmt_payment", "2024-06-01 18:07:41"),
            ("sign_type", "RSA2"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        // 网关签名覆盖除sign/sign_type外的全部字段
        let canonical = canonicalize(&m, &[SIGN_FIELD, SIGN_TYPE_FIELD]);
        let signature = sign(&canonical, signer, SignType::Rsa2).unwrap();
        m.insert(SIGN_FIELD.to_string(), signature);
        m
    }

    fn encode_form(m: &HashMap<String, String>) -> String {
        m.iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v).replace("%20", "+")))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[test]
    fn test_valid_notify_round_trip() {
        let (signer, verifier) = gateway_key();
        let body = encode_form(&signed_notify_params(&signer));
        let notify = AlipayNotify::from_form_body(&body, &verifier).unwrap();
        assert_eq!(notify.out_trade_no, "T20240601001");
        assert_eq!(notify.gmt_payment.as_deref(), Some("2024-06-01 18:07:41"));
        assert!(notify.is_paid());
    }

    #[test]
    fn test_tampered_sign_is_fatal() {
        let (signer, verifier) = gateway_key();
        let mut m = signed_notify_params(&signer);
        m.insert("total_amount".to_string(), "0.01".to_string());
        let body = encode_form(&m);
        let err = AlipayNotify::from_form_body(&body, &verifier).unwrap_err();
        assert!(matches!(err, PayError::SignatureMismatch));
    }

    #[test]
    fn test_missing_sign_type_rejected() {
        let (signer, verifier) = gateway_key();
        let mut m = signed_notify_params(&signer);
        m.remove("sign_type");
        let err = AlipayNotify::from_form_body(&encode_form(&m), &verifier).unwrap_err();
        assert!(matches!(err, PayError::Validation(_)));
    }
}
