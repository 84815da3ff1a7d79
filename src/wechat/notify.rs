use crate::errors::{PayError, PayResult};
use crate::sign::{KeyMaterial, SignType, verify};
use crate::wechat::xml::xml_to_map;
use serde::Deserialize;
use std::collections::HashMap;

/// 回调应答：受理成功
pub const ACK_SUCCESS: &str =
    "<xml><return_code><![CDATA[SUCCESS]]></return_code><return_msg><![CDATA[OK]]></return_msg></xml>";
/// 回调应答：受理失败，网关会按退避策略重发
pub const ACK_FAILURE: &str =
    "<xml><return_code><![CDATA[FAIL]]></return_code><return_msg><![CDATA[verification failed]]></return_msg></xml>";

/// v2支付结果通知（验签通过后的字段）
#[derive(Debug, Clone, Deserialize)]
pub struct WxNotify {
    pub appid: String,
    pub mch_id: String,
    #[serde(default)]
    pub sub_mch_id: Option<String>,
    pub out_trade_no: String,
    pub transaction_id: String,
    pub result_code: String,
    /// 订单金额（分，网关给的是字符串）
    pub total_fee: String,
    #[serde(default)]
    pub openid: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    #[serde(default)]
    pub attach: Option<String>,
}

impl WxNotify {
    /// 解析并验签v2回调的XML体。
    ///
    /// 验签失败返回`SignatureMismatch`，此时必须应答[`ACK_FAILURE`]，
    /// 绝不能把未验签的通知当作支付成功处理。
    pub fn from_xml_body(body: &str, key: &KeyMaterial, sign_type: SignType) -> PayResult<Self> {
        let params = xml_to_map(body)?;
        if params.get("return_code").map(String::as_str) != Some("SUCCESS") {
            return Err(PayError::Validation(format!(
                "notification return_code is not SUCCESS: {}",
                params.get("return_msg").map(String::as_str).unwrap_or("")
            )));
        }
        verify(&params, key, sign_type)?;
        Self::from_params(params)
    }

    fn from_params(params: HashMap<String, String>) -> PayResult<Self> {
        let value = serde_json::to_value(params)?;
        serde_json::from_value(value).map_err(|e| {
            PayError::Validation(format!("notification missing required field: {}", e))
        })
    }

    /// 业务结果是否成功
    pub fn is_paid(&self) -> bool {
        self.result_code == "SUCCESS"
    }

    /// 订单金额（分）
    pub fn total_fee_fen(&self) -> PayResult<i64> {
        self.total_fee.parse().map_err(|_| {
            PayError::Validation(format!("total_fee is not a number: {}", self.total_fee))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::{SIGN_FIELD, sign_params};
    use crate::wechat::xml::map_to_xml;

    fn notify_params() -> HashMap<String, String> {
        [
            ("appid", "wx8888888888888888"),
            ("mch_id", "1900000109"),
            ("out_trade_no", "T20240601001"),
            ("transaction_id", "4200001234202406010000000001"),
            ("return_code", "SUCCESS"),
            ("result_code", "SUCCESS"),
            ("total_fee", "1250"),
            ("openid", "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o"),
            ("time_end", "20240601183620"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn signed_body(mut params: HashMap<String, String>, key: &KeyMaterial) -> String {
        let signature = sign_params(&params, key, SignType::Md5).unwrap();
        params.insert(SIGN_FIELD.to_string(), signature);
        map_to_xml(&params)
    }

    #[test]
    fn test_notify_round_trip() {
        let key = KeyMaterial::secret("192006250b4c09247ec02edce69f6a2d");
        let body = signed_body(notify_params(), &key);
        let notify = WxNotify::from_xml_body(&body, &key, SignType::Md5).unwrap();
        assert_eq!(notify.out_trade_no, "T20240601001");
        assert_eq!(notify.total_fee_fen().unwrap(), 1250);
        assert!(notify.is_paid());
    }

    #[test]
    fn test_tampered_notify_rejected() {
        let key = KeyMaterial::secret("192006250b4c09247ec02edce69f6a2d");
        let body = signed_body(notify_params(), &key)
            .replace("<total_fee><![CDATA[1250]]>", "<total_fee><![CDATA[1]]>");
        assert!(matches!(
            WxNotify::from_xml_body(&body, &key, SignType::Md5),
            Err(PayError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_failed_return_code_rejected_before_verification() {
        let key = KeyMaterial::secret("k");
        let mut params = notify_params();
        params.insert("return_code".to_string(), "FAIL".to_string());
        let body = map_to_xml(&params);
        assert!(matches!(
            WxNotify::from_xml_body(&body, &key, SignType::Md5),
            Err(PayError::Validation(_))
        ));
    }
}
