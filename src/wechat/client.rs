use crate::errors::{PayError, PayResult};
use crate::sign::{KeyMaterial, SIGN_FIELD, SIGN_TYPE_FIELD, SignType, sign_params};
use crate::util::{Money, nonce_str};
use crate::wechat::config::WxConfig;
use crate::wechat::models::*;
use crate::wechat::xml::map_to_xml;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// v2交易类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    /// APP支付
    App,
    /// 公众号/小程序支付
    Jsapi,
    /// 扫码支付
    Native,
    /// H5支付
    Mweb,
}

impl TradeType {
    fn as_str(&self) -> &'static str {
        match self {
            TradeType::App => "APP",
            TradeType::Jsapi => "JSAPI",
            TradeType::Native => "NATIVE",
            TradeType::Mweb => "MWEB",
        }
    }
}

/// v2下单参数
#[derive(Debug, Clone)]
pub struct WxOrder {
    /// 商户订单号
    pub out_trade_no: String,
    /// 商品描述
    pub body: String,
    /// 订单金额
    pub amount: Money,
    /// 终端IP
    pub spbill_create_ip: String,
    /// 用户openid（JSAPI必填）
    pub openid: Option<String>,
    /// 场景信息JSON（MWEB必填）
    pub scene_info: Option<String>,
    /// 商户透传数据（可选）
    pub attach: Option<String>,
}

/// 微信支付v2客户端（XML接口）。
///
/// 退款与企业付款接口要求商户API证书，走这两个接口时用
/// [`WxClient::with_client`]注入配置了客户端证书的`reqwest::Client`。
#[derive(Debug, Clone)]
pub struct WxClient {
    config: Arc<WxConfig>,
    key_material: KeyMaterial,
    client: Client,
    sign_type: SignType,
}

impl WxClient {
    pub fn new(config: Arc<WxConfig>) -> Self {
        Self::with_client(config, Client::new())
    }

    /// 使用外部注入的HTTP客户端（商户证书、代理、超时等由调用方配置）
    pub fn with_client(config: Arc<WxConfig>, client: Client) -> Self {
        let key_material = KeyMaterial::secret(&config.pay_key);
        Self {
            config,
            key_material,
            client,
            sign_type: SignType::Md5,
        }
    }

    /// 改用HMAC-SHA256签名（默认MD5）
    pub fn with_sign_type(mut self, sign_type: SignType) -> PayResult<Self> {
        if !matches!(sign_type, SignType::Md5 | SignType::HmacSha256) {
            return Err(PayError::Validation(format!(
                "WeChat v2 only supports MD5/HMAC-SHA256, got {}",
                sign_type
            )));
        }
        self.sign_type = sign_type;
        Ok(self)
    }

    pub fn key_material(&self) -> &KeyMaterial {
        &self.key_material
    }

    /// 拼装协议公共参数
    fn base_params(&self) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("appid".to_string(), self.config.app_id.clone());
        m.insert("mch_id".to_string(), self.config.mch_id.clone());
        if let Some(sub_mch_id) = &self.config.sub_mch_id {
            m.insert("sub_mch_id".to_string(), sub_mch_id.clone());
        }
        m.insert("nonce_str".to_string(), nonce_str());
        if self.sign_type == SignType::HmacSha256 {
            // HMAC-SHA256必须显式声明，且该字段参与签名
            m.insert(
                SIGN_TYPE_FIELD.to_string(),
                self.sign_type.as_str().to_string(),
            );
        }
        m
    }

    /// 签名并序列化为请求体XML
    fn signed_xml(&self, mut params: HashMap<String, String>) -> PayResult<String> {
        let signature = sign_params(&params, &self.key_material, self.sign_type)?;
        params.insert(SIGN_FIELD.to_string(), signature);
        Ok(map_to_xml(&params))
    }

    /// 统一下单（pay/unifiedorder）
    pub async fn unified_order(
        &self,
        order: &WxOrder,
        trade_type: TradeType,
    ) -> PayResult<WxV2Response> {
        if trade_type == TradeType::Jsapi && order.openid.is_none() {
            return Err(PayError::Validation(
                "JSAPI order requires openid".to_string(),
            ));
        }
        if trade_type == TradeType::Mweb && order.scene_info.is_none() {
            return Err(PayError::Validation(
                "MWEB order requires scene_info".to_string(),
            ));
        }
        let mut m = self.base_params();
        m.insert("body".to_string(), order.body.clone());
        m.insert("out_trade_no".to_string(), order.out_trade_no.clone());
        m.insert("total_fee".to_string(), order.amount.to_fen_string());
        m.insert(
            "spbill_create_ip".to_string(),
            order.spbill_create_ip.clone(),
        );
        m.insert("notify_url".to_string(), self.config.notify_url.clone());
        m.insert("trade_type".to_string(), trade_type.as_str().to_string());
        if let Some(openid) = &order.openid {
            m.insert("openid".to_string(), openid.clone());
        }
        if let Some(scene_info) = &order.scene_info {
            m.insert("scene_info".to_string(), scene_info.clone());
        }
        if let Some(attach) = &order.attach {
            m.insert("attach".to_string(), attach.clone());
        }
        self.post_xml("/pay/unifiedorder", m).await
    }

    /// 扫码支付：统一下单并取出二维码内容
    pub async fn native_pay(&self, order: &WxOrder) -> PayResult<String> {
        let response = self.unified_order(order, TradeType::Native).await?;
        response
            .code_url
            .ok_or_else(|| PayError::Gateway("missing code_url in unifiedorder response".to_string()))
    }

    /// H5支付：统一下单并取出跳转链接（`order.scene_info`必填）
    pub async fn h5_pay(&self, order: &WxOrder) -> PayResult<String> {
        let response = self.unified_order(order, TradeType::Mweb).await?;
        response
            .mweb_url
            .ok_or_else(|| PayError::Gateway("missing mweb_url in unifiedorder response".to_string()))
    }

    /// APP端调起支付的参数（对prepay_id二次签名）
    pub fn app_pay_params(&self, prepay_id: &str) -> PayResult<AppPayParams> {
        let mut m = HashMap::new();
        m.insert("appid".to_string(), self.config.app_id.clone());
        m.insert("partnerid".to_string(), self.config.mch_id.clone());
        m.insert("prepayid".to_string(), prepay_id.to_string());
        m.insert("package".to_string(), "Sign=WXPay".to_string());
        m.insert("noncestr".to_string(), nonce_str());
        m.insert("timestamp".to_string(), Utc::now().timestamp().to_string());
        let signature = sign_params(&m, &self.key_material, self.sign_type)?;
        Ok(AppPayParams {
            appid: m.remove("appid").unwrap_or_default(),
            partnerid: m.remove("partnerid").unwrap_or_default(),
            prepayid: m.remove("prepayid").unwrap_or_default(),
            package: m.remove("package").unwrap_or_default(),
            noncestr: m.remove("noncestr").unwrap_or_default(),
            timestamp: m.remove("timestamp").unwrap_or_default(),
            sign: signature,
        })
    }

    /// 公众号/小程序调起支付的参数（字段名为驼峰，与下单参数不同）
    pub fn jsapi_pay_params(&self, prepay_id: &str) -> PayResult<ClientPayParams> {
        let time_stamp = Utc::now().timestamp().to_string();
        let nonce = nonce_str();
        let package = format!("prepay_id={}", prepay_id);
        let mut m = HashMap::new();
        m.insert("appId".to_string(), self.config.app_id.clone());
        m.insert("timeStamp".to_string(), time_stamp.clone());
        m.insert("nonceStr".to_string(), nonce.clone());
        m.insert("package".to_string(), package.clone());
        m.insert("signType".to_string(), self.sign_type.as_str().to_string());
        let pay_sign = sign_params(&m, &self.key_material, self.sign_type)?;
        Ok(ClientPayParams {
            time_stamp,
            nonce_str: nonce,
            package,
            sign_type: self.sign_type.as_str().to_string(),
            pay_sign,
        })
    }

    fn micropay_params(&self, request: &MicroPayRequest) -> HashMap<String, String> {
        let mut m = self.base_params();
        m.insert("body".to_string(), request.body.clone());
        m.insert("out_trade_no".to_string(), request.out_trade_no.clone());
        m.insert("total_fee".to_string(), request.total_fee.to_string());
        m.insert("auth_code".to_string(), request.auth_code.clone());
        m.insert(
            "spbill_create_ip".to_string(),
            request.spbill_create_ip.clone(),
        );
        m
    }

    /// 付款码支付（pay/micropay）
    pub async fn micropay(&self, request: &MicroPayRequest) -> PayResult<WxV2Response> {
        let m = self.micropay_params(request);
        self.post_xml("/pay/micropay", m).await
    }

    /// 订单查询（pay/orderquery）
    pub async fn query_order(&self, out_trade_no: &str) -> PayResult<WxV2Response> {
        let mut m = self.base_params();
        m.insert("out_trade_no".to_string(), out_trade_no.to_string());
        self.post_xml("/pay/orderquery", m).await
    }

    /// 申请退款（secapi/pay/refund，需商户证书）
    pub async fn refund(&self, request: &WxRefundRequest) -> PayResult<WxV2Response> {
        let mut m = self.base_params();
        m.insert("out_trade_no".to_string(), request.out_trade_no.clone());
        m.insert("out_refund_no".to_string(), request.out_refund_no.clone());
        m.insert("total_fee".to_string(), request.total_fee.to_string());
        m.insert("refund_fee".to_string(), request.refund_fee.to_string());
        self.post_xml("/secapi/pay/refund", m).await
    }

    /// 企业付款到零钱（mmpaymkttransfers/promotion/transfers，需商户证书）。
    /// 该接口的公共字段名与交易接口不同（mch_appid/mchid），不支持服务商模式。
    pub async fn transfer_to_balance(
        &self,
        request: &WxTransferRequest,
    ) -> PayResult<WxV2Response> {
        let mut m = HashMap::new();
        m.insert("mch_appid".to_string(), self.config.app_id.clone());
        m.insert("mchid".to_string(), self.config.mch_id.clone());
        m.insert("nonce_str".to_string(), nonce_str());
        m.insert(
            "partner_trade_no".to_string(),
            request.partner_trade_no.clone(),
        );
        m.insert("openid".to_string(), request.openid.clone());
        m.insert("amount".to_string(), request.amount.to_string());
        m.insert("desc".to_string(), request.desc.clone());
        match &request.re_user_name {
            Some(name) => {
                m.insert("check_name".to_string(), "FORCE_CHECK".to_string());
                m.insert("re_user_name".to_string(), name.clone());
            }
            None => {
                m.insert("check_name".to_string(), "NO_CHECK".to_string());
            }
        }
        self.post_xml("/mmpaymkttransfers/promotion/transfers", m)
            .await
    }

    /// 发送XML请求并检查两级状态码
    async fn post_xml(
        &self,
        path: &str,
        params: HashMap<String, String>,
    ) -> PayResult<WxV2Response> {
        let body = self.signed_xml(params)?;
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("WeChat gateway error: {} - {}", status, error_text);
            return Err(PayError::Gateway(format!(
                "gateway returned {}: {}",
                status, error_text
            )));
        }

        let text = response.text().await?;
        debug!("WeChat v2 response from {}: {}", path, text);
        let parsed: WxV2Response = quick_xml::de::from_str(&text)
            .map_err(|e| PayError::Xml(format!("error decoding v2 response: {}", e)))?;
        check_response(&parsed)?;
        Ok(parsed)
    }
}

/// 通信与业务两级状态都必须是SUCCESS
fn check_response(response: &WxV2Response) -> PayResult<()> {
    if response.return_code != "SUCCESS" {
        return Err(PayError::Gateway(format!(
            "gateway rejected request: {}",
            response.return_msg.as_deref().unwrap_or("unknown")
        )));
    }
    if response.result_code.as_deref() != Some("SUCCESS") {
        return Err(PayError::Gateway(format!(
            "business failure {}: {}",
            response.err_code.as_deref().unwrap_or("unknown"),
            response.err_code_des.as_deref().unwrap_or("")
        )));
    }
    Ok(())
}
