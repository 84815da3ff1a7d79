use crate::alipay::config::AlipayConfig;
use crate::alipay::models::*;
use crate::errors::{PayError, PayResult};
use crate::sign::{KeyMaterial, SIGN_FIELD, SignType, sign_params};
use crate::util::{Money, sanitize_subject};
use chrono::{FixedOffset, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// 订单标题最大长度（字符数）
const SUBJECT_MAX_CHARS: usize = 32;

/// 下单参数
#[derive(Debug, Clone)]
pub struct TradeOrder {
    /// 商户订单号
    pub out_trade_no: String,
    /// 订单标题
    pub subject: String,
    /// 订单金额
    pub amount: Money,
    /// 买家支付宝用户ID（可选）
    pub buyer_id: Option<String>,
}

/// 支付宝客户端。密钥在构造时解析一次，实例可跨线程并发使用。
#[derive(Debug, Clone)]
pub struct AlipayClient {
    config: Arc<AlipayConfig>,
    key_material: KeyMaterial,
    client: Client,
    sign_type: SignType,
}

impl AlipayClient {
    pub fn new(config: Arc<AlipayConfig>) -> PayResult<Self> {
        Self::with_client(config, Client::new())
    }

    /// 使用外部注入的HTTP客户端（代理、超时等由调用方配置）
    pub fn with_client(config: Arc<AlipayConfig>, client: Client) -> PayResult<Self> {
        let key_material = KeyMaterial::from_rsa_pem(
            Some(&config.private_key),
            Some(&config.public_key),
        )?;
        Ok(Self {
            config,
            key_material,
            client,
            sign_type: SignType::Rsa2,
        })
    }

    /// 改用旧版RSA（SHA-1）签名（默认RSA2）
    pub fn with_sign_type(mut self, sign_type: SignType) -> PayResult<Self> {
        if !matches!(sign_type, SignType::Rsa | SignType::Rsa2) {
            return Err(PayError::Validation(format!(
                "Alipay only supports RSA/RSA2, got {}",
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
    fn base_params(&self, method: &str) -> HashMap<String, String> {
        let timestamp = Utc::now()
            .with_timezone(&FixedOffset::east_opt(8 * 3600).expect("fixed offset"))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let mut m = HashMap::new();
        m.insert("app_id".to_string(), self.config.app_id.clone());
        m.insert("method".to_string(), method.to_string());
        m.insert("format".to_string(), "JSON".to_string());
        m.insert("charset".to_string(), "utf-8".to_string());
        m.insert("timestamp".to_string(), timestamp);
        m.insert("version".to_string(), "1.0".to_string());
        m.insert("sign_type".to_string(), self.sign_type.as_str().to_string());
        m
    }

    /// 组装并签名一次完整请求的参数集
    fn signed_params(
        &self,
        method: &str,
        biz_content: serde_json::Value,
        with_notify_url: bool,
    ) -> PayResult<HashMap<String, String>> {
        let mut m = self.base_params(method);
        if with_notify_url && !self.config.notify_url.is_empty() {
            m.insert("notify_url".to_string(), self.config.notify_url.clone());
        }
        m.insert("biz_content".to_string(), biz_content.to_string());
        let signature = sign_params(&m, &self.key_material, self.sign_type)?;
        m.insert(SIGN_FIELD.to_string(), signature);
        Ok(m)
    }

    fn order_biz_content(&self, order: &TradeOrder) -> serde_json::Value {
        let mut biz = json!({
            "subject": sanitize_subject(&order.subject, SUBJECT_MAX_CHARS),
            "out_trade_no": order.out_trade_no,
            "total_amount": order.amount.to_yuan_string(),
        });
        if let Some(buyer_id) = &order.buyer_id {
            biz["buyer_id"] = json!(buyer_id);
        }
        biz
    }

    /// App支付：返回移动端SDK调起支付所需的urlencoded参数串
    pub fn app_pay_order_string(&self, order: &TradeOrder) -> PayResult<String> {
        let m = self.signed_params(
            "alipay.trade.app.pay",
            self.order_biz_content(order),
            true,
        )?;
        Ok(to_url_query(&m))
    }

    /// H5支付：返回自动提交的HTML表单
    pub fn wap_pay_form(&self, order: &TradeOrder) -> PayResult<String> {
        let mut biz = self.order_biz_content(order);
        biz["product_code"] = json!("QUICK_WAP_WAY");
        let m = self.signed_params("alipay.trade.wap.pay", biz, true)?;

        let inputs: String = m
            .iter()
            .map(|(k, v)| {
                format!(
                    "<input type='hidden' name='{}' value='{}'>",
                    k,
                    v.replace('\'', "&apos;")
                )
            })
            .collect();
        Ok(format!(
            "<html>\n<meta http-equiv=Content-Type content=\"text/html;charset=utf-8\">\n<body>\n\
             <form id='paysubmit' name='paysubmit' action='{}?charset=utf-8' method='GET'>\n{}\n\
             <input type='submit' value='ok' style='display:none'>\n</form>\n\
             <script>(function(){{document.forms['paysubmit'].submit();}})();</script>\n\
             </body>\n</html>",
            self.config.gateway_url, inputs
        ))
    }

    /// 创建交易（alipay.trade.create）
    pub async fn create_trade(&self, order: &TradeOrder) -> PayResult<TradeCreateResponse> {
        let m = self.signed_params(
            "alipay.trade.create",
            self.order_biz_content(order),
            true,
        )?;
        self.execute("alipay_trade_create_response", &m).await
    }

    /// 当面付预下单，返回二维码内容（alipay.trade.precreate）
    pub async fn precreate(&self, order: &TradeOrder) -> PayResult<PrecreateResponse> {
        let m = self.signed_params(
            "alipay.trade.precreate",
            self.order_biz_content(order),
            true,
        )?;
        self.execute("alipay_trade_precreate_response", &m).await
    }

    /// 查询交易（alipay.trade.query）
    pub async fn query_trade(&self, out_trade_no: &str) -> PayResult<TradeQueryResponse> {
        let m = self.signed_params(
            "alipay.trade.query",
            json!({ "out_trade_no": out_trade_no }),
            false,
        )?;
        self.execute("alipay_trade_query_response", &m).await
    }

    /// 退款（alipay.trade.refund）
    pub async fn refund(&self, request: &RefundRequest) -> PayResult<RefundResponse> {
        if request.out_trade_no.is_none() && request.trade_no.is_none() {
            return Err(PayError::Validation(
                "refund requires out_trade_no or trade_no".to_string(),
            ));
        }
        let m = self.signed_params(
            "alipay.trade.refund",
            serde_json::to_value(request)?,
            false,
        )?;
        self.execute("alipay_trade_refund_response", &m).await
    }

    /// 退款查询（alipay.trade.fastpay.refund.query）
    pub async fn query_refund(
        &self,
        out_trade_no: &str,
        out_request_no: &str,
    ) -> PayResult<RefundResponse> {
        let m = self.signed_params(
            "alipay.trade.fastpay.refund.query",
            json!({
                "out_trade_no": out_trade_no,
                "out_request_no": out_request_no,
            }),
            false,
        )?;
        self.execute("alipay_trade_fastpay_refund_query_response", &m)
            .await
    }

    /// 单笔转账到支付宝账户（alipay.fund.trans.toaccount.transfer）
    pub async fn transfer(&self, request: &TransferRequest) -> PayResult<TransferResponse> {
        let m = self.signed_params(
            "alipay.fund.trans.toaccount.transfer",
            serde_json::to_value(request)?,
            false,
        )?;
        self.execute("alipay_fund_trans_toaccount_transfer_response", &m)
            .await
    }

    /// 发送请求并取出业务响应节点
    async fn execute<T: DeserializeOwned>(
        &self,
        response_node: &str,
        params: &HashMap<String, String>,
    ) -> PayResult<T> {
        let response = self
            .client
            .post(&self.config.gateway_url)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Alipay gateway error: {} - {}", status, error_text);
            return Err(PayError::Gateway(format!(
                "gateway returned {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        debug!("Alipay response: {}", body);

        let value: serde_json::Value = serde_json::from_str(&body)?;
        let node = value.get(response_node).ok_or_else(|| {
            PayError::Gateway(format!("missing {} in gateway response", response_node))
        })?;
        Ok(serde_json::from_value(node.clone())?)
    }
}

/// 参数集转urlencoded串，按字段名排序保证输出稳定
fn to_url_query(m: &HashMap<String, String>) -> String {
    let mut entries: Vec<(&str, &str)> = m.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    entries
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
