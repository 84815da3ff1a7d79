use serde::{Deserialize, Serialize};

/// 网关公共返回字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlipayResponse {
    pub code: String,
    pub msg: String,
    #[serde(default)]
    pub sub_code: Option<String>,
    #[serde(default)]
    pub sub_msg: Option<String>,
}

impl AlipayResponse {
    /// 网关成功码为"10000"
    pub fn is_success(&self) -> bool {
        self.code == "10000"
    }
}

/// alipay.trade.create 返回
#[derive(Debug, Clone, Deserialize)]
pub struct TradeCreateResponse {
    #[serde(flatten)]
    pub response: AlipayResponse,
    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub trade_no: Option<String>,
}

/// alipay.trade.precreate 返回（当面付二维码）
#[derive(Debug, Clone, Deserialize)]
pub struct PrecreateResponse {
    #[serde(flatten)]
    pub response: AlipayResponse,
    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// alipay.trade.query 返回
#[derive(Debug, Clone, Deserialize)]
pub struct TradeQueryResponse {
    #[serde(flatten)]
    pub response: AlipayResponse,
    #[serde(default)]
    pub trade_no: Option<String>,
    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub buyer_logon_id: Option<String>,
    #[serde(default)]
    pub trade_status: Option<String>,
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub buyer_user_id: Option<String>,
    #[serde(default)]
    pub send_pay_date: Option<String>,
}

/// 退款请求业务参数
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefundRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_trade_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_no: Option<String>,
    pub refund_amount: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refund_reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub out_request_no: String,
}

/// alipay.trade.refund / alipay.trade.fastpay.refund.query 返回
#[derive(Debug, Clone, Deserialize)]
pub struct RefundResponse {
    #[serde(flatten)]
    pub response: AlipayResponse,
    #[serde(default)]
    pub trade_no: Option<String>,
    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub buyer_logon_id: Option<String>,
    /// 本次退款是否发生了资金变化
    #[serde(default)]
    pub fund_change: Option<String>,
    /// 退款总金额
    #[serde(default)]
    pub refund_fee: Option<String>,
    #[serde(default)]
    pub gmt_refund_pay: Option<String>,
}

/// 单笔转账请求业务参数
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    /// 商户转账唯一订单号
    pub out_biz_no: String,
    /// 收款方账户类型，如 ALIPAY_LOGONID
    pub payee_type: String,
    /// 收款方账户
    pub payee_account: String,
    /// 转账金额（元）
    pub amount: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub payer_show_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub payee_real_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remark: String,
}

/// alipay.fund.trans.toaccount.transfer 返回
#[derive(Debug, Clone, Deserialize)]
pub struct TransferResponse {
    #[serde(flatten)]
    pub response: AlipayResponse,
    #[serde(default)]
    pub out_biz_no: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub pay_date: Option<String>,
}
