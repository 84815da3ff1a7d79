use serde::{Deserialize, Serialize};

/// v2接口通用返回（unifiedorder/orderquery/micropay/refund共用一张表）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WxV2Response {
    pub return_code: String,
    #[serde(default)]
    pub return_msg: Option<String>,
    #[serde(default)]
    pub result_code: Option<String>,
    #[serde(default)]
    pub err_code: Option<String>,
    #[serde(default)]
    pub err_code_des: Option<String>,

    #[serde(default)]
    pub appid: Option<String>,
    #[serde(default)]
    pub mch_id: Option<String>,
    #[serde(default)]
    pub nonce_str: Option<String>,
    #[serde(default)]
    pub sign: Option<String>,

    #[serde(default)]
    pub trade_type: Option<String>,
    #[serde(default)]
    pub prepay_id: Option<String>,
    /// H5支付跳转链接
    #[serde(default)]
    pub mweb_url: Option<String>,
    /// Native支付二维码内容
    #[serde(default)]
    pub code_url: Option<String>,

    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub trade_state: Option<String>,
    #[serde(default)]
    pub trade_state_desc: Option<String>,
    #[serde(default)]
    pub total_fee: Option<String>,
    #[serde(default)]
    pub openid: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,

    #[serde(default)]
    pub partner_trade_no: Option<String>,
    /// 企业付款的微信付款单号
    #[serde(default)]
    pub payment_no: Option<String>,

    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub out_refund_no: Option<String>,
    #[serde(default)]
    pub refund_fee: Option<String>,
}

/// v2付款码支付请求
#[derive(Debug, Clone)]
pub struct MicroPayRequest {
    pub out_trade_no: String,
    /// 订单金额（分）
    pub total_fee: i64,
    /// 用户付款码
    pub auth_code: String,
    pub body: String,
    /// 终端IP
    pub spbill_create_ip: String,
}

/// v2退款请求
#[derive(Debug, Clone)]
pub struct WxRefundRequest {
    pub out_trade_no: String,
    /// 商户退款单号
    pub out_refund_no: String,
    /// 订单总金额（分）
    pub total_fee: i64,
    /// 退款金额（分）
    pub refund_fee: i64,
}

/// v2企业付款到零钱请求
#[derive(Debug, Clone)]
pub struct WxTransferRequest {
    /// 商户付款单号
    pub partner_trade_no: String,
    pub openid: String,
    /// 付款金额（分）
    pub amount: i64,
    pub desc: String,
    /// 校验收款人姓名时传入
    pub re_user_name: Option<String>,
}

/// 客户端调起支付的参数（v2与v3结构一致）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPayParams {
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

/// APP端调起支付的参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPayParams {
    pub appid: String,
    pub partnerid: String,
    pub prepayid: String,
    pub package: String,
    pub noncestr: String,
    pub timestamp: String,
    pub sign: String,
}

/// v3下单返回
#[derive(Debug, Clone, Deserialize)]
pub struct PrepayResponse {
    pub prepay_id: String,
}

/// v3订单查询返回
#[derive(Debug, Clone, Deserialize)]
pub struct V3OrderQueryResponse {
    pub out_trade_no: String,
    pub trade_state: String,
    #[serde(default)]
    pub trade_state_desc: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub success_time: Option<String>,
}

/// v3回调通知信封
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyEnvelope {
    pub id: String,
    pub create_time: String,
    pub event_type: String,
    pub resource_type: String,
    pub resource: NotifyResource,
    #[serde(default)]
    pub summary: Option<String>,
}

/// 回调通知里的加密资源
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyResource {
    pub algorithm: String,
    pub ciphertext: String,
    pub nonce: String,
    #[serde(default)]
    pub associated_data: String,
    #[serde(default)]
    pub original_type: Option<String>,
}

/// 解密后的v3支付结果
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResult {
    pub mchid: String,
    pub appid: String,
    pub out_trade_no: String,
    pub transaction_id: String,
    pub trade_type: String,
    pub trade_state: String,
    #[serde(default)]
    pub trade_state_desc: Option<String>,
    #[serde(default)]
    pub success_time: Option<String>,
    #[serde(default)]
    pub attach: Option<String>,
    pub payer: TransactionPayer,
    pub amount: TransactionAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPayer {
    pub openid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionAmount {
    pub total: i64,
    #[serde(default)]
    pub payer_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// /v3/certificates 返回
#[derive(Debug, Clone, Deserialize)]
pub struct CertificatesResponse {
    pub data: Vec<PlatformCertificateEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformCertificateEntry {
    pub serial_no: String,
    pub effective_time: String,
    pub expire_time: String,
    pub encrypt_certificate: EncryptedCertificate,
}

/// 平台证书密文（AES-256-GCM，密钥为api_v3_key）
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedCertificate {
    pub algorithm: String,
    pub nonce: String,
    pub associated_data: String,
    pub ciphertext: String,
}
