//! 微信支付v3（REST接口）客户端。
//!
//! 请求签名进Authorization头，回调用平台证书验签，
//! 通知资源用APIv3密钥做AES-256-GCM解密。

use crate::errors::{PayError, PayResult};
use crate::sign::keys::{certificate_public_key, load_certificate, load_private_key};
use crate::util::{Money, nonce_str};
use crate::wechat::config::WxV3Config;
use crate::wechat::models::*;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::json;
use sha1::Sha1;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, error};

const AUTH_SCHEMA: &str = "WECHATPAY2-SHA256-RSA2048";
/// APIv3密钥固定32字节
const API_V3_KEY_LEN: usize = 32;
/// GCM nonce固定12字节
const GCM_NONCE_LEN: usize = 12;

/// 解密后的平台证书
#[derive(Debug, Clone)]
pub struct PlatformCertificate {
    pub serial_no: String,
    pub effective_time: String,
    pub expire_time: String,
    /// PEM格式证书文本
    pub certificate: String,
}

/// 微信支付v3客户端。密钥与平台证书在构造时解析一次，实例可跨线程并发使用。
#[derive(Clone)]
pub struct WxV3Client {
    config: Arc<WxV3Config>,
    private_key: RsaPrivateKey,
    platform_key: Option<RsaPublicKey>,
    client: Client,
}

impl WxV3Client {
    pub fn new(config: Arc<WxV3Config>) -> PayResult<Self> {
        Self::with_client(config, Client::new())
    }

    /// 使用外部注入的HTTP客户端（代理、超时等由调用方配置）
    pub fn with_client(config: Arc<WxV3Config>, client: Client) -> PayResult<Self> {
        if config.api_v3_key.len() != API_V3_KEY_LEN {
            return Err(PayError::KeyFormat(format!(
                "APIv3 key must be {} bytes, got {}",
                API_V3_KEY_LEN,
                config.api_v3_key.len()
            )));
        }
        let private_key = load_private_key(&config.private_key)?;
        let platform_key = config
            .platform_cert
            .as_deref()
            .map(|pem| certificate_public_key(&load_certificate(pem)?))
            .transpose()?;
        Ok(Self {
            config,
            private_key,
            platform_key,
            client,
        })
    }

    /// 直接注入平台公钥（证书轮换后从[`WxV3Client::fetch_certificates`]的结果更新）
    pub fn with_platform_public_key(mut self, key: RsaPublicKey) -> Self {
        self.platform_key = Some(key);
        self
    }

    fn platform_public_key(&self) -> PayResult<&RsaPublicKey> {
        self.platform_key.as_ref().ok_or_else(|| {
            PayError::KeyFormat("WeChat platform certificate not configured".to_string())
        })
    }

    /// 构造待签名串：`方法\n路径\n时间戳\n随机串\n请求体\n`
    fn build_message(method: &str, path: &str, timestamp: i64, nonce: &str, body: &str) -> String {
        format!("{}\n{}\n{}\n{}\n{}\n", method, path, timestamp, nonce, body)
    }

    fn sign_message(&self, message: &str) -> PayResult<String> {
        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .try_sign(message.as_bytes())
            .map_err(|e| PayError::Crypto(format!("RSA-SHA256 signing failed: {}", e)))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    /// 组装Authorization头（path须含query串）
    fn authorization(&self, method: &str, path: &str, body: &str) -> PayResult<String> {
        let timestamp = Utc::now().timestamp();
        let nonce = nonce_str();
        let message = Self::build_message(method, path, timestamp, &nonce, body);
        let signature = self.sign_message(&message)?;
        Ok(format!(
            "{} mchid=\"{}\",nonce_str=\"{}\",signature=\"{}\",timestamp=\"{}\",serial_no=\"{}\"",
            AUTH_SCHEMA, self.config.mch_id, nonce, signature, timestamp, self.config.serial_no
        ))
    }

    async fn request(&self, method: reqwest::Method, path: &str, body: String) -> PayResult<String> {
        let authorization = self.authorization(method.as_str(), path, &body)?;
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self
            .client
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            // 网关要求必须带User-Agent
            .header(
                reqwest::header::USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            );
        if !body.is_empty() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("WeChat v3 gateway error: {} - {}", status, text);
            return Err(PayError::Gateway(format!(
                "gateway returned {}: {}",
                status, text
            )));
        }
        debug!("WeChat v3 response from {}: {}", path, text);
        Ok(text)
    }

    fn order_body(&self, order: &V3Order, payer_openid: Option<&str>) -> serde_json::Value {
        let mut body = json!({
            "appid": self.config.app_id,
            "mchid": self.config.mch_id,
            "description": order.description,
            "out_trade_no": order.out_trade_no,
            "notify_url": self.config.notify_url,
            "amount": {
                "total": order.amount.to_cents(),
                "currency": "CNY",
            },
        });
        if let Some(attach) = &order.attach {
            body["attach"] = json!(attach);
        }
        if let Some(openid) = payer_openid {
            body["payer"] = json!({ "openid": openid });
        }
        body
    }

    /// JSAPI/小程序下单（/v3/pay/transactions/jsapi）
    pub async fn jsapi_prepay(&self, order: &V3Order, openid: &str) -> PayResult<PrepayResponse> {
        let body = self.order_body(order, Some(openid)).to_string();
        let text = self
            .request(reqwest::Method::POST, "/v3/pay/transactions/jsapi", body)
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// APP下单（/v3/pay/transactions/app）
    pub async fn app_prepay(&self, order: &V3Order) -> PayResult<PrepayResponse> {
        let body = self.order_body(order, None).to_string();
        let text = self
            .request(reqwest::Method::POST, "/v3/pay/transactions/app", body)
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 小程序/公众号调起支付的参数（对prepay_id二次签名，v3下signType固定RSA）
    pub fn jsapi_pay_params(&self, prepay_id: &str) -> PayResult<ClientPayParams> {
        let time_stamp = Utc::now().timestamp().to_string();
        let nonce = nonce_str();
        let package = format!("prepay_id={}", prepay_id);
        let message = format!(
            "{}\n{}\n{}\n{}\n",
            self.config.app_id, time_stamp, nonce, package
        );
        let pay_sign = self.sign_message(&message)?;
        Ok(ClientPayParams {
            time_stamp,
            nonce_str: nonce,
            package,
            sign_type: "RSA".to_string(),
            pay_sign,
        })
    }

    /// APP端调起支付的参数
    pub fn app_pay_params(&self, prepay_id: &str) -> PayResult<AppPayParams> {
        let timestamp = Utc::now().timestamp().to_string();
        let nonce = nonce_str();
        let message = format!(
            "{}\n{}\n{}\n{}\n",
            self.config.app_id, timestamp, nonce, prepay_id
        );
        let sign = self.sign_message(&message)?;
        Ok(AppPayParams {
            appid: self.config.app_id.clone(),
            partnerid: self.config.mch_id.clone(),
            prepayid: prepay_id.to_string(),
            package: "Sign=WXPay".to_string(),
            noncestr: nonce,
            timestamp,
            sign,
        })
    }

    /// 商户订单号查单（/v3/pay/transactions/out-trade-no/{no}）
    pub async fn query_by_out_trade_no(
        &self,
        out_trade_no: &str,
    ) -> PayResult<V3OrderQueryResponse> {
        let path = format!(
            "/v3/pay/transactions/out-trade-no/{}?mchid={}",
            out_trade_no, self.config.mch_id
        );
        let text = self.request(reqwest::Method::GET, &path, String::new()).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 关单（/v3/pay/transactions/out-trade-no/{no}/close）
    pub async fn close_transaction(&self, out_trade_no: &str) -> PayResult<()> {
        let path = format!("/v3/pay/transactions/out-trade-no/{}/close", out_trade_no);
        let body = json!({ "mchid": self.config.mch_id }).to_string();
        self.request(reqwest::Method::POST, &path, body).await?;
        Ok(())
    }

    /// 下载并解密平台证书（/v3/certificates）
    pub async fn fetch_certificates(&self) -> PayResult<Vec<PlatformCertificate>> {
        let text = self
            .request(reqwest::Method::GET, "/v3/certificates", String::new())
            .await?;
        let response: CertificatesResponse = serde_json::from_str(&text)?;
        response
            .data
            .into_iter()
            .map(|entry| {
                let pem = self.decrypt_to_string(
                    &entry.encrypt_certificate.ciphertext,
                    &entry.encrypt_certificate.nonce,
                    &entry.encrypt_certificate.associated_data,
                )?;
                Ok(PlatformCertificate {
                    serial_no: entry.serial_no,
                    effective_time: entry.effective_time,
                    expire_time: entry.expire_time,
                    certificate: pem,
                })
            })
            .collect()
    }

    /// 验证回调通知头部签名。
    ///
    /// 验签失败返回`SignatureMismatch`，此时必须以失败应答，
    /// 绝不能把未验签的通知当作支付结果处理。
    pub fn verify_notification(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &str,
        signature: &str,
    ) -> PayResult<()> {
        let message = format!("{}\n{}\n{}\n", timestamp, nonce, body);
        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(signature)
            .map_err(|e| PayError::Encoding(format!("signature is not valid base64: {}", e)))?;
        let signature =
            Signature::try_from(sig_bytes.as_slice()).map_err(|_| PayError::SignatureMismatch)?;
        VerifyingKey::<Sha256>::new(self.platform_public_key()?.clone())
            .verify(message.as_bytes(), &signature)
            .map_err(|_| PayError::SignatureMismatch)
    }

    /// 解密通知里的资源密文（AES-256-GCM，附加数据参与校验）
    pub fn decrypt_resource(&self, resource: &NotifyResource) -> PayResult<Vec<u8>> {
        self.decrypt(
            &resource.ciphertext,
            &resource.nonce,
            &resource.associated_data,
        )
    }

    /// 验签并解密一条支付结果通知
    pub fn parse_notification(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &str,
        signature: &str,
    ) -> PayResult<TransactionResult> {
        self.verify_notification(timestamp, nonce, body, signature)?;
        let envelope: NotifyEnvelope = serde_json::from_str(body)?;
        let plaintext = self.decrypt_resource(&envelope.resource)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn decrypt(&self, ciphertext_b64: &str, nonce: &str, aad: &str) -> PayResult<Vec<u8>> {
        if nonce.len() != GCM_NONCE_LEN {
            return Err(PayError::Crypto(format!(
                "GCM nonce must be {} bytes, got {}",
                GCM_NONCE_LEN,
                nonce.len()
            )));
        }
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(ciphertext_b64)
            .map_err(|e| PayError::Encoding(format!("ciphertext is not valid base64: {}", e)))?;
        let cipher = Aes256Gcm::new_from_slice(self.config.api_v3_key.as_bytes())
            .map_err(|e| PayError::KeyFormat(format!("Invalid APIv3 key: {}", e)))?;
        cipher
            .decrypt(
                Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: &ciphertext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| PayError::Crypto("AES-GCM decryption failed".to_string()))
    }

    fn decrypt_to_string(&self, ciphertext: &str, nonce: &str, aad: &str) -> PayResult<String> {
        let bytes = self.decrypt(ciphertext, nonce, aad)?;
        String::from_utf8(bytes)
            .map_err(|e| PayError::Encoding(format!("decrypted payload is not utf-8: {}", e)))
    }

    /// 敏感字段加密（RSA-OAEP-SHA1，平台证书公钥），随请求头
    /// `Wechatpay-Serial`一起上送
    pub fn encrypt_sensitive(&self, plaintext: &str) -> PayResult<String> {
        let encrypted = self
            .platform_public_key()?
            .encrypt(
                &mut rand::rngs::OsRng,
                Oaep::new::<Sha1>(),
                plaintext.as_bytes(),
            )
            .map_err(|e| PayError::Crypto(format!("RSA-OAEP encryption failed: {}", e)))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }
}

/// v3下单参数
#[derive(Debug, Clone)]
pub struct V3Order {
    /// 商户订单号
    pub out_trade_no: String,
    /// 商品描述
    pub description: String,
    /// 订单金额
    pub amount: Money,
    /// 商户透传数据（可选）
    pub attach: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};

    fn test_client() -> WxV3Client {
        let key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let config = Arc::new(WxV3Config {
            app_id: "wx8888888888888888".to_string(),
            mch_id: "1900000109".to_string(),
            serial_no: "5157F09EFDC096DE15EBE81A47057A72".to_string(),
            private_key: key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
            api_v3_key: "0123456789abcdef0123456789abcdef".to_string(),
            platform_cert: None,
            notify_url: "https://example.com/notify/wechat".to_string(),
            base_url: "https://api.mch.weixin.qq.com".to_string(),
        });
        WxV3Client::new(config).unwrap()
    }

    /// 模拟平台侧：用平台私钥对通知串签名
    fn platform_sign(key: &RsaPrivateKey, message: &str) -> String {
        let signature = SigningKey::<Sha256>::new(key.clone())
            .try_sign(message.as_bytes())
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())
    }

    #[test]
    fn test_build_message() {
        let message = WxV3Client::build_message(
            "GET",
            "/v3/certificates",
            1554208460,
            "593BEC0C930BF1AFEB40B4A08C8FB242",
            "",
        );
        assert_eq!(
            message,
            "GET\n/v3/certificates\n1554208460\n593BEC0C930BF1AFEB40B4A08C8FB242\n\n"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let client = test_client();
        let header = client
            .authorization("POST", "/v3/pay/transactions/jsapi", "{}")
            .unwrap();
        assert!(header.starts_with("WECHATPAY2-SHA256-RSA2048 mchid=\"1900000109\""));
        assert!(header.contains("serial_no=\"5157F09EFDC096DE15EBE81A47057A72\""));
        assert!(header.contains("signature=\""));
    }

    #[test]
    fn test_jsapi_pay_params_signature_verifies() {
        let client = test_client();
        let params = client.jsapi_pay_params("wx0001").unwrap();
        assert_eq!(params.sign_type, "RSA");
        assert_eq!(params.package, "prepay_id=wx0001");

        let message = format!(
            "wx8888888888888888\n{}\n{}\n{}\n",
            params.time_stamp, params.nonce_str, params.package
        );
        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(&params.pay_sign)
            .unwrap();
        let signature = Signature::try_from(sig_bytes.as_slice()).unwrap();
        VerifyingKey::<Sha256>::new(client.private_key.to_public_key())
            .verify(message.as_bytes(), &signature)
            .unwrap();
    }

    #[test]
    fn test_notification_verify_and_decrypt() {
        let platform_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let client = test_client().with_platform_public_key(platform_key.to_public_key());

        let transaction = serde_json::json!({
            "mchid": "1900000109",
            "appid": "wx8888888888888888",
            "out_trade_no": "T20240601001",
            "transaction_id": "4200001234202406010000000001",
            "trade_type": "JSAPI",
            "trade_state": "SUCCESS",
            "payer": { "openid": "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o" },
            "amount": { "total": 1250 }
        })
        .to_string();

        let nonce = "abc123abc123";
        let cipher = Aes256Gcm::new_from_slice("0123456789abcdef0123456789abcdef".as_bytes())
            .unwrap();
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: transaction.as_bytes(),
                    aad: b"transaction",
                },
            )
            .unwrap();
        let body = serde_json::json!({
            "id": "EV-2018022511223320873",
            "create_time": "2024-06-01T18:36:20+08:00",
            "event_type": "TRANSACTION.SUCCESS",
            "resource_type": "encrypt-resource",
            "resource": {
                "algorithm": "AEAD_AES_256_GCM",
                "ciphertext": base64::engine::general_purpose::STANDARD.encode(&ciphertext),
                "associated_data": "transaction",
                "nonce": nonce,
            }
        })
        .to_string();

        let timestamp = "1717238180";
        let header_nonce = "593BEC0C930BF1AFEB40B4A08C8FB242";
        let message = format!("{}\n{}\n{}\n", timestamp, header_nonce, body);
        let signature = platform_sign(&platform_key, &message);

        let result = client
            .parse_notification(timestamp, header_nonce, &body, &signature)
            .unwrap();
        assert_eq!(result.out_trade_no, "T20240601001");
        assert_eq!(result.trade_state, "SUCCESS");
        assert_eq!(result.amount.total, 1250);
    }

    #[test]
    fn test_tampered_notification_rejected() {
        let platform_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let client = test_client().with_platform_public_key(platform_key.to_public_key());
        let body = r#"{"id":"EV-1"}"#;
        let signature = platform_sign(&platform_key, "1717238180\nnonce\n{\"id\":\"EV-2\"}\n");
        assert!(matches!(
            client.verify_notification("1717238180", "nonce", body, &signature),
            Err(PayError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_verify_without_platform_cert_is_key_error() {
        let client = test_client();
        assert!(matches!(
            client.verify_notification("1", "n", "{}", "AAAA"),
            Err(PayError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_encrypt_sensitive_round_trip() {
        let platform_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let client = test_client().with_platform_public_key(platform_key.to_public_key());
        let encrypted = client.encrypt_sensitive("张三").unwrap();
        let decrypted = platform_key
            .decrypt(
                Oaep::new::<Sha1>(),
                &base64::engine::general_purpose::STANDARD.decode(encrypted).unwrap(),
            )
            .unwrap();
        assert_eq!(decrypted, "张三".as_bytes());
    }

    #[test]
    fn test_short_api_v3_key_rejected() {
        let key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let config = Arc::new(WxV3Config {
            app_id: "wx1".to_string(),
            mch_id: "m1".to_string(),
            serial_no: "s1".to_string(),
            private_key: key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
            api_v3_key: "too-short".to_string(),
            platform_cert: None,
            notify_url: String::new(),
            base_url: String::new(),
        });
        assert!(matches!(
            WxV3Client::new(config),
            Err(PayError::KeyFormat(_))
        ));
    }
}
