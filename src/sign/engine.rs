use crate::errors::{PayError, PayResult};
use crate::sign::canonical::{
    SECRET_FIELD, SIGN_FIELD, SIGN_TYPE_FIELD, canonicalize, canonicalize_with_secret,
};
use crate::sign::keys::KeyMaterial;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// 签名算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignType {
    /// RSA-SHA1（支付宝旧版RSA）
    Rsa,
    /// RSA-SHA256（支付宝RSA2、微信v3）
    Rsa2,
    /// MD5加密钥后缀（微信v2默认）
    Md5,
    /// HMAC-SHA256加密钥后缀（微信v2可选）
    HmacSha256,
}

impl SignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Rsa => "RSA",
            SignType::Rsa2 => "RSA2",
            SignType::Md5 => "MD5",
            SignType::HmacSha256 => "HMAC-SHA256",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RSA" => Some(SignType::Rsa),
            "RSA2" => Some(SignType::Rsa2),
            "MD5" => Some(SignType::Md5),
            "HMAC-SHA256" => Some(SignType::HmacSha256),
            _ => None,
        }
    }

    fn is_symmetric(&self) -> bool {
        matches!(self, SignType::Md5 | SignType::HmacSha256)
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 对规范化签名串计算签名。
///
/// 对称方案的`canonical`必须已带`&key=<secret>`后缀（由编码器追加）。
/// RSA方案输出base64，对称方案输出大写hex。
pub fn sign(canonical: &str, key: &KeyMaterial, sign_type: SignType) -> PayResult<String> {
    match sign_type {
        SignType::Rsa => {
            let signing_key = SigningKey::<Sha1>::new(key.rsa_private()?.clone());
            let signature = signing_key
                .try_sign(canonical.as_bytes())
                .map_err(|e| PayError::Crypto(format!("RSA-SHA1 signing failed: {}", e)))?;
            Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
        }
        SignType::Rsa2 => {
            let signing_key = SigningKey::<Sha256>::new(key.rsa_private()?.clone());
            let signature = signing_key
                .try_sign(canonical.as_bytes())
                .map_err(|e| PayError::Crypto(format!("RSA-SHA256 signing failed: {}", e)))?;
            Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
        }
        SignType::Md5 => {
            key.shared_secret()?;
            let digest = Md5::digest(canonical.as_bytes());
            Ok(hex::encode(digest).to_uppercase())
        }
        SignType::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key.shared_secret()?.as_bytes())
                .map_err(|e| PayError::KeyFormat(format!("Invalid HMAC key: {}", e)))?;
            mac.update(canonical.as_bytes());
            Ok(hex::encode(mac.finalize().into_bytes()).to_uppercase())
        }
    }
}

/// 对参数集签名：先生成规范化签名串（对称方案追加密钥后缀），再计算签名。
/// 不修改入参，返回的签名由调用方放回`sign`字段。
pub fn sign_params(
    params: &HashMap<String, String>,
    key: &KeyMaterial,
    sign_type: SignType,
) -> PayResult<String> {
    let canonical = if sign_type.is_symmetric() {
        canonicalize_with_secret(params, &[SIGN_FIELD], key.shared_secret()?)
    } else {
        canonicalize(params, &[SIGN_FIELD])
    };
    sign(&canonical, key, sign_type)
}

/// 验证参数集里的`sign`字段。
///
/// RSA方案重建签名串时排除`sign`与`sign_type`（支付宝回调规则），
/// 对称方案只排除`sign`与`key`（微信v2规则，`sign_type`参与签名）。
/// 验签失败返回`SignatureMismatch`，调用方必须据此拒绝对应业务事件。
pub fn verify(
    params: &HashMap<String, String>,
    key: &KeyMaterial,
    sign_type: SignType,
) -> PayResult<()> {
    let received = params
        .get(SIGN_FIELD)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PayError::Validation("missing sign field".to_string()))?;

    match sign_type {
        SignType::Rsa | SignType::Rsa2 => {
            let canonical = canonicalize(params, &[SIGN_FIELD, SIGN_TYPE_FIELD]);
            let sig_bytes = base64::engine::general_purpose::STANDARD
                .decode(received)
                .map_err(|e| PayError::Encoding(format!("sign is not valid base64: {}", e)))?;
            let signature = Signature::try_from(sig_bytes.as_slice())
                .map_err(|_| PayError::SignatureMismatch)?;
            let verified = match sign_type {
                SignType::Rsa => VerifyingKey::<Sha1>::new(key.rsa_public()?.clone())
                    .verify(canonical.as_bytes(), &signature)
                    .is_ok(),
                _ => VerifyingKey::<Sha256>::new(key.rsa_public()?.clone())
                    .verify(canonical.as_bytes(), &signature)
                    .is_ok(),
            };
            if verified {
                Ok(())
            } else {
                Err(PayError::SignatureMismatch)
            }
        }
        SignType::Md5 | SignType::HmacSha256 => {
            let canonical =
                canonicalize_with_secret(params, &[SIGN_FIELD, SECRET_FIELD], key.shared_secret()?);
            let expected = sign(&canonical, key, sign_type)?;
            // 网关给的是大写hex，但大小写不作为验签依据
            if expected.eq_ignore_ascii_case(received) {
                Ok(())
            } else {
                Err(PayError::SignatureMismatch)
            }
        }
    }
}
