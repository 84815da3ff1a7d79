use crate::errors::{PayError, PayResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

const PEM_LINE_WIDTH: usize = 64;

/// 把裸base64密钥补全成PEM格式，正文按64列换行。
/// 已带armor的输入先剥离再重排，保证格式统一。
pub fn pem_armor(raw: &str, label: &str) -> String {
    let body: String = raw
        .lines()
        .filter(|line| !line.contains("-----"))
        .collect::<Vec<_>>()
        .join("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut out = format!("-----BEGIN {}-----\n", label);
    let bytes = body.as_bytes();
    for chunk in bytes.chunks(PEM_LINE_WIDTH) {
        // chunk来自str的字节切分，base64正文是纯ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str(&format!("-----END {}-----\n", label));
    out
}

/// 加载RSA私钥，裸base64或PEM均可。优先PKCS#8，回退PKCS#1。
pub fn load_private_key(raw: &str) -> PayResult<RsaPrivateKey> {
    let pkcs8 = pem_armor(raw, "PRIVATE KEY");
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(&pkcs8) {
        return Ok(key);
    }
    let pkcs1 = pem_armor(raw, "RSA PRIVATE KEY");
    RsaPrivateKey::from_pkcs1_pem(&pkcs1)
        .map_err(|e| PayError::KeyFormat(format!("Failed to parse RSA private key: {}", e)))
}

/// 加载RSA公钥。优先SPKI，回退PKCS#1。
pub fn load_public_key(raw: &str) -> PayResult<RsaPublicKey> {
    let spki = pem_armor(raw, "PUBLIC KEY");
    if let Ok(key) = RsaPublicKey::from_public_key_pem(&spki) {
        return Ok(key);
    }
    let pkcs1 = pem_armor(raw, "RSA PUBLIC KEY");
    RsaPublicKey::from_pkcs1_pem(&pkcs1)
        .map_err(|e| PayError::KeyFormat(format!("Failed to parse RSA public key: {}", e)))
}

/// 加载X.509证书（微信平台证书等）。
pub fn load_certificate(raw: &str) -> PayResult<Certificate> {
    let pem = pem_armor(raw, "CERTIFICATE");
    Certificate::from_pem(pem.as_bytes())
        .map_err(|e| PayError::KeyFormat(format!("Failed to parse certificate: {}", e)))
}

/// 提取证书内的RSA公钥。
pub fn certificate_public_key(cert: &Certificate) -> PayResult<RsaPublicKey> {
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| PayError::KeyFormat(format!("Failed to encode SPKI: {}", e)))?;
    RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| PayError::KeyFormat(format!("Certificate key is not RSA: {}", e)))
}

/// 签名密钥材料。配置加载时构造一次，之后只读。
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// 非对称方案：商户私钥签名，对方公钥验签，两者按需配置
    Rsa {
        private_key: Option<RsaPrivateKey>,
        public_key: Option<RsaPublicKey>,
    },
    /// 对称方案：双方共享的签名密钥
    Secret(String),
}

impl KeyMaterial {
    pub fn from_rsa_pem(private_key: Option<&str>, public_key: Option<&str>) -> PayResult<Self> {
        let private_key = private_key.map(load_private_key).transpose()?;
        let public_key = public_key.map(load_public_key).transpose()?;
        if private_key.is_none() && public_key.is_none() {
            return Err(PayError::KeyFormat(
                "RSA key material requires at least one key".to_string(),
            ));
        }
        Ok(KeyMaterial::Rsa {
            private_key,
            public_key,
        })
    }

    pub fn secret(secret: impl Into<String>) -> Self {
        KeyMaterial::Secret(secret.into())
    }

    pub(crate) fn rsa_private(&self) -> PayResult<&RsaPrivateKey> {
        match self {
            KeyMaterial::Rsa {
                private_key: Some(key),
                ..
            } => Ok(key),
            KeyMaterial::Rsa { .. } => Err(PayError::KeyFormat(
                "RSA private key not configured".to_string(),
            )),
            KeyMaterial::Secret(_) => Err(PayError::KeyFormat(
                "RSA sign type requires an RSA key, got shared secret".to_string(),
            )),
        }
    }

    pub(crate) fn rsa_public(&self) -> PayResult<&RsaPublicKey> {
        match self {
            KeyMaterial::Rsa {
                public_key: Some(key),
                ..
            } => Ok(key),
            KeyMaterial::Rsa { .. } => Err(PayError::KeyFormat(
                "RSA public key not configured".to_string(),
            )),
            KeyMaterial::Secret(_) => Err(PayError::KeyFormat(
                "RSA sign type requires an RSA key, got shared secret".to_string(),
            )),
        }
    }

    pub(crate) fn shared_secret(&self) -> PayResult<&str> {
        match self {
            KeyMaterial::Secret(secret) => Ok(secret),
            KeyMaterial::Rsa { .. } => Err(PayError::KeyFormat(
                "Symmetric sign type requires a shared secret, got RSA key".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 2048).unwrap()
    }

    #[test]
    fn test_armor_reflows_at_64_columns() {
        let raw = "A".repeat(100);
        let armored = pem_armor(&raw, "PUBLIC KEY");
        let lines: Vec<&str> = armored.lines().collect();
        assert_eq!(lines[0], "-----BEGIN PUBLIC KEY-----");
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines[2].len(), 36);
        assert_eq!(lines[3], "-----END PUBLIC KEY-----");
    }

    #[test]
    fn test_bare_and_armored_load_same_private_key() {
        let key = test_key();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let bare: String = pem
            .lines()
            .filter(|l| !l.contains("-----"))
            .collect::<Vec<_>>()
            .join("");

        let from_pem = load_private_key(&pem).unwrap();
        let from_bare = load_private_key(&bare).unwrap();
        assert_eq!(from_pem, from_bare);
        assert_eq!(from_pem, key);
    }

    #[test]
    fn test_load_spki_public_key() {
        let key = test_key();
        let pem = key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap();
        let loaded = load_public_key(&pem).unwrap();
        assert_eq!(loaded, key.to_public_key());
    }

    #[test]
    fn test_garbage_is_key_format_error() {
        let err = load_private_key("not-a-key").unwrap_err();
        assert!(matches!(err, PayError::KeyFormat(_)));
    }

    #[test]
    fn test_material_kind_mismatch() {
        let material = KeyMaterial::secret("k");
        assert!(matches!(
            material.rsa_private(),
            Err(PayError::KeyFormat(_))
        ));
    }
}
