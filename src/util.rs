use std::fmt;

/// 生成32位随机字符串（nonce_str）
pub fn nonce_str() -> String {
    uuid::Uuid::new_v4().to_string().replace("-", "")
}

/// 货币金额（分为单位，避免浮点数精度问题）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Money {
    /// 金额（分）
    pub amount_cents: i64,
}

impl Money {
    pub fn from_yuan(amount: i64) -> Self {
        Self {
            amount_cents: amount * 100,
        }
    }

    pub fn from_cents(cents: i64) -> Self {
        Self { amount_cents: cents }
    }

    pub fn to_cents(&self) -> i64 {
        self.amount_cents
    }

    /// 支付宝金额串：元，保留两位小数。负数（退款差额等）带负号
    pub fn to_yuan_string(&self) -> String {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let cents = self.amount_cents.abs();
        format!("{}{}.{:02}", sign, cents / 100, cents % 100)
    }

    /// 微信金额串：整数分
    pub fn to_fen_string(&self) -> String {
        self.amount_cents.to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}", self.to_yuan_string())
    }
}

/// 网关不接受的符号集合，替换为空格
fn is_special_symbol(c: char) -> bool {
    matches!(
        c,
        '`' | '!' | '$' | '^' | '(' | ')' | '=' | ':' | ';' | ',' | '\\' | '[' | '.' | '<' | '>'
            | '/' | '?' | '~' | '！' | '@' | '#' | '￥' | '…' | '*' | '（' | '）' | '—' | '|'
            | '{' | '}' | '【' | '】' | '‘' | '；' | '：' | '”' | '“' | '\'' | '。' | '，' | '、'
            | '？' | '%' | '+' | '_' | ']' | '"' | '&'
    )
}

/// 清洗订单标题：过滤特殊符号并按字符数截断
pub fn sanitize_subject(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if is_special_symbol(c) || c == '\n' {
                ' '
            } else {
                c
            }
        })
        .collect();
    cleaned.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_str_shape() {
        let nonce = nonce_str();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_money_yuan_string() {
        assert_eq!(Money::from_cents(1).to_yuan_string(), "0.01");
        assert_eq!(Money::from_cents(1230).to_yuan_string(), "12.30");
        assert_eq!(Money::from_yuan(10).to_yuan_string(), "10.00");
    }

    #[test]
    fn test_money_negative_yuan_string() {
        assert_eq!(Money::from_cents(-101).to_yuan_string(), "-1.01");
        assert_eq!(Money::from_cents(-1).to_yuan_string(), "-0.01");
    }

    #[test]
    fn test_money_fen_string() {
        assert_eq!(Money::from_yuan(1).to_fen_string(), "100");
    }

    #[test]
    fn test_sanitize_subject() {
        assert_eq!(sanitize_subject("停车费(A区)", 32), "停车费 A区 ");
        assert_eq!(sanitize_subject("一二三四五", 3), "一二三");
    }
}
