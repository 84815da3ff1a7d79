use std::collections::HashMap;

/// 签名字段名，永远不参与签名串
pub const SIGN_FIELD: &str = "sign";
/// 签名类型字段名，支付宝类验签时排除
pub const SIGN_TYPE_FIELD: &str = "sign_type";
/// 对称密钥字段名，只以`&key=`后缀形式出现
pub const SECRET_FIELD: &str = "key";

/// 生成规范化签名串。
///
/// 过滤空值与排除字段后，按字段名字节序排序，以`k=v`拼接、`&`连接。
/// 两个网关的签名规范都按字段名排序，而不是对整个`k=v`串排序，
/// 前缀字段（如`a`与`a2`）在两种排序下次序不同。
pub fn canonicalize(params: &HashMap<String, String>, exclude: &[&str]) -> String {
    let mut entries: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !exclude.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    entries
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// 生成带`&key=<secret>`后缀的规范化签名串（对称签名方案）。
///
/// `key`字段本身不参与排序，始终追加在末尾。
pub fn canonicalize_with_secret(
    params: &HashMap<String, String>,
    exclude: &[&str],
    secret: &str,
) -> String {
    let mut exclude_all: Vec<&str> = exclude.to_vec();
    if !exclude_all.contains(&SECRET_FIELD) {
        exclude_all.push(SECRET_FIELD);
    }
    let body = canonicalize(params, &exclude_all);
    format!("{}&key={}", body, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sorted_by_key() {
        let m = map(&[("b", "2"), ("a", "1")]);
        assert_eq!(canonicalize(&m, &[]), "a=1&b=2");
    }

    #[test]
    fn test_empty_values_dropped() {
        let m = map(&[("a", "1"), ("b", ""), ("c", "3")]);
        assert_eq!(canonicalize(&m, &[]), "a=1&c=3");
    }

    #[test]
    fn test_sign_fields_excluded() {
        let m = map(&[
            ("out_trade_no", "123"),
            ("sign", "XXXX"),
            ("sign_type", "RSA2"),
        ]);
        assert_eq!(
            canonicalize(&m, &[SIGN_FIELD, SIGN_TYPE_FIELD]),
            "out_trade_no=123"
        );
    }

    #[test]
    fn test_order_independent() {
        // HashMap遍历顺序受插入顺序影响时结果也必须一致
        let mut m1 = HashMap::new();
        m1.insert("appid".to_string(), "wx1".to_string());
        m1.insert("mch_id".to_string(), "100".to_string());
        m1.insert("nonce_str".to_string(), "abc".to_string());

        let mut m2 = HashMap::new();
        m2.insert("nonce_str".to_string(), "abc".to_string());
        m2.insert("appid".to_string(), "wx1".to_string());
        m2.insert("mch_id".to_string(), "100".to_string());

        assert_eq!(canonicalize(&m1, &[]), canonicalize(&m2, &[]));
    }

    #[test]
    fn test_prefix_keys_sorted_by_key_name() {
        // 整串排序会给出 "a2=.." < "a=.."，按字段名排序则相反
        let m = map(&[("a", "1"), ("a2", "2")]);
        assert_eq!(canonicalize(&m, &[]), "a=1&a2=2");
    }

    #[test]
    fn test_secret_suffix() {
        let m = map(&[("out_trade_no", "123"), ("key", "leak")]);
        assert_eq!(
            canonicalize_with_secret(&m, &[SIGN_FIELD], "k"),
            "out_trade_no=123&key=k"
        );
    }

    #[test]
    fn test_all_excluded_yields_empty() {
        let m = map(&[("sign", "X")]);
        assert_eq!(canonicalize(&m, &[SIGN_FIELD]), "");
    }
}
