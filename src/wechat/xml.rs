use crate::errors::{PayError, PayResult};
use quick_xml::events::Event;
use std::collections::HashMap;

/// 参数集转v2接口请求体：`<xml><k><![CDATA[v]]></k></xml>`
pub fn map_to_xml(params: &HashMap<String, String>) -> String {
    let mut entries: Vec<(&str, &str)> =
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    // 网关不要求字段顺序，排序只为输出稳定
    entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    let body: String = entries
        .iter()
        .map(|(k, v)| format!("<{}><![CDATA[{}]]></{}>", k, v, k))
        .collect();
    format!("<xml>{}</xml>", body)
}

/// v2接口XML体解析为扁平参数集（只认一层子节点）
pub fn xml_to_map(payload: &str) -> PayResult<HashMap<String, String>> {
    let mut m = HashMap::new();
    let mut reader = quick_xml::Reader::from_str(payload);
    reader.config_mut().trim_text(true);
    // 跳过根节点
    let _ = reader
        .read_event()
        .map_err(|e| PayError::Xml(format!("error parsing xml: {}", e)))?;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let key = String::from_utf8(e.name().0.to_vec())
                    .map_err(|e| PayError::Encoding(format!("non-utf8 xml tag: {}", e)))?;
                let value = match reader.read_event() {
                    Ok(Event::CData(cdata)) => String::from_utf8(cdata.to_vec())
                        .map_err(|e| PayError::Encoding(format!("non-utf8 cdata: {}", e)))?,
                    Ok(Event::Text(text)) => text
                        .unescape()
                        .map_err(|e| PayError::Xml(format!("error unescaping xml: {}", e)))?
                        .to_string(),
                    _ => String::new(),
                };
                m.insert(key, value);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PayError::Xml(format!("error parsing xml: {}", e))),
            _ => {}
        }
    }
    Ok(m)
}
