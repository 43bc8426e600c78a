//! XML <-> JSON value bridge for the OSS wire format.
//!
//! OSS requests and responses are flat XML documents. Both directions
//! round-trip through `serde_json::Value`: objects become child
//! elements, arrays become repeated elements of the same name, and
//! the document root is dropped on decode.

use bridge_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

/// Decode an XML document into the JSON value of its root's children.
///
/// A text-only root decodes to a plain string, matching responses
/// like `<LocationConstraint>oss-cn-hangzhou</LocationConstraint>`.
pub(crate) fn from_xml(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // name, children, accumulated text
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some((_, children, _)) => insert_child(children, name, Value::String(String::new())),
                    None => root = Some(Value::String(String::new())),
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::decode_invalid("cannot unescape XML text").with_source(e))?;
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) = match stack.pop() {
                    Some(frame) => frame,
                    None => return Err(Error::decode_invalid("unbalanced XML document")),
                };
                let value = if children.is_empty() {
                    Value::String(text)
                } else {
                    Value::Object(children)
                };
                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, value),
                    None => root = Some(value),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::decode_invalid("malformed XML document").with_source(e)),
        }
    }
    root.ok_or_else(|| Error::decode_invalid("empty XML document"))
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Encode a JSON value as an XML document under the given root.
pub(crate) fn to_xml(root: &str, value: &Value) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root, value)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::unexpected("XML writer produced invalid UTF-8").with_source(e))
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    let emit = |writer: &mut Writer<Vec<u8>>, event: Event| {
        writer
            .write_event(event)
            .map_err(|e| Error::unexpected("cannot write XML event").with_source(e))
    };
    match value {
        // An array repeats the element name for every item.
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Object(map) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (key, child) in map {
                write_element(writer, key, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        Value::Null => emit(writer, Event::Empty(BytesStart::new(name)))?,
        Value::String(text) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        other => {
            let text = other.to_string();
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_to_xml_nested_and_repeated() {
        let body = json!({
            "Quiet": "false",
            "Object": [{"Key": "a.txt"}, {"Key": "b.txt", "VersionId": "v1"}],
        });
        assert_eq!(
            to_xml("Delete", &body).unwrap(),
            "<Delete><Quiet>false</Quiet>\
             <Object><Key>a.txt</Key></Object>\
             <Object><Key>b.txt</Key><VersionId>v1</VersionId></Object>\
             </Delete>"
        );
    }

    #[test]
    fn test_to_xml_escapes_text() {
        let xml = to_xml("Tag", &json!({"Value": "a<b&c"})).unwrap();
        assert_eq!(xml, "<Tag><Value>a&lt;b&amp;c</Value></Tag>");
    }

    #[test]
    fn test_from_xml_drops_root_and_groups_siblings() {
        let xml = "<ListBucketResult>\
                   <Name>mybucket</Name>\
                   <Contents><Key>a.txt</Key><Size>5</Size></Contents>\
                   <Contents><Key>b.txt</Key><Size>7</Size></Contents>\
                   </ListBucketResult>";
        let value = from_xml(xml).unwrap();
        assert_eq!(value["Name"], json!("mybucket"));
        assert_eq!(value["Contents"][1]["Key"], json!("b.txt"));
    }

    #[test]
    fn test_from_xml_text_only_root_is_string() {
        let value = from_xml("<LocationConstraint>oss-cn-hangzhou</LocationConstraint>").unwrap();
        assert_eq!(value, json!("oss-cn-hangzhou"));
    }

    #[test]
    fn test_from_xml_rejects_garbage() {
        assert!(from_xml("<a><b></a>").is_err());
    }
}
