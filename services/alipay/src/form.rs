//! Shared pieces of the form gateway protocol: the public parameter
//! set, the auto-submitting HTML form, and order validation.

use bridge_core::{time, Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::SignType;

/// The public parameters every form request starts from.
pub(crate) fn base_options(app_id: &str, sign_type: SignType) -> BTreeMap<String, Value> {
    let mut options = BTreeMap::new();
    options.insert("app_id".to_string(), Value::String(app_id.to_string()));
    options.insert("version".to_string(), Value::String("1.0".to_string()));
    options.insert("format".to_string(), Value::String("JSON".to_string()));
    options.insert(
        "sign_type".to_string(),
        Value::String(sign_type.as_str().to_string()),
    );
    options.insert("charset".to_string(), Value::String("UTF-8".to_string()));
    options.insert(
        "timestamp".to_string(),
        Value::String(time::format_beijing(time::now())),
    );
    options
}

/// Check the fields every order needs before it can be signed.
pub(crate) fn check_order(order: &Value) -> Result<()> {
    for field in ["out_trade_no", "total_amount", "subject"] {
        let present = match order.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(Error::argument_invalid(format!("Missing Options [{field}]")));
        }
    }
    Ok(())
}

/// Render the auto-submitting payment form.
pub(crate) fn build_pay_html(gateway: &str, options: &BTreeMap<String, Value>) -> String {
    let mut html = format!(
        "<form id='alipaysubmit' name='alipaysubmit' action='{gateway}' method='post'>"
    );
    for (key, value) in options {
        let value = render_value(value).replace('\'', "&apos;");
        html.push_str(&format!(
            "<input type='hidden' name='{key}' value='{value}'/>"
        ));
    }
    html.push_str("<input type='submit' value='ok' style='display:none;'></form>");
    format!("{html}<script>document.forms['alipaysubmit'].submit();</script>")
}

/// Render the signed parameters as a URL-encoded query string, the
/// payload shape the app SDK expects.
pub(crate) fn to_query(options: &BTreeMap<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in options {
        serializer.append_pair(key, &render_value(value));
    }
    serializer.finish()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
