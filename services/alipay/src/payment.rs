use bridge_core::rsa::{parse_rsa_private_key, parse_rsa_public_key};
use bridge_core::{Context, Error, Result};
use bytes::Bytes;
use http::Method;
use log::debug;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::{form, sign};

/// Client for the legacy `gateway.do` form protocol.
///
/// This profile predates the v3 REST gateway: every call is a signed
/// parameter set, either rendered into an HTML form for the browser or
/// sent as a GET query, and responses are signed JSON nodes keyed by
/// the method name. It is kept alongside [`crate::Trade`] because the
/// two profiles accept different config shapes and verify differently.
#[derive(Clone, Debug)]
pub struct Payment {
    ctx: Context,
    config: Config,
    private_key: RsaPrivateKey,
    alipay_public_key: RsaPublicKey,
}

impl Payment {
    /// Create a client. Keys are parsed up front.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        config.check()?;
        let private_key = parse_rsa_private_key(&config.private_key)?;
        let alipay_public_key = parse_rsa_public_key(&config.alipay_public_key)?;
        Ok(Self {
            ctx,
            config,
            private_key,
            alipay_public_key,
        })
    }

    fn gateway(&self) -> String {
        format!("{}/gateway.do", self.config.gateway())
    }

    fn signed_options(
        &self,
        mut options: BTreeMap<String, Value>,
        order: &Value,
    ) -> Result<BTreeMap<String, Value>> {
        let biz_content = serde_json::to_string(order)
            .map_err(|e| Error::unexpected("cannot serialize biz_content").with_source(e))?;
        options.insert("biz_content".to_string(), json!(biz_content));
        let signature = sign::sign_form(&options, &self.private_key, self.config.sign_type)?;
        options.insert("sign".to_string(), json!(signature));
        Ok(options)
    }

    fn pay_form(
        &self,
        mut order: Value,
        method: &str,
        product_code: &str,
        notify_url: &str,
        return_url: Option<&str>,
    ) -> Result<String> {
        form::check_order(&order)?;
        let mut options = form::base_options(&self.config.app_id, self.config.sign_type);
        options.insert("method".to_string(), json!(method));
        options.insert("notify_url".to_string(), json!(notify_url));
        if let Some(url) = return_url {
            options.insert("return_url".to_string(), json!(url));
        }
        order["product_code"] = json!(product_code);

        let options = self.signed_options(options, &order)?;
        Ok(form::build_pay_html(&self.gateway(), &options))
    }

    /// Desktop web payment. Returns an auto-submitting HTML form.
    pub fn page(&self, order: Value, notify_url: &str, return_url: Option<&str>) -> Result<String> {
        self.pay_form(
            order,
            "alipay.trade.page.pay",
            "FAST_INSTANT_TRADE_PAY",
            notify_url,
            return_url,
        )
    }

    /// Mobile web payment. Returns an auto-submitting HTML form.
    pub fn wap(&self, order: Value, notify_url: &str, return_url: Option<&str>) -> Result<String> {
        self.pay_form(
            order,
            "alipay.trade.wap.pay",
            "QUICK_WAP_WAY",
            notify_url,
            return_url,
        )
    }

    /// App payment. Returns the signed query string handed to the SDK.
    pub fn app(&self, mut order: Value, notify_url: &str) -> Result<String> {
        form::check_order(&order)?;
        let mut options = form::base_options(&self.config.app_id, self.config.sign_type);
        options.insert("method".to_string(), json!("alipay.trade.app.pay"));
        options.insert("notify_url".to_string(), json!(notify_url));
        order["product_code"] = json!("QUICK_MSECURITY_PAY");

        let options = self.signed_options(options, &order)?;
        Ok(form::to_query(&options))
    }

    /// Handle an asynchronous payment notification, as [`crate::Trade::notify`].
    pub fn notify<F>(&self, params: BTreeMap<String, Value>, callback: F) -> String
    where
        F: FnOnce(&BTreeMap<String, Value>) -> bool,
    {
        if sign::verify_form(&params, &self.alipay_public_key).is_err() {
            return "fail".to_string();
        }
        if callback(&params) {
            "success".to_string()
        } else {
            "fail".to_string()
        }
    }

    /// Query an order by merchant or Alipay trade number.
    pub async fn query(
        &self,
        out_trade_no: Option<&str>,
        trade_no: Option<&str>,
        query_options: &[&str],
        org_pid: Option<&str>,
    ) -> Result<Value> {
        let mut biz = require_trade_no(out_trade_no, trade_no)?;
        if !query_options.is_empty() {
            biz["query_options"] = json!(query_options);
        }
        if let Some(pid) = org_pid {
            biz["org_pid"] = json!(pid);
        }
        self.request("alipay.trade.query", &biz).await
    }

    /// Refund a trade, same argument contract as [`crate::Trade::refund`].
    pub async fn refund(&self, options: Value) -> Result<Value> {
        let out = options.get("out_trade_no").and_then(Value::as_str);
        let no = options.get("trade_no").and_then(Value::as_str);
        require_trade_no(out, no)?;
        let amount_ok = options
            .get("refund_amount")
            .map(|v| v.as_f64().unwrap_or_default() > 0.0)
            .unwrap_or(false);
        if !amount_ok {
            return Err(Error::argument_invalid("Missing Options [refund_amount]"));
        }
        if options
            .get("out_request_no")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty)
        {
            return Err(Error::argument_invalid("Missing Options [out_request_no]"));
        }
        self.request("alipay.trade.refund", &options).await
    }

    /// Query the state of a refund.
    pub async fn refund_query(
        &self,
        out_request_no: &str,
        out_trade_no: Option<&str>,
        trade_no: Option<&str>,
        query_options: &[&str],
    ) -> Result<Value> {
        let mut biz = require_trade_no(out_trade_no, trade_no)?;
        biz["out_request_no"] = json!(out_request_no);
        if !query_options.is_empty() {
            biz["query_options"] = json!(query_options);
        }
        self.request("alipay.trade.fastpay.refund.query", &biz).await
    }

    /// Close an unpaid trade.
    pub async fn close(
        &self,
        out_trade_no: Option<&str>,
        trade_no: Option<&str>,
        operator_id: Option<&str>,
    ) -> Result<Value> {
        let mut biz = require_trade_no(out_trade_no, trade_no)?;
        if let Some(id) = operator_id {
            biz["operator_id"] = json!(id);
        }
        self.request("alipay.trade.close", &biz).await
    }

    /// Send a signed gateway call and verify the response node.
    async fn request(&self, method: &str, biz_content: &Value) -> Result<Value> {
        let mut options = form::base_options(&self.config.app_id, self.config.sign_type);
        options.insert("method".to_string(), json!(method));
        let options = self.signed_options(options, biz_content)?;

        let url = format!("{}?{}", self.gateway(), form::to_query(&options));
        debug!("legacy alipay gateway call: {method}");
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Bytes::new())?;
        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, body) = resp.into_parts();

        if parts.status != http::StatusCode::OK && parts.status != http::StatusCode::NO_CONTENT {
            return Err(Error::response_invalid(format!(
                "Request exception: status {}",
                parts.status
            )));
        }

        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))?;
        let signature = envelope
            .get("sign")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::response_invalid("Missing Response data"))?;

        let node_name = format!("{}_response", method.replace('.', "_"));
        let node = envelope
            .get(&node_name)
            .ok_or_else(|| Error::response_invalid("Missing Response data"))?;

        // The gateway signs the response node's literal JSON rendering.
        let content = serde_json::to_string(node)
            .map_err(|e| Error::unexpected("cannot serialize response node").with_source(e))?;
        sign::verify_content(&content, signature, self.config.sign_type, &self.alipay_public_key)?;

        let code = node.get("code").and_then(Value::as_str).unwrap_or_default();
        let sub_code = node.get("sub_code").and_then(Value::as_str);
        if code != "10000" && sub_code != Some("ACQ.TRADE_HAS_SUCCESS") {
            let msg = node.get("sub_msg").or_else(|| node.get("msg"));
            let mut err =
                Error::vendor_response(msg.and_then(Value::as_str).unwrap_or("unknown error"));
            if let Some(sub) = sub_code {
                err = err.with_vendor_code(sub);
            } else if !code.is_empty() {
                err = err.with_vendor_code(code);
            }
            return Err(err);
        }

        Ok(node.clone())
    }
}

fn require_trade_no(out_trade_no: Option<&str>, trade_no: Option<&str>) -> Result<Value> {
    if out_trade_no.map_or(true, str::is_empty) && trade_no.map_or(true, str::is_empty) {
        return Err(Error::argument_invalid(
            "Missing Options [out_trade_no OR trade_no]",
        ));
    }
    let mut biz = json!({});
    if let Some(no) = out_trade_no.filter(|no| !no.is_empty()) {
        biz["out_trade_no"] = json!(no);
    }
    if let Some(no) = trade_no.filter(|no| !no.is_empty()) {
        biz["trade_no"] = json!(no);
    }
    Ok(biz)
}
