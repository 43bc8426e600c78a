use bridge_core::{Error, Result};
use http::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::client::GatewayClient;
use crate::config::SignType;
use crate::{form, sign};

/// Alipay trade operations.
///
/// The pay entry points (`page`, `wap`, `app`) produce signed form
/// payloads the browser or app SDK submits to the gateway; the
/// management operations go through the v3 REST pipeline.
#[derive(Clone, Debug)]
pub struct Trade {
    client: GatewayClient,
}

impl Trade {
    /// Create the facade around a gateway client.
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    fn form_options(&self) -> BTreeMap<String, Value> {
        let mut options = form::base_options(&self.client.config().app_id, SignType::Rsa2);
        if let Some(certs) = self.client.certs() {
            options.insert("app_cert_sn".to_string(), json!(certs.app_cert_sn));
            options.insert("alipay_root_cert_sn".to_string(), json!(certs.root_cert_sn));
        }
        options
    }

    fn signed_form(
        &self,
        mut options: BTreeMap<String, Value>,
        order: &Value,
    ) -> Result<BTreeMap<String, Value>> {
        let biz_content = serde_json::to_string(order)
            .map_err(|e| Error::unexpected("cannot serialize biz_content").with_source(e))?;
        options.insert("biz_content".to_string(), json!(biz_content));
        let signature = sign::sign_form(&options, self.client.private_key(), SignType::Rsa2)?;
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
        let mut options = self.form_options();
        options.insert("method".to_string(), json!(method));
        options.insert("notify_url".to_string(), json!(notify_url));
        if let Some(url) = return_url {
            options.insert("return_url".to_string(), json!(url));
        }
        order["product_code"] = json!(product_code);

        let options = self.signed_form(options, &order)?;
        Ok(form::build_pay_html(
            &format!("{}/gateway.do", self.client.config().gateway()),
            &options,
        ))
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
        let mut options = self.form_options();
        options.insert("method".to_string(), json!("alipay.trade.app.pay"));
        options.insert("notify_url".to_string(), json!(notify_url));
        order["product_code"] = json!("QUICK_MSECURITY_PAY");

        let options = self.signed_form(options, &order)?;
        Ok(form::to_query(&options))
    }

    /// Handle an asynchronous payment notification.
    ///
    /// Verifies the form signature, then hands the parameters to the
    /// callback. Returns the acknowledgement body for the gateway:
    /// `success`, or `fail` when verification or the callback fails.
    pub fn notify<F>(&self, params: BTreeMap<String, Value>, callback: F) -> String
    where
        F: FnOnce(&BTreeMap<String, Value>) -> bool,
    {
        if sign::verify_form(&params, self.client.alipay_public_key()).is_err() {
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
        let mut body = either_trade_no(out_trade_no, trade_no)?;
        if !query_options.is_empty() {
            body["query_options"] = json!(query_options);
        }
        if let Some(pid) = org_pid {
            body["org_pid"] = json!(pid);
        }
        self.client
            .request(Method::POST, "/v3/alipay/trade/query", &[], body)
            .await
    }

    /// Refund a trade.
    ///
    /// `options` must carry `out_trade_no` or `trade_no`, a positive
    /// `refund_amount`, and `out_request_no`.
    pub async fn refund(&self, options: Value) -> Result<Value> {
        if field_empty(&options, "out_trade_no") && field_empty(&options, "trade_no") {
            return Err(Error::argument_invalid(
                "Missing Options [out_trade_no OR trade_no]",
            ));
        }
        let amount_ok = options
            .get("refund_amount")
            .map(|v| v.as_f64().unwrap_or_default() > 0.0)
            .unwrap_or(false);
        if !amount_ok {
            return Err(Error::argument_invalid("Missing Options [refund_amount]"));
        }
        if field_empty(&options, "out_request_no") {
            return Err(Error::argument_invalid("Missing Options [out_request_no]"));
        }
        self.client
            .request(Method::POST, "/v3/alipay/trade/refund", &[], options)
            .await
    }

    /// Query the state of a refund.
    pub async fn refund_query(
        &self,
        out_request_no: &str,
        out_trade_no: Option<&str>,
        trade_no: Option<&str>,
        query_options: &[&str],
    ) -> Result<Value> {
        let mut body = either_trade_no(out_trade_no, trade_no)?;
        body["out_request_no"] = json!(out_request_no);
        if !query_options.is_empty() {
            body["query_options"] = json!(query_options);
        }
        self.client
            .request(Method::POST, "/v3/alipay/trade/fastpay/refund/query", &[], body)
            .await
    }

    /// Close an unpaid trade.
    pub async fn close(
        &self,
        out_trade_no: Option<&str>,
        trade_no: Option<&str>,
        operator_id: Option<&str>,
    ) -> Result<Value> {
        let mut body = either_trade_no(out_trade_no, trade_no)?;
        if let Some(id) = operator_id {
            body["operator_id"] = json!(id);
        }
        self.client
            .request(Method::POST, "/v3/alipay/trade/close", &[], body)
            .await
    }
}

fn field_empty(value: &Value, field: &str) -> bool {
    match value.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn either_trade_no(out_trade_no: Option<&str>, trade_no: Option<&str>) -> Result<Value> {
    if out_trade_no.map_or(true, str::is_empty) && trade_no.map_or(true, str::is_empty) {
        return Err(Error::argument_invalid(
            "Missing Options [out_trade_no OR trade_no]",
        ));
    }
    let mut body = json!({});
    if let Some(no) = out_trade_no.filter(|no| !no.is_empty()) {
        body["out_trade_no"] = json!(no);
    }
    if let Some(no) = trade_no.filter(|no| !no.is_empty()) {
        body["trade_no"] = json!(no);
    }
    Ok(body)
}
