use bridge_core::utils::nonce_str;
use bridge_core::{time, Error, Result};
use http::Method;
use serde_json::{json, Value};

use crate::client::PayClient;
use crate::sign;

/// WeChat Pay v3 operations.
///
/// The pay entry points create a prepay order and return what the
/// client side needs: a signed pay package for JSAPI/app/mini-program,
/// a redirect URL for H5, a QR code URL for native.
#[derive(Clone, Debug)]
pub struct Payment {
    client: PayClient,
}

impl Payment {
    /// Create the facade around a pay client.
    pub fn new(client: PayClient) -> Self {
        Self { client }
    }

    fn merged_order(&self, options: Value, notify_url: &str) -> Result<Value> {
        let mut order = options;
        let obj = order
            .as_object_mut()
            .ok_or_else(|| Error::argument_invalid("order options must be a JSON object"))?;
        let config = self.client.config();
        obj.entry("appid").or_insert(json!(config.app_id));
        obj.entry("mchid").or_insert(json!(config.mch_id));
        obj.insert("notify_url".to_string(), json!(notify_url));
        Ok(order)
    }

    async fn create_order(
        &self,
        url: &str,
        options: Value,
        notify_url: &str,
        required: &[&str],
    ) -> Result<Value> {
        let order = self.merged_order(options, notify_url)?;
        require_fields(&order, required)?;
        self.client.request(Method::POST, url, &[], order).await
    }

    fn prepay_id(order: &Value) -> Result<&str> {
        order
            .get("prepay_id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::response_invalid("response carries no prepay_id"))
    }

    /// The package a JSAPI or mini-program client passes to
    /// `wx.requestPayment`.
    fn jsapi_package(&self, prepay_id: &str) -> Result<Value> {
        let config = self.client.config();
        let timestamp = time::now().timestamp().to_string();
        let nonce = nonce_str(32);
        let package = format!("prepay_id={prepay_id}");
        let pay_sign = sign::sign_parts(
            self.client.private_key(),
            &[&config.app_id, &timestamp, &nonce, &package],
        )?;
        Ok(json!({
            "appId": config.app_id,
            "timeStamp": timestamp,
            "nonceStr": nonce,
            "package": package,
            "signType": "RSA",
            "paySign": pay_sign,
        }))
    }

    /// JSAPI payment inside the WeChat browser. Returns the signed
    /// client pay package.
    pub async fn jsapi(&self, options: Value, notify_url: &str) -> Result<Value> {
        let order = self
            .create_order(
                "/v3/pay/transactions/jsapi",
                options,
                notify_url,
                &["out_trade_no", "amount.total", "description", "payer.openid"],
            )
            .await?;
        self.jsapi_package(Self::prepay_id(&order)?)
    }

    /// Mini-program payment, same contract as [`Payment::jsapi`].
    pub async fn mini_app(&self, options: Value, notify_url: &str) -> Result<Value> {
        self.jsapi(options, notify_url).await
    }

    /// App payment. Returns the package the mobile SDK consumes.
    pub async fn app(&self, options: Value, notify_url: &str) -> Result<Value> {
        let order = self
            .create_order(
                "/v3/pay/transactions/app",
                options,
                notify_url,
                &["out_trade_no", "amount.total", "description"],
            )
            .await?;
        let prepay_id = Self::prepay_id(&order)?;

        let config = self.client.config();
        let timestamp = time::now().timestamp().to_string();
        let nonce = nonce_str(32);
        let pay_sign = sign::sign_parts(
            self.client.private_key(),
            &[&config.app_id, &timestamp, &nonce, &format!("prepay_id={prepay_id}")],
        )?;
        Ok(json!({
            "appid": config.app_id,
            "partnerid": config.mch_id,
            "prepayid": prepay_id,
            "package": "Sign=WXPay",
            "noncestr": nonce,
            "timestamp": timestamp,
            "sign": pay_sign,
        }))
    }

    /// H5 payment outside WeChat. Returns the redirect URL.
    pub async fn h5(&self, options: Value, notify_url: &str) -> Result<String> {
        let order = self
            .create_order(
                "/v3/pay/transactions/h5",
                options,
                notify_url,
                &[
                    "out_trade_no",
                    "amount.total",
                    "description",
                    "scene_info.payer_client_ip",
                    "scene_info.h5_info.type",
                ],
            )
            .await?;
        order
            .get("h5_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::response_invalid("response carries no h5_url"))
    }

    /// Native payment. Returns the URL to render as a QR code.
    pub async fn native(&self, options: Value, notify_url: &str) -> Result<String> {
        let order = self
            .create_order(
                "/v3/pay/transactions/native",
                options,
                notify_url,
                &["out_trade_no", "amount.total", "description"],
            )
            .await?;
        order
            .get("code_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::response_invalid("response carries no code_url"))
    }

    /// Query an order by WeChat transaction id or merchant order number.
    pub async fn query(
        &self,
        transaction_id: Option<&str>,
        out_trade_no: Option<&str>,
    ) -> Result<Value> {
        let url = if let Some(id) = transaction_id.filter(|id| !id.is_empty()) {
            format!("/v3/pay/transactions/id/{id}")
        } else if let Some(no) = out_trade_no.filter(|no| !no.is_empty()) {
            format!("/v3/pay/transactions/out-trade-no/{no}")
        } else {
            return Err(Error::argument_invalid(
                "Missing Options [transaction_id OR out_trade_no]",
            ));
        };
        let query = vec![("mchid", self.client.config().mch_id.clone())];
        self.client
            .request(Method::GET, &url, &query, Value::Null)
            .await
    }

    /// Close an unpaid order.
    pub async fn close(&self, out_trade_no: &str) -> Result<Value> {
        if out_trade_no.is_empty() {
            return Err(Error::argument_invalid("Missing Options [out_trade_no]"));
        }
        let url = format!("/v3/pay/transactions/out-trade-no/{out_trade_no}/close");
        let body = json!({"mchid": self.client.config().mch_id});
        self.client.request(Method::POST, &url, &[], body).await
    }

    /// Refund a transaction.
    ///
    /// `options` must carry `transaction_id` or `out_trade_no`, plus
    /// `out_refund_no` and the `amount.refund/total/currency` triple.
    pub async fn refund(&self, options: Value) -> Result<Value> {
        let has = |field: &str| {
            options
                .get(field)
                .and_then(Value::as_str)
                .map_or(false, |v| !v.is_empty())
        };
        if !has("transaction_id") && !has("out_trade_no") {
            return Err(Error::argument_invalid(
                "Missing Options [transaction_id OR out_trade_no]",
            ));
        }
        require_fields(
            &options,
            &["out_refund_no", "amount.refund", "amount.total", "amount.currency"],
        )?;
        self.client
            .request(Method::POST, "/v3/refund/domestic/refunds", &[], options)
            .await
    }

    /// Query the state of a refund.
    pub async fn refund_query(&self, out_refund_no: &str) -> Result<Value> {
        if out_refund_no.is_empty() {
            return Err(Error::argument_invalid("Missing Options [out_refund_no]"));
        }
        let url = format!("/v3/refund/domestic/refunds/{out_refund_no}");
        self.client.request(Method::GET, &url, &[], Value::Null).await
    }

    /// Handle an asynchronous payment notification.
    ///
    /// Verifies the `Wechatpay-Timestamp`/`Nonce`/`Signature` header
    /// triplet against the platform certificate, decrypts the sealed
    /// resource and hands it to the callback. Always resolves to the
    /// acknowledgement JSON WeChat expects; no error escapes.
    pub async fn notify<F>(
        &self,
        timestamp: Option<&str>,
        nonce: Option<&str>,
        signature: Option<&str>,
        body: &str,
        callback: F,
    ) -> String
    where
        F: FnOnce(&Value) -> bool,
    {
        match self.verified_resource(timestamp, nonce, signature, body).await {
            Ok(data) => {
                if callback(&data) {
                    ack("SUCCESS", "success")
                } else {
                    ack("FAIL", "Business failure")
                }
            }
            Err(_) => ack("FAIL", "Signature verification failed"),
        }
    }

    async fn verified_resource(
        &self,
        timestamp: Option<&str>,
        nonce: Option<&str>,
        signature: Option<&str>,
        body: &str,
    ) -> Result<Value> {
        let header = |value: Option<&str>| {
            value
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::response_invalid("missing notify headers"))
        };
        let timestamp = header(timestamp)?;
        let nonce = header(nonce)?;
        let signature = header(signature)?;

        let cert = self.client.platform_certificate().await?;
        let platform_key = sign::public_key_from_cert(&cert)?;
        sign::verify_parts(&platform_key, &[&timestamp, &nonce, body], &signature)?;

        let envelope: Value = serde_json::from_str(body)
            .map_err(|e| Error::decode_invalid("notify body is not JSON").with_source(e))?;
        let resource = envelope
            .get("resource")
            .ok_or_else(|| Error::response_invalid("notify carries no resource"))?;
        let field = |name: &str| resource.get(name).and_then(Value::as_str);
        let ciphertext = field("ciphertext")
            .ok_or_else(|| Error::response_invalid("resource carries no ciphertext"))?;
        let resource_nonce = field("nonce")
            .ok_or_else(|| Error::response_invalid("resource carries no nonce"))?;

        let plain = sign::aes_256_gcm_decrypt(
            &self.client.config().mch_key,
            resource_nonce,
            field("associated_data").unwrap_or_default(),
            ciphertext,
        )?;
        serde_json::from_slice(&plain)
            .map_err(|e| Error::decode_invalid("decrypted resource is not JSON").with_source(e))
    }
}

fn ack(code: &str, message: &str) -> String {
    json!({"code": code, "message": message}).to_string()
}

/// Check dotted required paths, naming the first missing one.
fn require_fields(value: &Value, fields: &[&str]) -> Result<()> {
    for field in fields {
        let mut node = value;
        for part in field.split('.') {
            node = match node.get(part) {
                Some(v) if !v.is_null() => v,
                _ => {
                    return Err(Error::argument_invalid(format!("Missing Options [{field}]")));
                }
            };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;
    use test_case::test_case;

    #[test_case(json!({"out_trade_no": "T1", "amount": {"total": 100}}), "description"; "flat field")]
    #[test_case(json!({"out_trade_no": "T1", "description": "x"}), "amount.total"; "nested field")]
    #[test_case(json!({"amount": {"total": 100}, "description": "x"}), "out_trade_no"; "first field")]
    fn test_require_fields_names_the_missing_path(order: Value, missing: &str) {
        let err = require_fields(
            &order,
            &["out_trade_no", "amount.total", "description"],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
        assert_eq!(err.to_string(), format!("Missing Options [{missing}]"));
    }

    #[test]
    fn test_require_fields_accepts_complete_orders() {
        let order = json!({
            "out_trade_no": "T1",
            "amount": {"total": 100},
            "description": "x",
            "payer": {"openid": "oABCD"},
        });
        require_fields(
            &order,
            &["out_trade_no", "amount.total", "description", "payer.openid"],
        )
        .unwrap();
    }
}
