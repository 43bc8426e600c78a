use bridge_core::{require_options, Error, Result};
use http::Method;
use serde_json::{json, Value};

use crate::client::GatewayClient;

/// Alipay fund operations: balances, transfer quotas and transfers.
#[derive(Clone, Debug)]
pub struct Fund {
    client: GatewayClient,
}

impl Fund {
    /// Create the facade around a gateway client.
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    /// Query an account balance.
    ///
    /// One of `alipay_open_id` or `alipay_user_id` must be given.
    pub async fn account_query(
        &self,
        account_type: &str,
        alipay_open_id: Option<&str>,
        alipay_user_id: Option<&str>,
    ) -> Result<Value> {
        if alipay_open_id.map_or(true, str::is_empty) && alipay_user_id.map_or(true, str::is_empty)
        {
            return Err(Error::argument_invalid(
                "Missing Options [alipay_open_id OR alipay_user_id]",
            ));
        }
        let mut query = vec![("account_type", account_type.to_string())];
        if let Some(id) = alipay_open_id.filter(|id| !id.is_empty()) {
            query.push(("alipay_open_id", id.to_string()));
        }
        if let Some(id) = alipay_user_id.filter(|id| !id.is_empty()) {
            query.push(("alipay_user_id", id.to_string()));
        }
        self.client
            .request(Method::GET, "/v3/alipay/fund/account/query", &query, Value::Null)
            .await
    }

    /// Query the remaining transfer quota for a product.
    pub async fn quota_query(&self, product_code: &str, biz_scene: &str) -> Result<Value> {
        let query = vec![
            ("product_code", product_code.to_string()),
            ("biz_scene", biz_scene.to_string()),
        ];
        self.client
            .request(Method::GET, "/v3/alipay/fund/quota/query", &query, Value::Null)
            .await
    }

    /// Single transfer to an Alipay account.
    ///
    /// `payee_info` must carry `identity` and `identity_type`.
    pub async fn transfer(
        &self,
        out_biz_no: &str,
        trans_amount: f64,
        biz_scene: &str,
        product_code: &str,
        order_title: &str,
        payee_info: Value,
    ) -> Result<Value> {
        let identity = payee_info
            .get("identity")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let identity_type = payee_info
            .get("identity_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        require_options(&[("identity", &identity), ("identity_type", &identity_type)])?;

        let body = json!({
            "out_biz_no": out_biz_no,
            "trans_amount": trans_amount,
            "biz_scene": biz_scene,
            "product_code": product_code,
            "order_title": order_title,
            "payee_info": payee_info,
        });
        self.client
            .request(Method::POST, "/v3/alipay/fund/trans/uni/transfer", &[], body)
            .await
    }
}
