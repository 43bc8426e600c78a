//! Official-account operations: web OAuth, template messages and user
//! management.

use bridge_core::hash::hex_sha1;
use bridge_core::utils::nonce_str;
use bridge_core::{time, Context, Error, Result};
use http::Method;
use serde_json::{json, Value};

use crate::config::OfficialConfig;
use crate::token::{urlencode, ApiClient};

const API_ORIGIN: &str = "https://api.weixin.qq.com";

/// Web OAuth for official accounts, plus the JS-SDK signature.
#[derive(Clone, Debug)]
pub struct Oauth {
    client: ApiClient,
}

impl Oauth {
    /// Create the client.
    pub fn new(ctx: Context, config: OfficialConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::official(ctx, config)?,
        })
    }

    /// The browser authorization URL, first step of the web OAuth flow.
    ///
    /// `with_user_info` selects the `snsapi_userinfo` scope; otherwise
    /// the silent `snsapi_base` scope is requested.
    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        with_user_info: bool,
        state: Option<&str>,
    ) -> Result<String> {
        if redirect_uri.is_empty() {
            return Err(Error::argument_invalid("Missing Options [redirect_uri]"));
        }
        let redirect = urlencode(redirect_uri);
        let scope = if with_user_info {
            "snsapi_userinfo"
        } else {
            "snsapi_base"
        };
        let state = state.unwrap_or_default();
        Ok(format!(
            "https://open.weixin.qq.com/connect/oauth2/authorize?appid={}&redirect_uri={redirect}\
             &response_type=code&scope={scope}&state={state}#wechat_redirect",
            self.client.app_id()
        ))
    }

    /// Exchange the OAuth callback code for a user access token.
    pub async fn user_access_token(&self, code: &str) -> Result<Value> {
        if code.is_empty() {
            return Err(Error::argument_invalid("Missing Options [code]"));
        }
        let query = [
            ("appid", self.client.app_id().to_string()),
            ("secret", self.client.app_secret().to_string()),
            ("code", code.to_string()),
            ("grant_type", "authorization_code".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/sns/oauth2/access_token"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// Refresh a user access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<Value> {
        let query = [
            ("appid", self.client.app_id().to_string()),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/sns/oauth2/refresh_token"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// The user profile, UnionID mechanism.
    pub async fn user_info(&self, access_token: &str, openid: &str) -> Result<Value> {
        let query = [
            ("access_token", access_token.to_string()),
            ("openid", openid.to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/sns/userinfo"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// Check whether a user access token is still valid.
    pub async fn check_access_token(&self, access_token: &str, openid: &str) -> Result<Value> {
        let query = [
            ("access_token", access_token.to_string()),
            ("openid", openid.to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/sns/auth"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// The JS-SDK config signature for a page URL.
    ///
    /// The jsapi ticket is cached next to the access token; the
    /// signature is SHA-1 over the sorted `key=value` string.
    pub async fn js_sdk_sign(&self, url: &str) -> Result<Value> {
        let cache_key = format!("wechat_jsapi_ticket_{}", self.client.app_id());
        let ticket = match self.client.ctx().cache_get(&cache_key).await? {
            Some(ticket) if !ticket.is_empty() => ticket,
            _ => {
                let result = self
                    .client
                    .request(
                        Method::GET,
                        &format!(
                            "{API_ORIGIN}/cgi-bin/ticket/getticket?access_token=ACCESS_TOKEN&type=jsapi"
                        ),
                        &[],
                        Value::Null,
                        false,
                    )
                    .await?;
                let ticket = result
                    .get("ticket")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::response_invalid("ticket response carries no ticket"))?;
                let expires_in = result
                    .get("expires_in")
                    .and_then(Value::as_i64)
                    .unwrap_or(7200);
                self.client
                    .ctx()
                    .cache_set(&cache_key, ticket, expires_in)
                    .await?;
                ticket.to_string()
            }
        };

        let timestamp = time::now().timestamp();
        let nonce = nonce_str(16);
        let content =
            format!("jsapi_ticket={ticket}&noncestr={nonce}&timestamp={timestamp}&url={url}");
        let signature = hex_sha1(content.as_bytes());
        Ok(json!({
            "appId": self.client.app_id(),
            "timestamp": timestamp,
            "nonceStr": nonce,
            "signature": signature,
        }))
    }
}

/// Template message management for official accounts.
#[derive(Clone, Debug)]
pub struct Template {
    client: ApiClient,
}

impl Template {
    /// Create the client.
    pub fn new(ctx: Context, config: OfficialConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::official(ctx, config)?,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.client
            .request(
                Method::POST,
                &format!("{API_ORIGIN}{path}?access_token=ACCESS_TOKEN"),
                &[],
                body,
                false,
            )
            .await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}{path}?access_token=ACCESS_TOKEN"),
                &[],
                Value::Null,
                false,
            )
            .await
    }

    /// Set the two industries the account belongs to.
    pub async fn set_industry(&self, industry_id1: &str, industry_id2: &str) -> Result<Value> {
        self.post(
            "/cgi-bin/template/api_set_industry",
            json!({"industry_id1": industry_id1, "industry_id2": industry_id2}),
        )
        .await
    }

    /// The configured industries.
    pub async fn get_industry(&self) -> Result<Value> {
        self.get("/cgi-bin/template/get_industry").await
    }

    /// Add a template from the library.
    pub async fn add_template(
        &self,
        template_id_short: &str,
        keyword_name_list: &[&str],
    ) -> Result<Value> {
        self.post(
            "/cgi-bin/template/api_add_template",
            json!({
                "template_id_short": template_id_short,
                "keyword_name_list": keyword_name_list,
            }),
        )
        .await
    }

    /// All private templates of the account.
    pub async fn get_all_private_template(&self) -> Result<Value> {
        self.get("/cgi-bin/template/get_all_private_template").await
    }

    /// Delete a private template.
    pub async fn delete_private_template(&self, template_id: &str) -> Result<Value> {
        self.post(
            "/cgi-bin/template/del_private_template",
            json!({"template_id": template_id}),
        )
        .await
    }

    /// Send a template message.
    pub async fn send(
        &self,
        to_user: &str,
        template_id: &str,
        data: Value,
        url: Option<&str>,
        mini_program: Option<Value>,
        client_msg_id: Option<&str>,
    ) -> Result<Value> {
        self.post(
            "/cgi-bin/message/template/send",
            json!({
                "touser": to_user,
                "template_id": template_id,
                "url": url,
                "miniprogram": mini_program,
                "client_msg_id": client_msg_id,
                "data": data,
            }),
        )
        .await
    }
}

/// User and tag management for official accounts.
#[derive(Clone, Debug)]
pub struct User {
    client: ApiClient,
}

impl User {
    /// Create the client.
    pub fn new(ctx: Context, config: OfficialConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::official(ctx, config)?,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.client
            .request(
                Method::POST,
                &format!("{API_ORIGIN}{path}?access_token=ACCESS_TOKEN"),
                &[],
                body,
                false,
            )
            .await
    }

    /// Create a user tag.
    pub async fn create_tag(&self, name: &str) -> Result<Value> {
        self.post("/cgi-bin/tags/create", json!({"tag": {"name": name}}))
            .await
    }

    /// All existing tags.
    pub async fn get_tag(&self) -> Result<Value> {
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/cgi-bin/tags/get?access_token=ACCESS_TOKEN"),
                &[],
                Value::Null,
                false,
            )
            .await
    }

    /// Rename a tag.
    pub async fn update_tag(&self, tag_id: i64, name: &str) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/update",
            json!({"tag": {"id": tag_id, "name": name}}),
        )
        .await
    }

    /// Delete a tag.
    pub async fn delete_tag(&self, tag_id: i64) -> Result<Value> {
        self.post("/cgi-bin/tags/delete", json!({"tag": {"id": tag_id}}))
            .await
    }

    /// Users carrying a tag, paginated by `next_openid`.
    pub async fn get_tag_user(&self, tag_id: i64, next_openid: Option<&str>) -> Result<Value> {
        self.post(
            "/cgi-bin/user/tag/get",
            json!({"tagid": tag_id, "next_openid": next_openid}),
        )
        .await
    }

    /// Bind a tag to a batch of users.
    pub async fn batch_bind_tag(&self, tag_id: i64, openid_list: &[&str]) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/members/batchtagging",
            json!({"tagid": tag_id, "openid_list": openid_list}),
        )
        .await
    }

    /// Unbind a tag from a batch of users.
    pub async fn batch_unbind_tag(&self, tag_id: i64, openid_list: &[&str]) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/members/batchuntagging",
            json!({"tagid": tag_id, "openid_list": openid_list}),
        )
        .await
    }

    /// Tags bound to one user.
    pub async fn get_user_tag(&self, openid: &str) -> Result<Value> {
        self.post("/cgi-bin/tags/getidlist", json!({"openid": openid}))
            .await
    }

    /// Set the remark name of a user.
    pub async fn update_remark(&self, openid: &str, remark: &str) -> Result<Value> {
        self.post(
            "/cgi-bin/user/info/updateremark",
            json!({"openid": openid, "remark": remark}),
        )
        .await
    }

    /// One user's profile, UnionID mechanism.
    pub async fn get_user_info(&self, openid: &str) -> Result<Value> {
        let query = [
            ("openid", openid.to_string()),
            ("lang", "zh_CN".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/cgi-bin/user/info?access_token=ACCESS_TOKEN"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// Profiles for a batch of users.
    pub async fn batch_get_user_info(&self, openid_list: &[&str]) -> Result<Value> {
        let user_list: Vec<Value> = openid_list
            .iter()
            .map(|openid| json!({"openid": openid}))
            .collect();
        self.post("/cgi-bin/user/info/batchget", json!({"user_list": user_list}))
            .await
    }

    /// The follower list, paginated by `next_openid`.
    pub async fn get_user_list(&self, next_openid: Option<&str>) -> Result<Value> {
        let mut query = Vec::new();
        if let Some(openid) = next_openid {
            query.push(("next_openid", openid.to_string()));
        }
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/cgi-bin/user/get?access_token=ACCESS_TOKEN"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// The blacklist, paginated by `begin_openid`.
    pub async fn get_black_list(&self, begin_openid: Option<&str>) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/members/getblacklist",
            json!({"begin_openid": begin_openid}),
        )
        .await
    }

    /// Blacklist a batch of users.
    pub async fn batch_black(&self, openid_list: &[&str]) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/members/batchblacklist",
            json!({"openid_list": openid_list}),
        )
        .await
    }

    /// Remove a batch of users from the blacklist.
    pub async fn batch_unblack(&self, openid_list: &[&str]) -> Result<Value> {
        self.post(
            "/cgi-bin/tags/members/batchunblacklist",
            json!({"openid_list": openid_list}),
        )
        .await
    }
}
