//! Mini-program operations: login/session handling and user data.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use bridge_core::hash::{base64_decode, hex_sha1};
use bridge_core::{Context, Error, Result};
use http::Method;
use serde_json::{json, Value};

use crate::config::MiniappConfig;
use crate::token::ApiClient;

const API_ORIGIN: &str = "https://api.weixin.qq.com";

/// Mini-program login and session management.
#[derive(Clone, Debug)]
pub struct Login {
    client: ApiClient,
}

impl Login {
    /// Create the client.
    pub fn new(ctx: Context, config: MiniappConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::miniapp(ctx, config)?,
        })
    }

    /// Exchange a `wx.login` code for the session key and openid.
    pub async fn code2session(&self, js_code: &str) -> Result<Value> {
        let query = [
            ("appid", self.client.app_id().to_string()),
            ("secret", self.client.app_secret().to_string()),
            ("js_code", js_code.to_string()),
            ("grant_type", "authorization_code".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/sns/jscode2session"),
                &query,
                Value::Null,
                false,
            )
            .await
    }

    /// Check whether a session key is still valid.
    ///
    /// `signature` is the hex SHA-256 HMAC of an empty string under the
    /// session key.
    pub async fn check_session(&self, openid: &str, signature: &str) -> Result<Value> {
        self.session_call("/wxa/checksession", openid, signature).await
    }

    /// Invalidate the current session key and issue a new one.
    pub async fn reset_session(&self, openid: &str, signature: &str) -> Result<Value> {
        self.session_call("/wxa/resetusersessionkey", openid, signature)
            .await
    }

    async fn session_call(&self, path: &str, openid: &str, signature: &str) -> Result<Value> {
        let query = [
            ("openid", openid.to_string()),
            ("signature", signature.to_string()),
            ("sig_method", "hmac_sha256".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}{path}"),
                &query,
                Value::Null,
                true,
            )
            .await
    }
}

/// Mini-program user data: identifiers, phone numbers and the
/// encrypted-payload helpers.
#[derive(Clone, Debug)]
pub struct User {
    client: ApiClient,
}

impl User {
    /// Create the client.
    pub fn new(ctx: Context, config: MiniappConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::miniapp(ctx, config)?,
        })
    }

    /// The plugin user openpid for a `wx.pluginLogin` code.
    pub async fn plugin_open_pid(&self, code: &str) -> Result<Value> {
        self.client
            .request(
                Method::POST,
                &format!("{API_ORIGIN}/wxa/getpluginopenpid"),
                &[],
                json!({"code": code}),
                true,
            )
            .await
    }

    /// Check whether an encrypted payload was issued by WeChat.
    ///
    /// `encrypted_msg_hash` is the hex SHA-256 of the encrypted data.
    pub async fn check_encrypted_data(&self, encrypted_msg_hash: &str) -> Result<Value> {
        self.client
            .request(
                Method::POST,
                &format!("{API_ORIGIN}/wxa/business/checkencryptedmsg"),
                &[],
                json!({"encrypted_msg_hash": encrypted_msg_hash}),
                true,
            )
            .await
    }

    /// The union id of a user who completed a payment.
    pub async fn paid_union_id(
        &self,
        openid: &str,
        transaction_id: Option<&str>,
        mch_id: Option<&str>,
        out_trade_no: Option<&str>,
    ) -> Result<Value> {
        let mut query = vec![("openid", openid.to_string())];
        if let Some(id) = transaction_id {
            query.push(("transaction_id", id.to_string()));
        }
        if let Some(id) = mch_id {
            query.push(("mch_id", id.to_string()));
        }
        if let Some(no) = out_trade_no {
            query.push(("out_trade_no", no.to_string()));
        }
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/wxa/getpaidunionid"),
                &query,
                Value::Null,
                true,
            )
            .await
    }

    /// The user encrypt key bound to the current session.
    pub async fn user_encrypt_key(&self, openid: &str, signature: &str) -> Result<Value> {
        let query = [
            ("openid", openid.to_string()),
            ("signature", signature.to_string()),
            ("sig_method", "hmac_sha256".to_string()),
        ];
        self.client
            .request(
                Method::GET,
                &format!("{API_ORIGIN}/wxa/business/getuserencryptkey"),
                &query,
                Value::Null,
                true,
            )
            .await
    }

    /// The phone number behind a `getPhoneNumber` event code.
    pub async fn phone_number(&self, code: &str, openid: Option<&str>) -> Result<Value> {
        self.client
            .request(
                Method::POST,
                &format!("{API_ORIGIN}/wxa/business/getuserphonenumber"),
                &[],
                json!({"code": code, "openid": openid}),
                true,
            )
            .await
    }

    /// Check the signature a mini program attaches to raw user data:
    /// SHA-1 over the raw data concatenated with the session key.
    pub fn check(&self, raw_data: &str, signature: &str, session_key: &str) -> bool {
        hex_sha1(format!("{raw_data}{session_key}").as_bytes()) == signature
    }

    /// Decrypt the encrypted user payload handed out by the client.
    ///
    /// AES-128-CBC with PKCS7 padding; key and IV are base64 in the
    /// session payload.
    pub fn decode_user_info(
        &self,
        encrypted_data: &str,
        iv: &str,
        session_key: &str,
    ) -> Result<Value> {
        if session_key.len() != 24 {
            return Err(Error::argument_invalid("Missing Options [session_key]"));
        }
        if iv.len() > 24 {
            return Err(Error::argument_invalid("Missing Options [iv]"));
        }
        let key = base64_decode(session_key)?;
        let iv = base64_decode(iv)?;
        let data = base64_decode(encrypted_data)?;

        let cipher = cbc::Decryptor::<aes::Aes128>::new_from_slices(&key, &iv)
            .map_err(|_| Error::decode_invalid("bad session key or iv"))?;
        let plain = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&data)
            .map_err(|_| Error::decode_invalid("user info decryption failed"))?;
        serde_json::from_slice(&plain)
            .map_err(|e| Error::decode_invalid("decrypted user info is not JSON").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncryptMut;
    use bridge_core::hash::base64_encode;
    use bridge_core::{Context, ErrorKind};
    use pretty_assertions::assert_eq;

    fn test_user() -> User {
        let config = MiniappConfig {
            app_id: "wxtest".to_string(),
            app_secret: "secret".to_string(),
        };
        User::new(Context::new(), config).unwrap()
    }

    #[test]
    fn test_check_matches_sha1_of_raw_data_and_session_key() {
        let user = test_user();
        let signature = hex_sha1(b"{\"nickName\":\"n\"}SESSIONKEY");
        assert!(user.check("{\"nickName\":\"n\"}", &signature, "SESSIONKEY"));
        assert!(!user.check("{\"nickName\":\"x\"}", &signature, "SESSIONKEY"));
    }

    #[test]
    fn test_decode_user_info_round_trip() {
        let key = b"0123456789abcdef";
        let iv = b"fedcba9876543210";
        let plain = b"{\"openId\":\"oABCD\",\"nickName\":\"n\"}";
        let sealed = cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plain);

        let user = test_user();
        let decoded = user
            .decode_user_info(
                &base64_encode(&sealed),
                &base64_encode(iv),
                &base64_encode(key),
            )
            .unwrap();
        assert_eq!(decoded["openId"], serde_json::json!("oABCD"));
    }

    #[test]
    fn test_decode_user_info_checks_key_and_iv_shape() {
        let user = test_user();
        let err = user.decode_user_info("AAAA", "AAAA", "tooshort").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);

        let err = user
            .decode_user_info("AAAA", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "MDEyMzQ1Njc4OWFiY2RlZg==")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    }
}
