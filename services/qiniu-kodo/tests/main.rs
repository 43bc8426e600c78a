use async_trait::async_trait;
use bridge_core::hash::base64_urlsafe_decode;
use bridge_core::{Context, Error, ErrorKind, HttpSend, Result};
use bridge_qiniu_kodo::{sign, BatchOperation, Bucket, Config, Objects, Service};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

fn test_config() -> Config {
    Config {
        access_key: "qn_ak".to_string(),
        secret_key: "qn_sk".to_string(),
        region_id: "z1".to_string(),
        access_domain: "cdn.example.com".to_string(),
        bucket_name: "mybucket".to_string(),
        ..Default::default()
    }
}

#[derive(Clone, Debug)]
struct Captured {
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted transport: records every request and plays back queued
/// `(status, body)` JSON responses, always tagged with an `X-Reqid`.
#[derive(Clone, Debug, Default)]
struct ScriptedKodo {
    requests: Arc<Mutex<Vec<Captured>>>,
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
}

impl ScriptedKodo {
    fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back((status, body.into()));
        self
    }

    fn take(&self) -> Captured {
        self.requests.lock().unwrap().remove(0)
    }
}

#[async_trait]
impl HttpSend for ScriptedKodo {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let headers = req
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        self.requests.lock().unwrap().push(Captured {
            method: req.method().as_str().to_string(),
            uri: req.uri().to_string(),
            headers,
            body: req.body().to_vec(),
        });

        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::unexpected("no scripted response left"))?;
        let mut builder = http::Response::builder()
            .status(status)
            .header("X-Reqid", "qn-req-1");
        if !body.is_empty() {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
        }
        Ok(builder.body(Bytes::from(body))?)
    }
}

#[tokio::test]
async fn test_bucket_list_signs_tag_condition() {
    let _ = env_logger::builder().is_test(true).try_init();
    let transport = ScriptedKodo::default().respond(200, r#"["mybucket"]"#);
    let ctx = Context::new().with_http_send(transport.clone());
    let service = Service::new(ctx, test_config()).unwrap();

    let tags = vec![("env".to_string(), "prod".to_string())];
    let list = service.bucket_list(&tags).await.unwrap();
    assert_eq!(list, json!(["mybucket"]));

    let req = transport.take();
    assert_eq!(req.method, "GET");
    // urlsafe_b64("key=env&value=prod")
    let condition = "a2V5PWVudiZ2YWx1ZT1wcm9k";
    assert_eq!(
        req.uri,
        format!("https://uc.qiniuapi.com/buckets?tagCondition={condition}")
    );
    assert!(req.header("date").is_some());
    assert_eq!(req.header("host"), Some("uc.qiniuapi.com"));
    let expected = sign::management_token(
        "qn_ak",
        "qn_sk",
        "GET",
        "uc.qiniuapi.com",
        "/buckets",
        &[("tagCondition".to_string(), Some(condition.to_string()))],
        &[(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )],
        None,
    );
    assert_eq!(req.header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_error_envelope_maps_to_vendor_response() {
    let transport = ScriptedKodo::default().respond(612, r#"{"error":"no such file or directory"}"#);
    let ctx = Context::new().with_http_send(transport);
    let objects = Objects::new(ctx, test_config()).unwrap();

    let err = objects.get_meta_data("a.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VendorResponse);
    assert_eq!(err.request_id(), Some("qn-req-1"));
    assert!(err.to_string().contains("no such file"));
}

#[tokio::test]
async fn test_error_without_envelope_is_response_invalid() {
    let transport = ScriptedKodo::default().respond(502, "");
    let ctx = Context::new().with_http_send(transport);
    let objects = Objects::new(ctx, test_config()).unwrap();

    let err = objects.get_meta_data("a.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    assert!(err.to_string().contains("Request exception: status 502"));
}

#[tokio::test]
async fn test_upload_builds_form_and_token() {
    let transport = ScriptedKodo::default().respond(200, r#"{"hash":"h","name":"a.txt"}"#);
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    objects
        .upload("a.txt", b"hello", Default::default())
        .await
        .unwrap();

    let req = transport.take();
    assert_eq!(req.method, "POST");
    assert_eq!(req.uri, "https://up-z1.qiniup.com/");
    assert!(req
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8(req.body.clone()).unwrap();
    let crc = crc32fast::hash(b"hello");
    assert!(body.contains(&format!("name=\"crc32\"\r\n\r\n{crc}\r\n")));
    assert!(body.contains("name=\"file\"; filename=\"a.txt\"\r\nContent-Type: application/octet-stream\r\n\r\nhello\r\n"));

    // The embedded token carries the policy for exactly this object.
    let token_field = body
        .split("name=\"token\"\r\n\r\n")
        .nth(1)
        .and_then(|rest| rest.split("\r\n").next())
        .unwrap();
    assert!(token_field.starts_with("qn_ak:"));
    let encoded_policy = token_field.rsplit(':').next().unwrap();
    let policy: Value =
        serde_json::from_slice(&base64_urlsafe_decode(encoded_policy).unwrap()).unwrap();
    assert_eq!(policy["scope"], json!("mybucket:a.txt"));
    assert_eq!(policy["fileType"], json!(0));
    assert_eq!(
        policy["returnBody"],
        json!(r#"{"name":"$(fname)","size":"$(fsize)","hash":"$(etag)"}"#)
    );
}

#[tokio::test]
async fn test_set_meta_data_ignores_response_body() {
    let transport = ScriptedKodo::default().respond(200, r#"{"ignored":true}"#);
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    let result = objects
        .set_meta_data("a.txt", Some("text/html"), &[], &[])
        .await
        .unwrap();
    assert_eq!(result, Value::Null);

    let req = transport.take();
    // urlsafe_b64("mybucket:a.txt") and urlsafe_b64("text/html")
    assert_eq!(
        req.uri,
        "https://rs-z1.qiniuapi.com/chgm/bXlidWNrZXQ6YS50eHQ=/mime/dGV4dC9odG1s"
    );
}

#[tokio::test]
async fn test_delete_signature_covers_path_and_content_type() {
    let transport = ScriptedKodo::default().respond(200, "");
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    objects.delete("a.txt").await.unwrap();

    let req = transport.take();
    let expected = sign::management_token(
        "qn_ak",
        "qn_sk",
        "POST",
        "rs-z1.qiniuapi.com",
        "/delete/bXlidWNrZXQ6YS50eHQ=",
        &[],
        &[(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )],
        None,
    );
    assert_eq!(req.header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_batch_joins_operations() {
    let transport = ScriptedKodo::default().respond(200, r#"[{"code":200},{"code":200}]"#);
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    let operations = vec![
        BatchOperation::Delete {
            filename: "a.txt".to_string(),
        },
        BatchOperation::Move {
            source: "b.txt".to_string(),
            target: "c.txt".to_string(),
            target_bucket: None,
            force: false,
        },
    ];
    objects.batch(&operations).await.unwrap();

    let req = transport.take();
    assert_eq!(req.uri, "https://rs-z1.qiniuapi.com/batch");
    let body = String::from_utf8(req.body.clone()).unwrap();
    assert_eq!(
        body,
        "op=/delete/bXlidWNrZXQ6YS50eHQ=\
         &op=/move/bXlidWNrZXQ6Yi50eHQ=/bXlidWNrZXQ6Yy50eHQ=/force/false"
    );
    assert_eq!(req.header("content-length"), Some(body.len().to_string().as_str()));
}

#[tokio::test]
async fn test_multipart_init_uses_upload_token() {
    let transport = ScriptedKodo::default().respond(200, r#"{"uploadId":"UP1"}"#);
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    let result = objects.init_part("a.txt", 1, 3600).await.unwrap();
    assert_eq!(result["uploadId"], json!("UP1"));

    let req = transport.take();
    assert_eq!(
        req.uri,
        "https://up-z1.qiniup.com/buckets/mybucket/objects/YS50eHQ=/uploads"
    );
    let auth = req.header("authorization").unwrap();
    assert!(auth.starts_with("UpToken qn_ak:"));
    let policy: Value = serde_json::from_slice(
        &base64_urlsafe_decode(auth.rsplit(':').next().unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(policy["scope"], json!("mybucket:a.txt"));
    assert_eq!(policy["fileType"], json!(1));
    assert!(policy.get("returnBody").is_none());
}

#[test]
fn test_client_upload_part_descriptor() {
    let objects = Objects::new(Context::new(), test_config()).unwrap();
    let descriptor = objects.client_upload_part("a.txt", "UP1", 7, 3600).unwrap();
    assert_eq!(
        descriptor["url"],
        json!("https://up-z1.qiniup.com/buckets/mybucket/objects/YS50eHQ=/uploads/UP1/7")
    );
    assert_eq!(descriptor["method"], json!("PUT"));
    assert_eq!(descriptor["content_type"], json!("application/octet-stream"));
    assert_eq!(descriptor["part_number"], json!(7));
    assert_eq!(descriptor["file_path"], json!("https://cdn.example.com/a.txt"));
    assert!(descriptor["header"]["Authorization"]
        .as_str()
        .unwrap()
        .starts_with("UpToken qn_ak:"));
}

#[tokio::test]
async fn test_bucket_create_validates_caller_region() {
    let transport = ScriptedKodo::default().respond(200, "");
    let ctx = Context::new().with_http_send(transport.clone());
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    let err = bucket.create("z9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);

    bucket.create("z2").await.unwrap();
    let req = transport.take();
    assert_eq!(req.uri, "https://uc.qiniuapi.com/mkbucketv3/mybucket/region/z2");
}

#[test]
fn test_missing_bucket_name_is_argument_invalid() {
    let config = Config {
        bucket_name: String::new(),
        ..test_config()
    };
    let objects = Objects::new(Context::new(), config).unwrap();
    let err = objects.client_upload_part("a.txt", "UP1", 1, 60).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    assert_eq!(err.to_string(), "Missing Options [bucketName]");
}

#[test]
fn test_unknown_region_fails_before_any_io() {
    let config = Config {
        region_id: "z9".to_string(),
        ..test_config()
    };
    let err = Objects::new(Context::new(), config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.to_string().contains("Unknown region Id z9"));
}
