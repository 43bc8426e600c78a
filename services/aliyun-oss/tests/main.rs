use async_trait::async_trait;
use bridge_aliyun_oss::{sign, Bucket, Config, ListOptions, Objects};
use bridge_core::hash::base64_encode;
use bridge_core::{time, Context, Error, ErrorKind, HttpSend, Result};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

fn test_config() -> Config {
    Config {
        access_key_id: "ak_id".to_string(),
        access_key_secret: "ak_secret".to_string(),
        region_id: "cn-hangzhou".to_string(),
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

/// Scripted transport: records every request and plays back queued
/// `(status, content_type, body)` responses.
#[derive(Clone, Debug, Default)]
struct ScriptedOss {
    requests: Arc<Mutex<Vec<Captured>>>,
    responses: Arc<Mutex<VecDeque<(u16, &'static str, String)>>>,
}

impl ScriptedOss {
    fn respond(self, status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back((status, content_type, body.into()));
        self
    }

    fn take(&self) -> Captured {
        self.requests.lock().unwrap().remove(0)
    }
}

#[async_trait]
impl HttpSend for ScriptedOss {
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

        let (status, content_type, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::unexpected("no scripted response left"))?;
        let mut builder = http::Response::builder().status(status);
        if !content_type.is_empty() {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        Ok(builder.body(Bytes::from(body))?)
    }
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[tokio::test]
async fn test_bucket_info_signs_and_extracts_bucket_node() {
    let _ = env_logger::builder().is_test(true).try_init();
    let transport = ScriptedOss::default().respond(
        200,
        "application/xml",
        "<BucketInfo><Bucket>\
         <Name>mybucket</Name><Location>oss-cn-hangzhou</Location>\
         </Bucket></BucketInfo>",
    );
    let ctx = Context::new().with_http_send(transport.clone());
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    let info = bucket.info("mybucket").await.unwrap();
    assert_eq!(info["Name"], json!("mybucket"));

    let req = transport.take();
    assert_eq!(req.method, "GET");
    assert_eq!(req.uri, "https://mybucket.oss-cn-hangzhou.aliyuncs.com/?bucketInfo");
    assert_eq!(req.header("x-oss-content-sha256"), Some("UNSIGNED-PAYLOAD"));
    assert_eq!(req.header("host"), Some("mybucket.oss-cn-hangzhou.aliyuncs.com"));
    assert!(req.header("x-oss-date").is_some());
    assert!(req
        .header("authorization")
        .unwrap()
        .starts_with("OSS4-HMAC-SHA256 Credential=ak_id/"));
}

#[tokio::test]
async fn test_signature_covers_transmitted_headers() {
    let transport = ScriptedOss::default().respond(200, "", "");
    let ctx = Context::new().with_http_send(transport.clone());
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    bucket.set_acl("mybucket", "private").await.unwrap();

    let req = transport.take();
    let signed: Vec<(String, String)> = req
        .headers
        .iter()
        .filter(|(k, _)| k != "authorization")
        .cloned()
        .collect();
    let expected = sign::authorization(
        "ak_id",
        "ak_secret",
        "cn-hangzhou",
        "PUT",
        Some("mybucket"),
        None,
        &[("acl".to_string(), None)],
        &signed,
        time::now(),
    );
    assert_eq!(req.header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_error_envelope_maps_to_vendor_response() {
    let transport = ScriptedOss::default().respond(
        403,
        "application/xml",
        "<Error><Code>SignatureDoesNotMatch</Code>\
         <Message>The request signature we calculated does not match.</Message>\
         <RequestId>5C1B138A109F4E405B2D</RequestId></Error>",
    );
    let ctx = Context::new().with_http_send(transport);
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    let err = bucket.stat("mybucket").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VendorResponse);
    assert_eq!(err.vendor_code(), Some("SignatureDoesNotMatch"));
    assert_eq!(err.request_id(), Some("5C1B138A109F4E405B2D"));
    assert!(err.to_string().contains("signature we calculated"));
}

#[tokio::test]
async fn test_error_without_xml_body_is_response_invalid() {
    let transport = ScriptedOss::default().respond(500, "", "");
    let ctx = Context::new().with_http_send(transport);
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    let err = bucket.stat("mybucket").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    assert!(err.to_string().contains("Request exception"));
}

#[tokio::test]
async fn test_delete_multiple_builds_xml_and_md5() {
    let transport = ScriptedOss::default().respond(
        200,
        "application/xml",
        "<DeleteResult></DeleteResult>",
    );
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    let files = vec![
        ("a.txt".to_string(), None),
        ("b.txt".to_string(), Some("v1".to_string())),
        ("c.txt".to_string(), Some(String::new())),
    ];
    objects.delete_multiple(&files, true, None).await.unwrap();

    let req = transport.take();
    assert_eq!(req.method, "POST");
    assert_eq!(req.uri, "https://mybucket.oss-cn-hangzhou.aliyuncs.com/?delete");
    let body = String::from_utf8(req.body.clone()).unwrap();
    assert_eq!(
        body,
        "<Delete><Quiet>true</Quiet>\
         <Object><Key>a.txt</Key></Object>\
         <Object><Key>b.txt</Key><VersionId>v1</VersionId></Object>\
         <Object><Key>c.txt</Key><VersionId>null</VersionId></Object>\
         </Delete>"
    );
    assert_eq!(
        req.header("content-md5"),
        Some(base64_encode(&md5::compute(body.as_bytes()).0).as_str())
    );
}

#[tokio::test]
async fn test_object_list_uses_v2_protocol() {
    let transport =
        ScriptedOss::default().respond(200, "application/xml", "<ListBucketResult><KeyCount>0</KeyCount></ListBucketResult>");
    let ctx = Context::new().with_http_send(transport.clone());
    let objects = Objects::new(ctx, test_config()).unwrap();

    let options = ListOptions {
        prefix: Some("logs/".to_string()),
        max_keys: Some(10),
        ..Default::default()
    };
    let result = objects.list(options).await.unwrap();
    assert_eq!(result["KeyCount"], json!("0"));

    let req = transport.take();
    assert_eq!(
        req.uri,
        "https://mybucket.oss-cn-hangzhou.aliyuncs.com/?list-type=2&max-keys=10&prefix=logs/"
    );
}

#[tokio::test]
async fn test_upload_part_returns_checksums_from_headers() {
    let transport = ScriptedOss::default();
    {
        let mut responses = transport.responses.lock().unwrap();
        responses.push_back((200, "", String::new()));
    }
    // Checksum headers ride on the response, not in the body.
    let ctx = Context::new().with_http_send(EtagTransport(transport.clone()));
    let objects = Objects::new(ctx, test_config()).unwrap();

    let result = objects
        .upload_part("a.txt", "UPLOAD1", 1, "chunk".to_string())
        .await
        .unwrap();
    assert_eq!(result["ETag"], json!("\"ABC123\""));
    assert_eq!(result["hash-crc64ecma"], json!("12345"));

    let req = transport.take();
    assert_eq!(
        req.uri,
        "https://mybucket.oss-cn-hangzhou.aliyuncs.com/a.txt?partNumber=1&uploadId=UPLOAD1"
    );
}

/// Wraps [`ScriptedOss`] to add checksum response headers.
#[derive(Clone, Debug)]
struct EtagTransport(ScriptedOss);

#[async_trait]
impl HttpSend for EtagTransport {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let resp = self.0.http_send(req).await?;
        let (mut parts, body) = resp.into_parts();
        parts.headers.insert("ETag", "\"ABC123\"".parse().unwrap());
        parts.headers.insert("Content-MD5", "b64md5==".parse().unwrap());
        parts.headers.insert("x-oss-hash-crc64ecma", "12345".parse().unwrap());
        Ok(http::Response::from_parts(parts, body))
    }
}

#[tokio::test]
async fn test_location_decodes_text_only_root() {
    let transport = ScriptedOss::default().respond(
        200,
        "application/xml",
        "<LocationConstraint>oss-cn-hangzhou</LocationConstraint>",
    );
    let ctx = Context::new().with_http_send(transport);
    let bucket = Bucket::new(ctx, test_config()).unwrap();

    let location = bucket.location("mybucket").await.unwrap();
    assert_eq!(location, json!("oss-cn-hangzhou"));
}

#[test]
fn test_unknown_region_fails_before_any_io() {
    let config = Config {
        region_id: "cn-nowhere".to_string(),
        ..test_config()
    };
    let err = Bucket::new(Context::new(), config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.to_string().contains("Unknown region Id cn-nowhere"));
}
