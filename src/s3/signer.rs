//! AWS Signature V4 请求签名
//!
//! 纯计算，无 I/O：给定凭证、方法、路径、负载和单次捕获的时间戳，
//! 产出待发送的签名头与 Authorization 头。

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// 签名结果：除 Authorization 外需随请求发送的头（含 host），以及 Authorization 本身
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
    pub authorization: String,
}

/// 请求签名器
pub struct Signer {
    access_key: String,
    secret_key: String,
    region: String,
}

impl Signer {
    pub fn new(access_key: String, secret_key: String, region: String) -> Self {
        Self {
            access_key,
            secret_key,
            region,
        }
    }

    /// 对一次请求签名
    ///
    /// 短日期与长日期都从同一个 `now` 推导，避免跨天瞬间两种表示不一致。
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        payload: &[u8],
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> SignedRequest {
        let short_date = now.format("%Y%m%d").to_string();
        let long_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let canonical_uri = encode_path(path);
        let payload_hash = hex::encode(Sha256::digest(payload));

        // 签名头按小写键名排序，验签方以同样顺序重算
        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host.to_string()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), long_date.clone()),
        ];
        if let Some(ct) = content_type {
            headers.push(("content-type".to_string(), ct.to_string()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();
        let signed_header_names = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        // 空行位对应查询串，本客户端不使用查询参数
        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_header_names, payload_hash
        );

        let scope = format!("{}/{}/s3/aws4_request", short_date, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            long_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&short_date);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key, scope, signed_header_names, signature
        );

        SignedRequest {
            headers,
            authorization,
        }
    }

    /// 派生签名密钥：secret -> 日期 -> 区域 -> 服务 -> aws4_request 四级链式 HMAC
    fn signing_key(&self, short_date: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), short_date.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC 密钥长度不受限");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// 按路径段做百分号编码，`/` 分隔符本身永不编码
pub(crate) fn encode_path(path: &str) -> String {
    let encoded = path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// SHA-256("")
    const EMPTY_PAYLOAD_HASH: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn test_signer() -> Signer {
        Signer::new(
            "AKIAEXAMPLE".to_string(),
            "secret".to_string(),
            "auto".to_string(),
        )
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 15, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = test_signer();
        let a = signer.sign("GET", "b.example.com", "/x.jpg", &[], None, fixed_time());
        let b = signer.sign("GET", "b.example.com", "/x.jpg", &[], None, fixed_time());
        assert_eq!(a.authorization, b.authorization);
        assert_eq!(a.headers, b.headers);
    }

    #[test]
    fn test_authorization_structure() {
        let signer = test_signer();
        let signed = signer.sign("GET", "b.example.com", "/x.jpg", &[], None, fixed_time());

        assert!(
            signed
                .authorization
                .starts_with("AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20240215/auto/s3/aws4_request, ")
        );
        assert!(
            signed
                .authorization
                .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date, ")
        );

        let signature = signed
            .authorization
            .rsplit("Signature=")
            .next()
            .unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_type_joins_signed_headers_sorted() {
        let signer = test_signer();
        let signed = signer.sign(
            "PUT",
            "b.example.com",
            "/x.jpg",
            b"data",
            Some("image/jpeg"),
            fixed_time(),
        );

        // content-type 按字典序排在 host 之前
        assert!(
            signed
                .authorization
                .contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date, ")
        );
        let names: Vec<&str> = signed.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["content-type", "host", "x-amz-content-sha256", "x-amz-date"]
        );
    }

    #[test]
    fn test_empty_payload_hash() {
        let signer = test_signer();
        let signed = signer.sign("DELETE", "b.example.com", "/x.jpg", &[], None, fixed_time());

        let (_, hash) = signed
            .headers
            .iter()
            .find(|(k, _)| k == "x-amz-content-sha256")
            .unwrap();
        assert_eq!(hash, EMPTY_PAYLOAD_HASH);
    }

    #[test]
    fn test_both_dates_from_single_capture() {
        let signer = test_signer();
        // 跨天边界前一秒，两种日期表示必须来自同一时刻
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let signed = signer.sign("GET", "b.example.com", "/x.jpg", &[], None, now);

        assert!(signed.authorization.contains("/20231231/"));
        let (_, amz_date) = signed
            .headers
            .iter()
            .find(|(k, _)| k == "x-amz-date")
            .unwrap();
        assert_eq!(amz_date, "20231231T235959Z");
    }

    #[test]
    fn test_payload_changes_signature() {
        let signer = test_signer();
        let a = signer.sign("PUT", "b.example.com", "/x", b"aaa", None, fixed_time());
        let b = signer.sign("PUT", "b.example.com", "/x", b"bbb", None, fixed_time());
        assert_ne!(a.authorization, b.authorization);
    }

    #[test]
    fn test_encode_path_segments() {
        assert_eq!(encode_path("2024/02/image.jpg"), "/2024/02/image.jpg");
        assert_eq!(encode_path("a b/c.jpg"), "/a%20b/c.jpg");
        assert_eq!(encode_path("/leading/slash"), "/leading/slash");
        // 非 ASCII 文件名逐段编码，分隔符保留
        assert_eq!(
            encode_path("2024/照片.jpg"),
            "/2024/%E7%85%A7%E7%89%87.jpg"
        );
        // AWS 非保留字符不编码
        assert_eq!(encode_path("a-b_c.d~e/f"), "/a-b_c.d~e/f");
    }
}
