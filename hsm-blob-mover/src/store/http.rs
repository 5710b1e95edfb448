/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};

use crate::error::{self, Error};
use crate::metadata::{AccessControl, Metadata};
use crate::path::BlobLocation;
use crate::store::{BlobProperties, BlobStore, BlockId};

/// REST API version sent with every request
pub const API_VERSION: &str = "2021-08-06";

const META_PREFIX: &str = "x-ms-meta-";
const ERROR_CODE: &str = "x-ms-error-code";
const OWNER: &str = "x-ms-owner";
const GROUP: &str = "x-ms-group";
const ACL: &str = "x-ms-acl";

/// [`BlobStore`] speaking the Blob and Data Lake REST APIs over HTTPS.
///
/// Requests are authorized by the shared access signature carried in each
/// [`BlobLocation`] URL. Transport errors are stripped of their URL before being surfaced so the
/// signature never reaches logs.
///
/// Metadata names read back through [`BlobStore::get_properties`] are lowercase; the service
/// treats them case-insensitively.
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
}

impl AzureBlobStore {
    /// Create a store with a default HTTP client
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| error::backend_unavailable(err.without_url()))?;
        Ok(Self { client })
    }

    /// Create a store using an existing HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("x-ms-version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, key: &str) -> Result<Response, Error> {
        let response = request
            .send()
            .await
            .map_err(|err| error::backend_unavailable(err.without_url()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(status_error(status, response.headers(), key))
        }
    }
}

fn with_query(url: &Url, pairs: &[(&str, &str)]) -> Url {
    let mut url = url.clone();
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in pairs {
            query.append_pair(name, value);
        }
    }
    url
}

fn with_metadata(mut request: RequestBuilder, metadata: &Metadata) -> RequestBuilder {
    for (name, value) in metadata {
        request = request.header(format!("{META_PREFIX}{name}"), value.as_str());
    }
    request
}

fn status_error(status: StatusCode, headers: &HeaderMap, key: &str) -> Error {
    let code = header_str(headers, ERROR_CODE).unwrap_or_default();
    let message = format!("{key}: HTTP {} {code}", status.as_u16());
    if status == StatusCode::NOT_FOUND {
        error::not_found(message)
    } else {
        error::backend_unavailable(message)
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn metadata_from_headers(headers: &HeaderMap) -> Metadata {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(META_PREFIX)?;
            Some((name.to_owned(), value.to_str().ok()?.to_owned()))
        })
        .collect()
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Request body of Put Block List
#[derive(Debug, Default, serde::Serialize)]
struct BlockList<'a> {
    #[serde(rename = "Latest")]
    latest: Vec<&'a str>,
}

fn block_list_xml(blocks: &[BlockId]) -> Result<String, Error> {
    let list = BlockList {
        latest: blocks.iter().map(BlockId::as_str).collect(),
    };
    let body = quick_xml::se::to_string(&list).map_err(error::invalid_input)?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Inclusive `x-ms-range` value for `length` bytes at `offset`
fn range_header(offset: u64, length: u64) -> String {
    let last = offset.saturating_add(length.max(1)) - 1;
    format!("bytes={offset}-{last}")
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put_blob(
        &self,
        location: &BlobLocation,
        body: Bytes,
        metadata: &Metadata,
    ) -> Result<(), Error> {
        let request = self
            .request(Method::PUT, location.flat_url().clone())
            .header("x-ms-blob-type", "BlockBlob")
            .body(body);
        self.send(with_metadata(request, metadata), location.key())
            .await?;
        Ok(())
    }

    async fn stage_block(
        &self,
        location: &BlobLocation,
        block_id: &BlockId,
        body: Bytes,
    ) -> Result<(), Error> {
        let url = with_query(
            location.flat_url(),
            &[("comp", "block"), ("blockid", block_id.as_str())],
        );
        let request = self.request(Method::PUT, url).body(body);
        self.send(request, location.key()).await?;
        Ok(())
    }

    async fn commit_block_list(
        &self,
        location: &BlobLocation,
        blocks: &[BlockId],
        metadata: &Metadata,
    ) -> Result<(), Error> {
        let url = with_query(location.flat_url(), &[("comp", "blocklist")]);
        let request = self
            .request(Method::PUT, url)
            .header("content-type", "application/xml")
            .body(block_list_xml(blocks)?);
        self.send(with_metadata(request, metadata), location.key())
            .await?;
        Ok(())
    }

    async fn get_properties(&self, location: &BlobLocation) -> Result<BlobProperties, Error> {
        let request = self.request(Method::HEAD, location.flat_url().clone());
        let response = self.send(request, location.key()).await?;
        let headers = response.headers();
        let len = header_str(headers, CONTENT_LENGTH.as_str())
            .and_then(|len| len.parse::<u64>().ok())
            .ok_or_else(|| {
                error::backend_unavailable(format!(
                    "{}: response is missing Content-Length",
                    location.key()
                ))
            })?;
        Ok(BlobProperties {
            len,
            metadata: metadata_from_headers(headers),
        })
    }

    async fn get_blob_range(
        &self,
        location: &BlobLocation,
        offset: u64,
        length: u64,
    ) -> Result<Bytes, Error> {
        let request = self
            .request(Method::GET, location.flat_url().clone())
            .header("x-ms-range", range_header(offset, length));
        let response = self.send(request, location.key()).await?;
        response
            .bytes()
            .await
            .map_err(|err| error::backend_unavailable(err.without_url()))
    }

    async fn delete_blob(&self, location: &BlobLocation) -> Result<(), Error> {
        let request = self
            .request(Method::DELETE, location.flat_url().clone())
            .header("x-ms-delete-snapshots", "include");
        self.send(request, location.key()).await?;
        Ok(())
    }

    async fn get_access_control(&self, location: &BlobLocation) -> Result<AccessControl, Error> {
        let url = with_query(location.namespace_url(), &[("action", "getAccessControl")]);
        let response = self
            .send(self.request(Method::HEAD, url), location.key())
            .await?;
        let headers = response.headers();
        Ok(AccessControl::new(
            header_str(headers, OWNER).unwrap_or_default(),
            header_str(headers, GROUP).unwrap_or_default(),
            header_str(headers, ACL).unwrap_or_default(),
        ))
    }

    async fn set_access_control(
        &self,
        location: &BlobLocation,
        access_control: &AccessControl,
    ) -> Result<(), Error> {
        let url = with_query(location.namespace_url(), &[("action", "setAccessControl")]);
        let mut request = self
            .request(Method::PATCH, url)
            .header(ACL, access_control.acl());
        if !access_control.owner().is_empty() {
            request = request.header(OWNER, access_control.owner());
        }
        if !access_control.group().is_empty() {
            request = request.header(GROUP, access_control.group());
        }
        self.send(request, location.key()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::{StatusCode, Url};

    use super::{block_list_xml, metadata_from_headers, range_header, status_error, with_query};
    use crate::error::ErrorKind;
    use crate::store::BlockId;

    #[test]
    fn test_query_is_appended_after_signature() {
        let url = Url::parse("https://acct.blob.core.windows.net/c/k?sv=1&sig=a%2Bb").unwrap();
        let id = BlockId::for_index(3);
        let staged = with_query(&url, &[("comp", "block"), ("blockid", id.as_str())]);
        let query = staged.query().unwrap();
        assert!(query.starts_with("sv=1&sig=a%2Bb&comp=block&blockid="));
        let (_, blockid) = staged
            .query_pairs()
            .find(|(name, _)| name == "blockid")
            .unwrap();
        assert_eq!(id.as_str(), blockid);
    }

    #[test]
    fn test_block_list_preserves_order() {
        let ids = [BlockId::for_index(0), BlockId::for_index(1)];
        let xml = block_list_xml(&ids).unwrap();
        let expected = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><BlockList><Latest>{}</Latest><Latest>{}</Latest></BlockList>"#,
            ids[0].as_str(),
            ids[1].as_str()
        );
        assert_eq!(expected, xml);
    }

    #[test]
    fn test_empty_block_list() {
        let xml = block_list_xml(&[]).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><BlockList"#));
        assert!(!xml.contains("<Latest>"));
    }

    #[test]
    fn test_range_header_is_inclusive() {
        assert_eq!("bytes=0-4", range_header(0, 5));
        assert_eq!("bytes=8-15", range_header(8, 8));
    }

    #[test]
    fn test_status_mapping() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-error-code", HeaderValue::from_static("BlobNotFound"));
        let err = status_error(StatusCode::NOT_FOUND, &headers, "export1/f");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("BlobNotFound"));

        headers.insert("x-ms-error-code", HeaderValue::from_static("ServerBusy"));
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, &headers, "export1/f");
        assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
        assert!(err.to_string().contains("503 ServerBusy"));
    }

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-meta-owner", HeaderValue::from_static("1000"));
        headers.insert("x-ms-meta-hdi_isfolder", HeaderValue::from_static("true"));
        headers.insert("content-length", HeaderValue::from_static("0"));
        let metadata = metadata_from_headers(&headers);
        assert_eq!(2, metadata.len());
        assert_eq!("1000", metadata["owner"]);
        assert_eq!("true", metadata["hdi_isfolder"]);
    }
}
