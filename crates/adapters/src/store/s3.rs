// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3-compatible object store adapter

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

/// Object store backed by any S3-compatible endpoint
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Store {
    /// Connect to an S3-compatible endpoint. Credentials come from the
    /// standard AWS environment/profile chain.
    pub async fn connect(endpoint: &str, region: &str, bucket: &str, public_base: &str) -> Self {
        let region_provider = RegionProviderChain::first_try(Region::new(region.to_string()));
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        // Path-style addressing keeps non-AWS endpoints happy
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(config),
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await;

        match result {
            Ok(_) => Ok(format!("{}/{}/{}", self.public_base, self.bucket, key)),
            Err(err) => {
                let message = aws_sdk_s3::error::DisplayErrorContext(&err).to_string();
                if let SdkError::ServiceError(service) = &err {
                    let status = service.raw().status().as_u16();
                    if status == 401 || status == 403 {
                        return Err(StoreError::Auth(message));
                    }
                    if (400..500).contains(&status) {
                        return Err(StoreError::Rejected(message));
                    }
                }
                Err(StoreError::Transient(message))
            }
        }
    }
}
