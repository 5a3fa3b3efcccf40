use {
    async_trait::async_trait,
    gatehouse_bootstrap::{FetchedImage, ServiceResult, services::ImageFetcher},
    reqwest::header::CONTENT_TYPE,
};

use crate::error::{Error, Result};

/// Downloads workspace images over HTTP.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn download(&self, url: &str) -> Result<FetchedImage> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                context: "workspace image download",
                status,
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> ServiceResult<FetchedImage> {
        Ok(self.download(url).await?)
    }
}
