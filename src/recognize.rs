//! Feature extraction client.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::vector::FeatureVector;

/// Turns product photos into feature vectors.
pub trait Recognizer: Send + Sync + 'static {
    fn extract(
        &self,
        image_url: &str,
    ) -> impl std::future::Future<Output = AppResult<FeatureVector>> + Send;

    fn fetch_image(
        &self,
        image_url: &str,
    ) -> impl std::future::Future<Output = AppResult<Vec<u8>>> + Send;
}

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    features: Vec<f64>,
}

/// Talks to the extraction service over HTTP.
///
/// `POST {base_url}/extract_features` with an `image_url` form field, answered
/// with `{"features": [..]}`.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecognizer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Recognizer for HttpRecognizer {
    async fn extract(&self, image_url: &str) -> AppResult<FeatureVector> {
        let url = format!("{}/extract_features", self.base_url);
        let response: FeaturesResponse = self
            .client
            .post(url)
            .form(&[("image_url", image_url)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(dimension = response.features.len(), "features extracted");
        FeatureVector::new(response.features).map_err(|err| {
            AppError::ExternalService(format!("recognizer returned an unusable vector: {err}"))
        })
    }

    async fn fetch_image(&self, image_url: &str) -> AppResult<Vec<u8>> {
        let bytes = self
            .client
            .get(image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
