//! Push/pull endpoints

use async_trait::async_trait;
use cmf_core::dto::transfer::{PROTOCOL_VERSION, PullQuery, PushRequest};
use reqwest::Url;

use crate::error::{ClientError, Result};
use crate::{MetadataTransport, ServerClient, TransportResponse};

impl ServerClient {
    /// Build `{base_url}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("bad server url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest(format!("cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

#[async_trait]
impl MetadataTransport for ServerClient {
    async fn send_subgraph(&self, request: &PushRequest) -> Result<TransportResponse> {
        let url = self.endpoint(&["mlmd_push"])?;

        tracing::info!(
            pipeline = %request.pipeline_name,
            execution = ?request.execution_uuid,
            "Pushing metadata to {}",
            url
        );

        let response = self.client.post(url).json(request).send().await?;

        Self::into_transport_response(response).await
    }

    async fn fetch_subgraph(
        &self,
        pipeline_name: &str,
        execution_uuid: Option<&str>,
    ) -> Result<TransportResponse> {
        let url = self.endpoint(&["mlmd_pull", pipeline_name])?;
        let query = PullQuery {
            exec_uuid: execution_uuid.map(str::to_string),
            protocol_version: Some(PROTOCOL_VERSION),
        };

        tracing::info!(
            pipeline = %pipeline_name,
            execution = ?execution_uuid,
            "Pulling metadata from {}",
            url
        );

        let response = self.client.get(url).query(&query).send().await?;

        Self::into_transport_response(response).await
    }
}
