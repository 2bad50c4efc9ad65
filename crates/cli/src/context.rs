//! Everything a command needs, built once from configuration

use crate::client::GatewayClient;
use crate::config::ClientConfig;
use gsr_common::{
    submission::{FilePendingStore, IdentityProvider, PendingStore, SubmissionPipeline},
    ObjectStorage, ObjectStoreBackend, PaperWriter,
};
use std::sync::Arc;

pub struct ClientContext {
    pub config: ClientConfig,
    pub gateway: Arc<GatewayClient>,
    pub identity: Arc<dyn IdentityProvider>,
    pub writer: Arc<dyn PaperWriter>,
    pub storage: Arc<dyn ObjectStorage>,
    pub pending: Arc<dyn PendingStore>,
}

impl ClientContext {
    /// Gateway-backed identity and writer, configured object storage and a
    /// file slot under `data_dir`
    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        let gateway = Arc::new(GatewayClient::new(
            &config.gateway_url,
            config.token.clone(),
            config.request_timeout(),
        )?);
        let storage = Arc::new(ObjectStoreBackend::from_config(&config.storage)?);
        let pending = Arc::new(FilePendingStore::in_dir(&config.data_dir));

        Ok(Self {
            identity: gateway.clone(),
            writer: gateway.clone(),
            gateway,
            storage,
            pending,
            config,
        })
    }

    /// A fresh pipeline for one submission
    pub fn pipeline(&self) -> SubmissionPipeline {
        SubmissionPipeline::new(
            self.identity.clone(),
            self.storage.clone(),
            self.writer.clone(),
            self.pending.clone(),
            self.config.login_url.clone(),
        )
    }
}
