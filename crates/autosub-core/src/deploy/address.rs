//! Final sub-account address resolution.

use std::sync::Arc;

use crate::api::DeployerApi;
use crate::error::{DeployError, RemoteCall, Result};
use crate::notify::{Notifier, ids};
use crate::session::DeploymentSession;
use crate::types::Address;

pub struct AddressResolver {
    api: Arc<dyn DeployerApi>,
    notifier: Arc<dyn Notifier>,
    registry_id: String,
}

impl AddressResolver {
    pub fn new(
        api: Arc<dyn DeployerApi>,
        notifier: Arc<dyn Notifier>,
        registry_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            notifier,
            registry_id: registry_id.into(),
        }
    }

    pub async fn resolve(&self, session: &mut DeploymentSession) -> Result<Address> {
        if let Some(address) = session.sub_account() {
            return Ok(address);
        }
        let request = super::deploy_request(session, &self.registry_id)?;

        let result = match self.api.compute_deployment_address(&request).await {
            Ok(response) => response.sub_account_address.ok_or_else(|| {
                DeployError::invalid(RemoteCall::ComputeDeploymentAddress, "missing subAccountAddress")
            }),
            Err(err) => Err(err),
        };
        let address = super::notify_failure(
            self.notifier.as_ref(),
            ids::SETUP_ERROR,
            result.map_err(DeployError::address_resolution),
        )?;

        session.record_sub_account(address)?;
        tracing::info!(owner = %session.owner(), sub_account = %address, "resolved sub-account");
        Ok(address)
    }
}
