//! Subscription draft builder.

use std::sync::Arc;

use crate::api::wire::WireSignaturePayload;
use crate::api::{
    DeployerApi, SignaturePayloadRequest, SignaturePayloadResponse, SubscriptionDraft,
    TypedDataDomain, TypedDataPayload,
};
use crate::error::{DeployError, RemoteCall, Result};
use crate::notify::{Notice, Notifier, ids};
use crate::policy::{DraftParams, split_funding};
use crate::session::DeploymentSession;
use crate::types::decode_chain_id;

pub struct DraftBuilder {
    api: Arc<dyn DeployerApi>,
    notifier: Arc<dyn Notifier>,
    registry_id: String,
}

impl DraftBuilder {
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

    /// Request a signable draft for `params`.
    ///
    /// A session holds at most one draft; building again with the same
    /// parameters returns the recorded draft without a network call.
    pub async fn build(
        &self,
        session: &mut DeploymentSession,
        params: DraftParams,
    ) -> Result<SubscriptionDraft> {
        if let Some(existing) = session.draft() {
            if existing.params == params {
                return Ok(existing.clone());
            }
            return Err(DeployError::InvalidState(
                "a draft with different parameters already exists".to_string(),
            ));
        }

        let request = self.request(session, &params)?;
        self.notifier.notify(Notice::loading(
            ids::GENERATE_DATA,
            "Generating automation data...",
        ));

        let result = match self.api.generate_signature_payload(&request).await {
            Ok(response) => into_draft(params, response),
            Err(err) => Err(err),
        };
        let draft = super::notify_failure(self.notifier.as_ref(), ids::SETUP_ERROR, result)?;
        session.record_draft(draft.clone())?;

        tracing::info!(
            owner = %session.owner(),
            draft_id = %draft.draft_id,
            "subscription draft generated"
        );
        Ok(draft)
    }

    fn request(
        &self,
        session: &DeploymentSession,
        params: &DraftParams,
    ) -> Result<SignaturePayloadRequest> {
        let target = session
            .target()
            .ok_or(DeployError::MissingPrerequisite("precomputed target"))?;
        let quote = session
            .quote()
            .filter(|q| !q.signature().is_empty())
            .ok_or(DeployError::MissingPrerequisite("fee quote signature"))?;
        if !session.is_funded() {
            return Err(DeployError::MissingPrerequisite("funded deployment target"));
        }

        let (tokens, amounts) = split_funding(&params.funding);
        Ok(SignaturePayloadRequest {
            owner: session.owner(),
            precomputed_console_address: target,
            chain_id: session.chain_id(),
            registry_id: self.registry_id.clone(),
            fee_token: session.fee_token(),
            fee_estimate: quote.amount(),
            tokens,
            amounts,
            automation_subscription_limits: params.policy.clone(),
            metadata: params.schedule.clone(),
        })
    }
}

fn into_draft(params: DraftParams, response: SignaturePayloadResponse) -> Result<SubscriptionDraft> {
    let call = RemoteCall::GenerateSignaturePayload;
    let payload = response
        .signature_payload
        .ok_or_else(|| DeployError::invalid(call, "missing signaturePayload"))?;
    let policy_commit = response
        .sub_account_policy_commit
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::invalid(call, "missing subAccountPolicyCommit"))?;
    let draft_id = response
        .subscription_draft_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::invalid(call, "missing subscriptionDraftID"))?;

    Ok(SubscriptionDraft {
        params,
        payload: typed_data(payload)?,
        policy_commit,
        draft_id,
    })
}

fn typed_data(payload: WireSignaturePayload) -> Result<TypedDataPayload> {
    let call = RemoteCall::GenerateSignaturePayload;
    let domain = payload.domain;
    let verifying_contract = domain
        .verifying_contract
        .ok_or_else(|| DeployError::invalid(call, "missing domain.verifyingContract"))?;
    let chain_id = domain
        .chain_id
        .as_deref()
        .ok_or_else(|| DeployError::invalid(call, "missing domain.chainId"))
        .and_then(decode_chain_id)?;
    let primary_type = payload
        .primary_type
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::invalid(call, "missing primaryType"))?;
    if !payload.types.is_object() {
        return Err(DeployError::invalid(call, "types must be an object"));
    }
    if payload.message.is_null() {
        return Err(DeployError::invalid(call, "missing message"));
    }

    Ok(TypedDataPayload {
        domain: TypedDataDomain {
            chain_id,
            verifying_contract,
            name: domain.name,
            version: domain.version,
            salt: domain.salt,
        },
        message: payload.message,
        types: payload.types,
        primary_type,
    })
}
