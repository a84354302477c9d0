//! Organization event handlers.

use tenure_core::{ActionRecorder, OrganizationId};

use super::onboarding::record_onboarding_action;
use super::{EventMeta, ProjectionContext};
use crate::effects::EffectQueue;
use crate::error::{Error, Result};
use crate::events::OnboardingStatusUpdated;
use crate::model::OnboardingDetails;
use crate::store::Store;

/// Handles `V1_ORGANIZATION_UPDATE_ONBOARDING_STATUS`.
///
/// The status is written as sent. An action is recorded only when it differs
/// from the stored one, attributed to the user when their name is known.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the organization does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        organization_id = %organization_id,
        status = data.status.as_str(),
    )
)]
pub async fn handle_onboarding_status_update<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    organization_id: OrganizationId,
    data: &OnboardingStatusUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut organization = ctx
        .store
        .get_organization(meta.tenant, &organization_id)
        .await?
        .ok_or_else(|| Error::not_found("organization", organization_id))?;

    let previous = organization.onboarding.status;
    organization.onboarding = OnboardingDetails {
        status: data.status,
        comments: data.comments.clone(),
        updated_at: Some(data.updated_at),
    };
    organization.updated_at = data.updated_at;
    ctx.store
        .save_organization(meta.tenant, &organization)
        .await?;

    if previous == data.status {
        tracing::debug!("onboarding status unchanged");
        return Ok(());
    }
    ctx.record_transition(
        "organization",
        &organization_id.to_string(),
        previous.as_str(),
        data.status.as_str(),
    );

    let user = match data.user_id.as_deref() {
        Some(user_id) => match ctx.store.user_display_name(meta.tenant, user_id).await {
            Ok(name) => name.map(|name| (user_id, name)),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "failed to resolve user name");
                None
            }
        },
        None => None,
    };
    let changed_by = user
        .as_ref()
        .map(|(user_id, name)| (*user_id, name.as_str()));
    record_onboarding_action(ctx, meta, &organization, changed_by, data.caused_by_contract_id)
        .await;
    Ok(())
}
