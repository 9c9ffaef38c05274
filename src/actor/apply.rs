//! Idempotent server-side apply with change detection.

use kube::api::{Api, Patch, PatchParams};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Server-side apply `desired` under a stable field owner with forced
/// ownership, reporting whether the server observed a change.
///
/// The resource version on `desired` is always cleared before the apply so
/// the server drives conflict detection. Change detection compares the
/// resource version before and after: absent before means created.
pub async fn apply_ssa<K>(api: &Api<K>, desired: &K, field_owner: &str) -> Result<bool>
where
    K: Resource + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
    K::DynamicType: Default,
{
    let name = desired.name_any();

    let pre_rv = match api.get_opt(&name).await {
        Ok(existing) => existing.and_then(|o| o.resource_version()),
        Err(e) => return Err(Error::KubeError(e)),
    };

    let mut desired = desired.clone();
    desired.meta_mut().resource_version = None;

    let params = PatchParams::apply(field_owner).force();
    let applied = api.patch(&name, &params, &Patch::Apply(&desired)).await?;

    match pre_rv {
        None => Ok(true),
        Some(rv) => Ok(applied.resource_version() != Some(rv)),
    }
}
