//! Scenario mutations: the write boundary
//!
//! A [`Mutation`] is one state-changing operation issued by the scenario
//! driver between verifications. Mutations are fallible and are never
//! retried; convergence after a mutation is verified by polling reads,
//! not by retrying writes.
//!
//! All cluster writes go through server-side apply or merge patches, so
//! re-running a scenario against a half-installed stack is safe.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::Client;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::discovery::ApiResource;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::FIELD_MANAGER;
use crate::Result;
use crate::cluster::build_api_resource;
use crate::error::Error;

/// One state-changing operation against the cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Mutation: Send + Sync {
    /// Human-readable statement of what the mutation does.
    fn describe(&self) -> String;

    /// Perform the change. Errors abort the scenario.
    async fn apply(&self) -> Result<()>;
}

/// Ensure a namespace exists (idempotent, server-side apply).
pub struct EnsureNamespace {
    client: Client,
    name: String,
}

impl EnsureNamespace {
    /// Mutation ensuring `name` exists.
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Mutation for EnsureNamespace {
    fn describe(&self) -> String {
        format!("ensure namespace {}", self.name)
    }

    async fn apply(&self) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": self.name }
        });
        api.patch(&self.name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&ns))
            .await?;
        debug!(namespace = %self.name, "Namespace ensured");
        Ok(())
    }
}

/// Create or replace a secret (idempotent, server-side apply).
pub struct ApplySecret {
    client: Client,
    namespace: String,
    name: String,
    secret_type: String,
    string_data: BTreeMap<String, String>,
}

impl ApplySecret {
    /// Mutation applying the named secret with the given string data.
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        name: impl Into<String>,
        secret_type: impl Into<String>,
        string_data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            secret_type: secret_type.into(),
            string_data,
        }
    }
}

#[async_trait]
impl Mutation for ApplySecret {
    fn describe(&self) -> String {
        format!("apply secret {}/{}", self.namespace, self.name)
    }

    async fn apply(&self) -> Result<()> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": self.name, "namespace": self.namespace },
            "type": self.secret_type,
            "stringData": self.string_data,
        });
        api.patch(
            &self.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;
        debug!(secret = %self.name, namespace = %self.namespace, "Secret applied");
        Ok(())
    }
}

/// Copy a secret from one namespace into another.
///
/// Fails if the source secret does not exist; the copy has nothing to
/// carry in that case and the scenario should stop there.
pub struct CopySecret {
    client: Client,
    from_namespace: String,
    to_namespace: String,
    name: String,
}

impl CopySecret {
    /// Mutation copying the named secret between namespaces.
    pub fn new(
        client: Client,
        from_namespace: impl Into<String>,
        to_namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            from_namespace: from_namespace.into(),
            to_namespace: to_namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl Mutation for CopySecret {
    fn describe(&self) -> String {
        format!(
            "copy secret {} from {} to {}",
            self.name, self.from_namespace, self.to_namespace
        )
    }

    async fn apply(&self) -> Result<()> {
        let source: Api<Secret> = Api::namespaced(self.client.clone(), &self.from_namespace);
        let existing = source.get(&self.name).await?;

        // Rebuild rather than resubmit: the fetched object carries
        // resourceVersion, uid, and managedFields that must not cross
        // namespaces.
        let copy = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": self.name, "namespace": self.to_namespace },
            "type": existing.type_,
            "data": existing.data,
        });
        let target: Api<Secret> = Api::namespaced(self.client.clone(), &self.to_namespace);
        target
            .patch(
                &self.name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&copy),
            )
            .await?;
        debug!(
            secret = %self.name,
            from = %self.from_namespace,
            to = %self.to_namespace,
            "Secret copied"
        );
        Ok(())
    }
}

/// Apply a full manifest through the dynamic API (server-side apply).
///
/// Metadata is extracted once at construction, so a malformed fixture
/// fails when the scenario is built rather than halfway through a run.
pub struct ApplyResource {
    client: Client,
    manifest: Value,
    api_resource: ApiResource,
    name: String,
    namespace: Option<String>,
}

impl std::fmt::Debug for ApplyResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyResource")
            .field("manifest", &self.manifest)
            .field("api_resource", &self.api_resource)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ApplyResource {
    /// Mutation applying `manifest`, which must carry apiVersion, kind,
    /// and metadata.name.
    pub fn new(client: Client, manifest: Value) -> Result<Self> {
        let api_version = manifest
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::serialization("manifest missing apiVersion"))?
            .to_string();
        let kind = manifest
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::serialization("manifest missing kind"))?
            .to_string();
        let name = manifest
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::serialization("manifest missing metadata.name"))?
            .to_string();
        let namespace = manifest
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            client,
            api_resource: build_api_resource(&api_version, &kind),
            manifest,
            name,
            namespace,
        })
    }
}

#[async_trait]
impl Mutation for ApplyResource {
    fn describe(&self) -> String {
        format!(
            "apply {} {}",
            self.api_resource.kind.to_lowercase(),
            self.name
        )
    }

    async fn apply(&self) -> Result<()> {
        let patch_params = PatchParams::apply(FIELD_MANAGER).force();
        let api: Api<DynamicObject> = match &self.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.api_resource),
            None => Api::all_with(self.client.clone(), &self.api_resource),
        };
        api.patch(&self.name, &patch_params, &Patch::Apply(&self.manifest))
            .await?;
        info!(
            kind = %self.api_resource.kind,
            name = %self.name,
            "Resource applied"
        );
        Ok(())
    }
}

/// Merge-patch one resource through the dynamic API.
///
/// Used to flip single fields on the operator's custom resource, e.g.
/// retention or availability settings.
pub struct MergePatchResource {
    client: Client,
    api_resource: ApiResource,
    namespace: Option<String>,
    name: String,
    patch: Value,
}

impl MergePatchResource {
    /// Mutation merge-patching the named resource with `patch`.
    pub fn new(
        client: Client,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
        patch: Value,
    ) -> Self {
        Self {
            client,
            api_resource: build_api_resource(&api_version.into(), &kind.into()),
            namespace,
            name: name.into(),
            patch,
        }
    }
}

#[async_trait]
impl Mutation for MergePatchResource {
    fn describe(&self) -> String {
        format!(
            "patch {} {}",
            self.api_resource.kind.to_lowercase(),
            self.name
        )
    }

    async fn apply(&self) -> Result<()> {
        let api: Api<DynamicObject> = match &self.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.api_resource),
            None => Api::all_with(self.client.clone(), &self.api_resource),
        };
        api.patch(
            &self.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&self.patch),
        )
        .await?;
        info!(
            kind = %self.api_resource.kind,
            name = %self.name,
            "Resource patched"
        );
        Ok(())
    }
}

/// Delete one resource through the dynamic API. Already-gone is success.
pub struct DeleteResource {
    client: Client,
    api_resource: ApiResource,
    namespace: Option<String>,
    name: String,
}

impl DeleteResource {
    /// Mutation deleting the named resource.
    pub fn new(
        client: Client,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_resource: build_api_resource(&api_version.into(), &kind.into()),
            namespace,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Mutation for DeleteResource {
    fn describe(&self) -> String {
        format!(
            "delete {} {}",
            self.api_resource.kind.to_lowercase(),
            self.name
        )
    }

    async fn apply(&self) -> Result<()> {
        let api: Api<DynamicObject> = match &self.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.api_resource),
            None => Api::all_with(self.client.clone(), &self.api_resource),
        };
        match api.delete(&self.name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(
                    kind = %self.api_resource.kind,
                    name = %self.name,
                    "Resource deleted"
                );
                Ok(())
            }
            // Already gone
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_client() -> Client {
        // A client pointed at a reserved address; construction does not
        // connect, and these tests never call apply().
        let config = kube::Config::new("http://127.0.0.1:8080".parse().expect("valid url"));
        Client::try_from(config).expect("client from config")
    }

    /// Story: a fixture missing its identity fields fails when the
    /// scenario is built, not halfway through a run.
    #[tokio::test]
    async fn story_apply_resource_rejects_incomplete_manifests() {
        let client = fake_client();

        let no_api_version = json!({ "kind": "MulticlusterObservability",
            "metadata": { "name": "observability" } });
        let err = ApplyResource::new(client.clone(), no_api_version).expect_err("must reject");
        assert!(err.to_string().contains("apiVersion"));

        let no_name = json!({
            "apiVersion": "observability.open-cluster-management.io/v1beta1",
            "kind": "MulticlusterObservability",
            "metadata": {},
        });
        let err = ApplyResource::new(client, no_name).expect_err("must reject");
        assert!(err.to_string().contains("metadata.name"));
    }

    /// Story: step descriptions name the exact object they touch, so a
    /// failure report reads like a change log.
    #[tokio::test]
    async fn story_descriptions_name_their_objects() {
        let client = fake_client();

        let ns = EnsureNamespace::new(client.clone(), "open-cluster-management-observability");
        assert_eq!(
            ns.describe(),
            "ensure namespace open-cluster-management-observability"
        );

        let secret = ApplySecret::new(
            client.clone(),
            "open-cluster-management-observability",
            "thanos-object-storage",
            "Opaque",
            BTreeMap::new(),
        );
        assert_eq!(
            secret.describe(),
            "apply secret open-cluster-management-observability/thanos-object-storage"
        );

        let copy = CopySecret::new(
            client.clone(),
            "open-cluster-management",
            "open-cluster-management-observability",
            "multiclusterhub-operator-pull-secret",
        );
        assert_eq!(
            copy.describe(),
            "copy secret multiclusterhub-operator-pull-secret \
             from open-cluster-management to open-cluster-management-observability"
        );

        let manifest = json!({
            "apiVersion": "observability.open-cluster-management.io/v1beta1",
            "kind": "MulticlusterObservability",
            "metadata": { "name": "observability" },
        });
        let apply = ApplyResource::new(client.clone(), manifest).expect("valid manifest");
        assert_eq!(apply.describe(), "apply multiclusterobservability observability");

        let delete = DeleteResource::new(
            client,
            "observability.open-cluster-management.io/v1beta1",
            "MulticlusterObservability",
            None,
            "observability",
        );
        assert_eq!(
            delete.describe(),
            "delete multiclusterobservability observability"
        );
    }
}
