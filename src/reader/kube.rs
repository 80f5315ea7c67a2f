//! Cluster-backed state readers
//!
//! Each reader fetches one kind of cluster state and projects it into a
//! compact JSON snapshot: just the fields the suite's predicates judge
//! and a failure report wants to show, not whole API objects with their
//! managed-fields noise.
//!
//! All readers treat a 404 and an empty label-selector match as
//! [`Observation::missing`], following the rule that an authoritative
//! "not there" answer is an observation, not an error.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Client;
use kube::api::{Api, DynamicObject, ListParams};
use serde_json::{Value, json};

use crate::Result;
use crate::cluster::build_api_resource;
use crate::observe::Observation;
use crate::reader::StateReader;

/// Reads the set of pods in one namespace, optionally narrowed by a
/// label selector.
pub struct PodSet {
    client: Client,
    namespace: String,
    selector: Option<String>,
}

impl PodSet {
    /// Reader for pods in `namespace` matching `selector`.
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            selector: Some(selector.into()),
        }
    }

    /// Reader for every pod in `namespace`.
    pub fn all(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            selector: None,
        }
    }
}

#[async_trait]
impl StateReader for PodSet {
    fn target(&self) -> String {
        match &self.selector {
            Some(selector) => format!("pods in {} matching {}", self.namespace, selector),
            None => format!("pods in {}", self.namespace),
        }
    }

    async fn read(&self) -> Result<Observation> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let mut params = ListParams::default();
        if let Some(selector) = &self.selector {
            params = params.labels(selector);
        }
        let pods = api.list(&params).await?;
        if pods.items.is_empty() {
            return Ok(Observation::missing(self.target()));
        }
        let projected: Vec<Value> = pods.items.iter().map(project_pod).collect();
        Ok(Observation::snapshot(
            self.target(),
            json!({ "count": projected.len(), "pods": projected }),
        ))
    }
}

fn project_pod(pod: &Pod) -> Value {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let phase = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    json!({ "name": name, "phase": phase })
}

/// Reads one StatefulSet by name, projecting replica counts and
/// container arguments.
pub struct StatefulSetByName {
    client: Client,
    namespace: String,
    name: String,
}

impl StatefulSetByName {
    /// Reader for the named StatefulSet.
    pub fn new(client: Client, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl StateReader for StatefulSetByName {
    fn target(&self) -> String {
        format!("statefulset {}/{}", self.namespace, self.name)
    }

    async fn read(&self) -> Result<Observation> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), &self.namespace);
        match api.get(&self.name).await {
            Ok(sts) => Ok(Observation::snapshot(
                self.target(),
                project_stateful_set(&sts),
            )),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(Observation::missing(self.target())),
            Err(e) => Err(e.into()),
        }
    }
}

fn project_stateful_set(sts: &StatefulSet) -> Value {
    let name = sts.metadata.name.clone().unwrap_or_default();
    let replicas = sts.spec.as_ref().and_then(|spec| spec.replicas);
    let ready = sts.status.as_ref().and_then(|status| status.ready_replicas);
    let containers: Vec<Value> = sts
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod_spec| {
            pod_spec
                .containers
                .iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "args": c.args.clone().unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({
        "name": name,
        "replicas": replicas,
        "ready_replicas": ready,
        "containers": containers,
    })
}

/// Reads every Deployment in one namespace, projecting replica counts.
pub struct DeploymentSet {
    client: Client,
    namespace: String,
}

impl DeploymentSet {
    /// Reader for all Deployments in `namespace`.
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl StateReader for DeploymentSet {
    fn target(&self) -> String {
        format!("deployments in {}", self.namespace)
    }

    async fn read(&self) -> Result<Observation> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let deployments = api.list(&ListParams::default()).await?;
        if deployments.items.is_empty() {
            return Ok(Observation::missing(self.target()));
        }
        let projected: Vec<Value> = deployments.items.iter().map(project_deployment).collect();
        Ok(Observation::snapshot(
            self.target(),
            json!({ "count": projected.len(), "deployments": projected }),
        ))
    }
}

fn project_deployment(deployment: &Deployment) -> Value {
    let name = deployment.metadata.name.clone().unwrap_or_default();
    let desired = deployment.spec.as_ref().and_then(|spec| spec.replicas);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    json!({ "name": name, "desired": desired, "ready": ready })
}

/// Reads one Namespace by name.
pub struct NamespaceByName {
    client: Client,
    name: String,
}

impl NamespaceByName {
    /// Reader for the named Namespace.
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl StateReader for NamespaceByName {
    fn target(&self) -> String {
        format!("namespace {}", self.name)
    }

    async fn read(&self) -> Result<Observation> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(&self.name).await {
            Ok(ns) => {
                // Phase shows Terminating during teardown, which is the
                // interesting part of a stuck-deletion report.
                let phase = ns
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Active".to_string());
                Ok(Observation::snapshot(
                    self.target(),
                    json!({ "name": self.name, "phase": phase }),
                ))
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(Observation::missing(self.target())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reads a fixed set of CRDs by name, reporting which are present.
pub struct CrdSet {
    client: Client,
    names: Vec<String>,
}

impl CrdSet {
    /// Reader for the given CRD names.
    pub fn new(client: Client, names: Vec<String>) -> Self {
        Self { client, names }
    }
}

#[async_trait]
impl StateReader for CrdSet {
    fn target(&self) -> String {
        format!("{} required CRDs", self.names.len())
    }

    async fn read(&self) -> Result<Observation> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for name in &self.names {
            match api.get(name).await {
                Ok(_) => present.push(name.clone()),
                Err(kube::Error::Api(e)) if e.code == 404 => missing.push(name.clone()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Observation::snapshot(
            self.target(),
            json!({ "present": present, "missing": missing }),
        ))
    }
}

/// Reads one custom resource by name through the dynamic API.
///
/// Used for the operator's own resources, whose schema is opaque to the
/// suite. The projection keeps spec and status, which is everything a
/// predicate about a custom resource judges.
pub struct DynamicByName {
    client: Client,
    api_version: String,
    kind: String,
    namespace: Option<String>,
    name: String,
}

impl DynamicByName {
    /// Reader for the named custom resource.
    pub fn new(
        client: Client,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_version: api_version.into(),
            kind: kind.into(),
            namespace,
            name: name.into(),
        }
    }
}

#[async_trait]
impl StateReader for DynamicByName {
    fn target(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{} {}/{}", self.kind.to_lowercase(), ns, self.name),
            None => format!("{} {}", self.kind.to_lowercase(), self.name),
        }
    }

    async fn read(&self) -> Result<Observation> {
        let ar = build_api_resource(&self.api_version, &self.kind);
        let api: Api<DynamicObject> = match &self.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };
        match api.get(&self.name).await {
            Ok(obj) => Ok(Observation::snapshot(self.target(), project_dynamic(&obj))),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(Observation::missing(self.target())),
            Err(e) => Err(e.into()),
        }
    }
}

fn project_dynamic(obj: &DynamicObject) -> Value {
    json!({
        "name": obj.metadata.name.clone().unwrap_or_default(),
        "spec": obj.data.get("spec").cloned().unwrap_or(Value::Null),
        "status": obj.data.get("status").cloned().unwrap_or(Value::Null),
    })
}
