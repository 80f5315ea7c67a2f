//! Scenario builders for the multicluster observability stack.
//!
//! Each builder wires readers, predicates, and mutations into one
//! scenario. Order inside a scenario matters: the instance manifest
//! references secrets created two steps earlier, and teardown deletes
//! the namespace only after the instance is confirmed gone.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::Result;
use crate::cluster::Cluster;
use crate::config::{ConsoleOptions, StorageOptions, SuiteOptions};
use crate::mutate::{
    ApplyResource, ApplySecret, CopySecret, DeleteResource, EnsureNamespace, MergePatchResource,
};
use crate::predicate;
use crate::reader::http::{HttpProbe, MetricQuery};
use crate::reader::kube::{
    CrdSet, DeploymentSet, DynamicByName, NamespaceByName, PodSet, StatefulSetByName,
};
use crate::scenario::Scenario;

/// Key inside the object-storage secret the operator hands to Thanos.
const OBJECT_STORE_KEY: &str = "thanos.yaml";

/// Raw-resolution retention the retention scenario patches in.
const RAW_RETENTION: &str = "3d";

/// The operator deployment left exactly one pod, and it is Running.
pub fn operator_running(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let operator = &options.operator;
    Ok(Scenario::new("operator-running").verify(
        PodSet::new(
            cluster.client().clone(),
            &operator.namespace,
            &operator.pod_selector,
        ),
        predicate::presence("exactly one operator pod running", |pods| {
            pods["count"] == 1
                && pods["pods"]
                    .as_array()
                    .is_some_and(|pods| pods.iter().all(|pod| pod["phase"] == "Running"))
        }),
        options.timing.quick()?,
    ))
}

/// Every CRD the operator serves custom resources through exists.
pub fn crds_established(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    Ok(Scenario::new("crds-established").verify(
        CrdSet::new(
            cluster.client().clone(),
            options.operator.required_crds.clone(),
        ),
        predicate::presence("all required CRDs present", |crds| {
            crds["missing"]
                .as_array()
                .is_some_and(|missing| missing.is_empty())
        }),
        options.timing.quick()?,
    ))
}

/// The install story: namespace, secrets, instance, then wait for the
/// operator to report the stack Ready.
pub fn stack_deployed(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let client = cluster.client().clone();
    let operator = &options.operator;

    let mut object_store = BTreeMap::new();
    object_store.insert(
        OBJECT_STORE_KEY.to_string(),
        object_store_config(&options.storage)?,
    );

    Ok(Scenario::new("stack-deployed")
        .mutate(EnsureNamespace::new(
            client.clone(),
            &operator.observability_namespace,
        ))
        .mutate(CopySecret::new(
            client.clone(),
            &operator.namespace,
            &operator.observability_namespace,
            &operator.pull_secret_name,
        ))
        .mutate(ApplySecret::new(
            client.clone(),
            &operator.observability_namespace,
            &operator.storage_secret_name,
            "Opaque",
            object_store,
        ))
        .mutate(ApplyResource::new(client.clone(), instance_manifest(options))?)
        .verify(
            DynamicByName::new(
                client,
                &operator.api_version,
                &operator.kind,
                None,
                &operator.resource_name,
            ),
            predicate::status_condition_true("Ready"),
            options.timing.convergence()?,
        ))
}

/// The Grafana console answers over HTTP.
pub fn console_reachable(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let console = &options.console;
    Ok(Scenario::new("console-reachable").verify(
        HttpProbe::new(
            cluster.http().clone(),
            &console.grafana_url,
            console.token.clone(),
        ),
        predicate::presence("console answers with HTTP 200", |probe| {
            probe["status"] == 200
        }),
        options.timing.convergence()?,
    ))
}

/// Patching raw retention on the instance reaches the compactor's
/// container arguments.
pub fn retention_applied(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let client = cluster.client().clone();
    let operator = &options.operator;
    let flag = format!("--retention.resolution-raw={RAW_RETENTION}");

    Ok(Scenario::new("retention-applied")
        .mutate(MergePatchResource::new(
            client.clone(),
            &operator.api_version,
            &operator.kind,
            None,
            &operator.resource_name,
            json!({ "spec": { "retentionResolutionRaw": RAW_RETENTION } }),
        ))
        .verify(
            StatefulSetByName::new(
                client,
                &operator.observability_namespace,
                &operator.compactor_name,
            ),
            predicate::presence(
                "compactor arguments carry the new raw retention",
                move |sts| {
                    sts["containers"].as_array().is_some_and(|containers| {
                        containers.iter().any(|container| {
                            container["args"]
                                .as_array()
                                .is_some_and(|args| args.iter().any(|arg| *arg == *flag))
                        })
                    })
                },
            ),
            options.timing.convergence()?,
        ))
}

/// The managed cluster's metrics are queryable through the console.
pub fn metrics_available(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let console = &options.console;
    Ok(Scenario::new("metrics-available").verify(
        MetricQuery::new(
            cluster.http().clone(),
            query_endpoint(console),
            &console.managed_cluster_query,
            console.token.clone(),
        ),
        predicate::presence("query returns at least one series", |result| {
            result["series"].as_u64().is_some_and(|series| series > 0)
        }),
        options.timing.convergence()?,
    ))
}

/// Disabling metrics on the addon spec drains the collector pods and,
/// after the store stops receiving, the metric itself.
pub fn addon_disabled(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let client = cluster.client().clone();
    let operator = &options.operator;
    let console = &options.console;

    Ok(Scenario::new("addon-disabled")
        .mutate(MergePatchResource::new(
            client.clone(),
            &operator.api_version,
            &operator.kind,
            None,
            &operator.resource_name,
            json!({ "spec": { "observabilityAddonSpec": { "enableMetrics": false } } }),
        ))
        .verify(
            PodSet::new(
                client,
                &operator.addon_namespace,
                &operator.collector_selector,
            ),
            predicate::absence("metrics collector pods drained"),
            options.timing.slow()?,
        )
        .verify(
            MetricQuery::new(
                cluster.http().clone(),
                query_endpoint(console),
                &console.managed_cluster_query,
                console.token.clone(),
            ),
            predicate::absence("managed cluster metric stops arriving"),
            options.timing.slow()?,
        ))
}

/// Switching availabilityConfig from High to Basic scales every stack
/// deployment down to one replica.
pub fn availability_basic(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let client = cluster.client().clone();
    let operator = &options.operator;

    Ok(Scenario::new("availability-basic")
        .mutate(MergePatchResource::new(
            client.clone(),
            &operator.api_version,
            &operator.kind,
            None,
            &operator.resource_name,
            json!({ "spec": { "availabilityConfig": "Basic" } }),
        ))
        .verify(
            DeploymentSet::new(client, &operator.observability_namespace),
            predicate::presence("every stack deployment scaled to one replica", |state| {
                state["deployments"]
                    .as_array()
                    .is_some_and(|deployments| {
                        deployments.iter().all(|deployment| deployment["desired"] == 1)
                    })
            }),
            options.timing.convergence()?,
        ))
}

/// Teardown: delete the instance, confirm the stack and the addon are
/// gone everywhere, then remove the namespace.
pub fn uninstalled(cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
    let client = cluster.client().clone();
    let operator = &options.operator;

    Ok(Scenario::new("uninstalled")
        .mutate(DeleteResource::new(
            client.clone(),
            &operator.api_version,
            &operator.kind,
            None,
            &operator.resource_name,
        ))
        .verify(
            PodSet::all(client.clone(), &operator.observability_namespace),
            predicate::absence("stack pods terminate"),
            options.timing.convergence()?,
        )
        .verify(
            DynamicByName::new(
                client.clone(),
                &operator.addon_api_version,
                &operator.addon_kind,
                Some(operator.managed_cluster_namespace.clone()),
                &operator.addon_name,
            ),
            predicate::absence("addon resource removed from the managed cluster"),
            options.timing.convergence()?,
        )
        .verify(
            PodSet::all(client.clone(), &operator.addon_namespace),
            predicate::absence("collector namespace empties"),
            options.timing.convergence()?,
        )
        .mutate(DeleteResource::new(
            client.clone(),
            "v1",
            "Namespace",
            None,
            &operator.observability_namespace,
        ))
        .verify(
            NamespaceByName::new(client, &operator.observability_namespace),
            predicate::absence("observability namespace deleted"),
            options.timing.convergence()?,
        ))
}

/// The instance manifest the install scenario applies.
///
/// Metrics start enabled and raw retention starts at 5d so the later
/// scenarios have something to change.
fn instance_manifest(options: &SuiteOptions) -> Value {
    let operator = &options.operator;
    json!({
        "apiVersion": operator.api_version,
        "kind": operator.kind,
        "metadata": { "name": operator.resource_name },
        "spec": {
            "availabilityConfig": "High",
            "imagePullPolicy": "Always",
            "imagePullSecret": operator.pull_secret_name,
            "observabilityAddonSpec": { "enableMetrics": true, "interval": 30 },
            "retentionResolution1h": "30d",
            "retentionResolution5m": "14d",
            "retentionResolutionRaw": "5d",
            "storageConfigObject": {
                "metricObjectStorage": {
                    "name": operator.storage_secret_name,
                    "key": OBJECT_STORE_KEY,
                },
                "statefulSetSize": "10Gi",
            },
        },
    })
}

/// Render the objstore YAML document Thanos reads from the secret.
fn object_store_config(storage: &StorageOptions) -> Result<String> {
    let config = json!({
        "type": "s3",
        "config": {
            "bucket": storage.bucket,
            "endpoint": storage.endpoint,
            "insecure": storage.insecure,
            "access_key": storage.access_key,
            "secret_key": storage.secret_key,
        },
    });
    Ok(serde_yaml::to_string(&config)?)
}

fn query_endpoint(console: &ConsoleOptions) -> String {
    format!(
        "{}{}",
        console.grafana_url.trim_end_matches('/'),
        console.query_path
    )
}
