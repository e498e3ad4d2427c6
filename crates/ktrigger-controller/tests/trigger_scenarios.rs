//! End-to-end triggering scenarios driven from JSON manifests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;

use ktrigger_controller::prelude::*;
use ktrigger_core::{Artifact, Bucket, GitRepository, Kustomization, ObjectKey};

fn kustomization(manifest: serde_json::Value) -> Kustomization {
    serde_json::from_value(manifest).expect("valid kustomization manifest")
}

fn controller_with(
    consumers: Vec<Kustomization>,
) -> (Arc<InMemoryConsumerCache>, TriggerController<Arc<InMemoryConsumerCache>>) {
    let cache = Arc::new(InMemoryConsumerCache::new());
    register_source_indexes(&cache).unwrap();
    for consumer in consumers {
        cache.upsert(consumer).unwrap();
    }
    let controller = TriggerController::new(Arc::clone(&cache), TriggerConfig::default());
    (cache, controller)
}

fn repo1(revision: &str) -> GitRepository {
    GitRepository::new("ns", "repo1")
        .with_artifact(Artifact::new(revision, "http://source/ns/repo1.tar.gz"))
}

fn names(requests: &[ReconcileRequest]) -> Vec<&str> {
    requests.iter().map(|r| r.name.as_str()).collect()
}

/// app2 is already at rev-A, so only app1 is woken even though app2 depends on it.
#[test]
fn current_dependent_is_not_retriggered() {
    let (_cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "app1" },
            "spec": { "sourceRef": { "kind": "GitRepository", "name": "repo1" } },
            "status": { "lastAttemptedRevision": "rev-0" }
        })),
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "app2" },
            "spec": {
                "sourceRef": { "kind": "GitRepository", "name": "repo1" },
                "dependsOn": [ { "name": "app1" } ]
            },
            "status": { "lastAttemptedRevision": "rev-A" }
        })),
    ]);

    let requests = controller.on_git_repository_change(&repo1("rev-A"));
    assert_eq!(names(&requests), vec!["app1"]);
}

/// Both stale: app1 must be queued ahead of app2, which depends on it.
#[test]
fn stale_dependents_are_ordered_after_prerequisites() {
    let (_cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "app2" },
            "spec": {
                "sourceRef": { "kind": "GitRepository", "name": "repo1" },
                "dependsOn": [ { "name": "app1" } ]
            },
            "status": { "lastAttemptedRevision": "rev-0" }
        })),
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "app1" },
            "spec": { "sourceRef": { "kind": "GitRepository", "name": "repo1" } },
            "status": { "lastAttemptedRevision": "rev-0" }
        })),
    ]);

    let requests = controller.on_git_repository_change(&repo1("rev-A"));
    assert_eq!(names(&requests), vec!["app1", "app2"]);
}

/// A bucket consumer sharing the repository's name is invisible to repository events.
#[test]
fn colliding_names_across_kinds_do_not_leak() {
    let (cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "from-bucket" },
            "spec": { "sourceRef": { "kind": "Bucket", "name": "repo1" } }
        })),
    ]);

    assert!(controller.on_git_repository_change(&repo1("rev-A")).is_empty());
    assert!(
        cache
            .list_by_index(GIT_REPOSITORY_INDEX.field, "ns/repo1")
            .unwrap()
            .is_empty()
    );

    let bucket = Bucket::new("ns", "repo1")
        .with_artifact(Artifact::new("rev-A", "http://source/ns/repo1-bucket.tar.gz"));
    assert_eq!(names(&controller.on_bucket_change(&bucket)), vec!["from-bucket"]);
}

/// A source in another namespace reaches consumers that name it explicitly.
#[test]
fn cross_namespace_source_reference() {
    let (_cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "apps", "name": "web" },
            "spec": {
                "sourceRef": {
                    "kind": "GitRepository",
                    "name": "platform",
                    "namespace": "flux-system"
                }
            }
        })),
        kustomization(json!({
            "metadata": { "namespace": "flux-system", "name": "local" },
            "spec": { "sourceRef": { "kind": "GitRepository", "name": "platform" } }
        })),
        kustomization(json!({
            "metadata": { "namespace": "apps", "name": "unrelated" },
            "spec": { "sourceRef": { "kind": "GitRepository", "name": "platform" } }
        })),
    ]);

    let platform = GitRepository::new("flux-system", "platform")
        .with_artifact(Artifact::new("main/abc", "http://source/platform.tar.gz"));
    let requests = controller.on_git_repository_change(&platform);
    assert_eq!(
        requests,
        vec![
            ReconcileRequest::new("apps", "web"),
            ReconcileRequest::new("flux-system", "local"),
        ]
    );
}

/// Cross-namespace dependencies constrain the order too.
#[test]
fn cross_namespace_dependency_orders_requests() {
    let (_cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "a-apps", "name": "web" },
            "spec": {
                "sourceRef": {
                    "kind": "GitRepository",
                    "name": "platform",
                    "namespace": "flux-system"
                },
                "dependsOn": [ { "name": "ingress", "namespace": "z-infra" } ]
            }
        })),
        kustomization(json!({
            "metadata": { "namespace": "z-infra", "name": "ingress" },
            "spec": {
                "sourceRef": {
                    "kind": "GitRepository",
                    "name": "platform",
                    "namespace": "flux-system"
                }
            }
        })),
    ]);

    let platform = GitRepository::new("flux-system", "platform")
        .with_artifact(Artifact::new("main/abc", "http://source/platform.tar.gz"));
    let requests = controller.on_git_repository_change(&platform);
    assert_eq!(
        requests,
        vec![
            ReconcileRequest::new("z-infra", "ingress"),
            ReconcileRequest::new("a-apps", "web"),
        ]
    );
}

/// A cycle anywhere in the candidate set drops every request and reports the status.
#[test]
fn dependency_cycle_emits_nothing() {
    let (cache, controller) = controller_with(vec![
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "a" },
            "spec": {
                "sourceRef": { "kind": "GitRepository", "name": "repo1" },
                "dependsOn": [ { "name": "b" } ]
            }
        })),
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "b" },
            "spec": {
                "sourceRef": { "kind": "GitRepository", "name": "repo1" },
                "dependsOn": [ { "name": "a" } ]
            }
        })),
        kustomization(json!({
            "metadata": { "namespace": "ns", "name": "independent" },
            "spec": { "sourceRef": { "kind": "GitRepository", "name": "repo1" } }
        })),
    ]);

    assert!(controller.on_git_repository_change(&repo1("rev-A")).is_empty());
    let mapper = RevisionChangeMapper::new(Arc::clone(&cache));
    assert_eq!(
        mapper.map_source_change(&repo1("rev-A")).status,
        MappingStatus::CycleDetected
    );
}

/// Switching a consumer's source moves it to the other index immediately.
#[test]
fn source_ref_update_is_reflected_in_next_event() {
    let (cache, controller) = controller_with(vec![kustomization(json!({
        "metadata": { "namespace": "ns", "name": "app" },
        "spec": { "sourceRef": { "kind": "GitRepository", "name": "repo1" } }
    }))]);
    assert_eq!(names(&controller.on_git_repository_change(&repo1("rev-A"))), vec!["app"]);

    cache
        .upsert(kustomization(json!({
            "metadata": { "namespace": "ns", "name": "app" },
            "spec": { "sourceRef": { "kind": "Bucket", "name": "artifacts" } }
        })))
        .unwrap();
    assert!(controller.on_git_repository_change(&repo1("rev-B")).is_empty());

    cache.delete(&ObjectKey::new("ns", "app")).unwrap();
    let bucket = Bucket::new("ns", "artifacts")
        .with_artifact(Artifact::new("rev-B", "http://source/ns/artifacts.tar.gz"));
    assert!(controller.on_bucket_change(&bucket).is_empty());
}

/// Repeated delivery of the same event queues each consumer once.
#[test]
fn redelivered_events_are_deduplicated_by_queue() {
    let (_cache, controller) = controller_with(vec![kustomization(json!({
        "metadata": { "namespace": "ns", "name": "app" },
        "spec": { "sourceRef": { "kind": "GitRepository", "name": "repo1" } },
        "status": { "lastAttemptedRevision": "rev-0" }
    }))]);
    let queue = InMemoryRequestQueue::new();
    let event = SourceEvent::from(repo1("rev-A"));

    for _ in 0..3 {
        controller.handle_and_enqueue(&event, &queue).unwrap();
    }
    assert_eq!(queue.drain().unwrap(), vec![ReconcileRequest::new("ns", "app")]);
}
