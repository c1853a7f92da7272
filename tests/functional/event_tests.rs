//! ListClusterEvents scenarios.

use cluster_admission::{ErrorKind, EventType, MemoryBackend};

use crate::common::*;

const CLUSTER_ID: &str = "clusterAbcID";

fn backend() -> MemoryBackend {
    default_backend()
        .with_cluster(ClusterBuilder::new(CLUSTER_ID, "clusterAbc").build())
        .with_event(CLUSTER_ID, event("event-1", "Normal", "message started"))
        .with_event(CLUSTER_ID, event("event-2", "Warning", "message killed"))
}

fn names(events: &[cluster_admission::EventView]) -> Vec<&str> {
    events.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn test_list_all_events() {
    let svc = service(backend());
    let events = svc
        .list_cluster_events(&bob(), PROJECT_ID, CLUSTER_ID, None)
        .await
        .unwrap();
    assert_eq!(names(&events), vec!["event-1", "event-2"]);

    let first = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(first["message"], "message started");
    assert_eq!(first["type"], "Normal");
    assert_eq!(
        first["involvedObject"],
        serde_json::json!({"type": "Cluster", "namespace": "kube-system", "name": "testMachine"})
    );
    assert_eq!(first["count"], 1);
}

#[tokio::test]
async fn test_filter_by_type() {
    let svc = service(backend());
    let warnings = svc
        .list_cluster_events(&bob(), PROJECT_ID, CLUSTER_ID, Some(EventType::Warning))
        .await
        .unwrap();
    assert_eq!(names(&warnings), vec!["event-2"]);

    let normal = svc
        .list_cluster_events(
            &bob(),
            PROJECT_ID,
            CLUSTER_ID,
            Some("normal".parse().unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(names(&normal), vec!["event-1"]);
}

#[test]
fn test_unknown_filter_rejected() {
    let err = "critical".parse::<EventType>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}

#[tokio::test]
async fn test_admin_lists_foreign_events() {
    let svc = service(backend());
    let events = svc
        .list_cluster_events(&admin_john(), PROJECT_ID, CLUSTER_ID, None)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_non_member_cannot_list_events() {
    let svc = service(backend());
    let err = svc
        .list_cluster_events(&john(), PROJECT_ID, CLUSTER_ID, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "forbidden: \"john@acme.com\" doesn't belong to the given project = my-first-project-ID"
    );
}

#[tokio::test]
async fn test_cluster_without_events() {
    let svc = service(default_backend().with_cluster(ClusterBuilder::new("quiet", "quiet").build()));
    let events = svc
        .list_cluster_events(&bob(), PROJECT_ID, "quiet", None)
        .await
        .unwrap();
    assert!(events.is_empty());
}
