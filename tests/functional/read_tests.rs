//! GetCluster, ListClusters and GetClusterHealth scenarios.

use cluster_admission::crd::{ExtendedClusterHealth, HealthStatus, ProjectPhase};
use cluster_admission::{ErrorKind, Operation};
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_get_fake_cluster_redacted() {
    let backend = default_backend().with_cluster(ClusterBuilder::new("defClusterID", "defClusterName").build());
    let svc = service(backend);
    let view = svc.get_cluster(&bob(), PROJECT_ID, "defClusterID").await.unwrap();
    let body = serde_json::to_value(&view).unwrap();

    assert_eq!(body["id"], "defClusterID");
    assert_eq!(body["name"], "defClusterName");
    assert_eq!(body["type"], "kubernetes");
    assert_eq!(
        body["spec"],
        json!({"cloud": {"dc": "fake-dc", "fake": {}}, "version": "9.9.9", "oidc": {}})
    );
    assert_eq!(body["status"], json!({"version": "9.9.9", "url": CLUSTER_URL}));
}

#[tokio::test]
async fn test_get_openstack_cluster_keeps_topology() {
    let backend = default_backend().with_cluster(
        ClusterBuilder::new("defClusterID", "defClusterName")
            .openstack()
            .build(),
    );
    let svc = service(backend);
    let view = svc.get_cluster(&bob(), PROJECT_ID, "defClusterID").await.unwrap();
    let body = serde_json::to_value(&view).unwrap();
    assert_eq!(
        body["spec"]["cloud"],
        json!({
            "dc": "OpenstackDatacenter",
            "openstack": {
                "floatingIpPool": "floatingIPPool",
                "tenant": "tenant",
                "domain": "domain",
                "network": "network",
                "securityGroups": "securityGroups",
                "routerID": "routerID",
                "subnetID": "subnetID"
            }
        })
    );
}

#[tokio::test]
async fn test_admin_reads_foreign_cluster() {
    let backend = default_backend().with_cluster(ClusterBuilder::new("defClusterID", "defClusterName").build());
    let svc = service(backend);
    assert!(
        svc.get_cluster(&admin_john(), PROJECT_ID, "defClusterID")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_non_member_cannot_read() {
    let backend = default_backend().with_cluster(ClusterBuilder::new("defClusterID", "defClusterName").build());
    let svc = service(backend);
    for op in [Operation::Get, Operation::Health, Operation::List] {
        let result = match op {
            Operation::Get => svc
                .get_cluster(&john(), PROJECT_ID, "defClusterID")
                .await
                .map(|_| ()),
            Operation::Health => svc
                .get_cluster_health(&john(), PROJECT_ID, "defClusterID")
                .await
                .map(|_| ()),
            _ => svc.list_clusters(&john(), PROJECT_ID).await.map(|_| ()),
        };
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden, "{}", op);
    }
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let backend = default_backend().with_cluster(
        ClusterBuilder::new("defClusterID", "defClusterName")
            .openstack()
            .build(),
    );
    let svc = service(backend);
    let first = serde_json::to_vec(&svc.get_cluster(&bob(), PROJECT_ID, "defClusterID").await.unwrap())
        .unwrap();
    let second = serde_json::to_vec(&svc.get_cluster(&bob(), PROJECT_ID, "defClusterID").await.unwrap())
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_get_missing_cluster() {
    let svc = service(default_backend());
    let err = svc.get_cluster(&bob(), PROJECT_ID, "nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "cluster \"nope\" not found");
}

#[tokio::test]
async fn test_list_sorted_and_scoped_to_project() {
    let backend = default_backend()
        .with_cluster(ClusterBuilder::new("zzz", "last").build())
        .with_cluster(ClusterBuilder::new("aaa", "first").openstack().build())
        .with_cluster(ClusterBuilder::new("mmm", "elsewhere").project("other").build());
    let svc = service(backend);
    let views = svc.list_clusters(&bob(), PROJECT_ID).await.unwrap();
    let ids: Vec<&str> = views.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["aaa", "zzz"]);

    let body = serde_json::to_string(&views).unwrap();
    assert!(!body.contains("SecretToken"));
    assert!(!body.contains("\"password\""));
    assert!(!body.contains("\"username\""));
}

#[tokio::test]
async fn test_terminating_project_is_unavailable() {
    let backend = cluster_admission::MemoryBackend::new()
        .with_project(project(PROJECT_ID, ProjectPhase::Terminating))
        .with_binding(binding("bob@acme.com", PROJECT_ID, "owners"));
    let svc = service(backend);
    let err = svc.list_clusters(&bob(), PROJECT_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

#[tokio::test]
async fn test_health() {
    let health = ExtendedClusterHealth {
        apiserver: HealthStatus::Up,
        scheduler: HealthStatus::Down,
        controller: HealthStatus::Up,
        machine_controller: HealthStatus::Down,
        etcd: HealthStatus::Up,
        cloud_provider_infrastructure: HealthStatus::Up,
        user_cluster_controller_manager: HealthStatus::Up,
    };
    let backend = default_backend().with_cluster(
        ClusterBuilder::new("defClusterID", "defClusterName")
            .health(health.clone())
            .build(),
    );
    let svc = service(backend);
    let got = svc
        .get_cluster_health(&bob(), PROJECT_ID, "defClusterID")
        .await
        .unwrap();
    assert_eq!(got, health);
    assert!(!got.all_healthy());
    assert_eq!(
        serde_json::to_string(&got).unwrap(),
        r#"{"apiserver":1,"scheduler":0,"controller":1,"machineController":0,"etcd":1,"cloudProviderInfrastructure":1,"userClusterControllerManager":1}"#
    );
}

#[tokio::test]
async fn test_viewer_can_read() {
    let backend = default_backend()
        .with_binding(binding("john@acme.com", PROJECT_ID, "viewers"))
        .with_cluster(ClusterBuilder::new("defClusterID", "defClusterName").build());
    let svc = service(backend);
    assert!(svc.get_cluster(&john(), PROJECT_ID, "defClusterID").await.is_ok());
    assert_eq!(svc.list_clusters(&john(), PROJECT_ID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_constraint_templates() {
    use cluster_admission::crd::{
        ConstraintTarget, ConstraintTemplate, ConstraintTemplateCrd, ConstraintTemplateCrdSpec,
        ConstraintTemplateNames, ConstraintTemplateSpec,
    };

    let template = ConstraintTemplate::new(
        "k8srequiredlabels",
        ConstraintTemplateSpec {
            crd: ConstraintTemplateCrd {
                spec: ConstraintTemplateCrdSpec {
                    names: ConstraintTemplateNames {
                        kind: "K8sRequiredLabels".to_string(),
                    },
                },
            },
            targets: vec![ConstraintTarget {
                target: "admission.k8s.gatekeeper.sh".to_string(),
                rego: "package k8srequiredlabels".to_string(),
            }],
        },
    );
    let svc = service(default_backend().with_constraint_template(template.clone()));

    assert_eq!(svc.list_constraint_templates(&john()).await.unwrap(), vec![template.clone()]);
    assert_eq!(
        svc.get_constraint_template(&john(), "k8srequiredlabels")
            .await
            .unwrap(),
        template
    );
    let err = svc
        .get_constraint_template(&john(), "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = svc.get_constraint_template(&john(), " ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}
