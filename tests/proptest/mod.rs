// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for cluster-admission.
//!
//! Uses proptest to generate random inputs and verify invariants.

use proptest::prelude::*;

use cluster_admission::authz::authorize;
use cluster_admission::compatibility::SkewPolicy;
use cluster_admission::config::RoleTable;
use cluster_admission::crd::{
    AwsCloudSpec, AzureCloudSpec, CloudProvider, DigitaloceanCloudSpec, FakeCloudSpec,
    HetznerCloudSpec, OpenstackCloudSpec, Project, ProjectPhase, ProjectSpec, ProjectStatus,
};
use cluster_admission::datacenter::resolve;
use cluster_admission::{Datacenter, ErrorKind, KubernetesVersion, Operation, Principal};

/// Strategy for generating versions in major 9.
fn version_in_major_nine() -> impl Strategy<Value = KubernetesVersion> {
    (0..30u64, 0..30u64).prop_map(|(minor, patch)| KubernetesVersion::new(9, minor, patch))
}

/// Strategy for generating any version.
fn any_version() -> impl Strategy<Value = KubernetesVersion> {
    (0..20u64, 0..40u64, 0..40u64)
        .prop_map(|(major, minor, patch)| KubernetesVersion::new(major, minor, patch))
}

/// Strategy for generating non-empty credential strings.
fn secret() -> impl Strategy<Value = String> {
    "s3cr3t[a-zA-Z0-9]{1,18}"
}

/// Strategy for every provider variant with credentials and topology set.
fn any_provider() -> impl Strategy<Value = CloudProvider> {
    prop_oneof![
        secret().prop_map(|token| CloudProvider::Fake(FakeCloudSpec { token })),
        (secret(), secret()).prop_map(|(username, password)| {
            CloudProvider::Openstack(OpenstackCloudSpec {
                username,
                password,
                tenant: "tenant".to_string(),
                network: "network".to_string(),
                ..Default::default()
            })
        }),
        (secret(), secret()).prop_map(|(access_key_id, secret_access_key)| {
            CloudProvider::Aws(AwsCloudSpec {
                access_key_id,
                secret_access_key,
                vpc_id: "vpc".to_string(),
                ..Default::default()
            })
        }),
        (secret(), secret()).prop_map(|(client_id, client_secret)| {
            CloudProvider::Azure(AzureCloudSpec {
                client_id,
                client_secret,
                tenant_id: "tenant".to_string(),
                subscription_id: "subscription".to_string(),
                resource_group: "rg".to_string(),
                ..Default::default()
            })
        }),
        secret().prop_map(|token| CloudProvider::Digitalocean(DigitaloceanCloudSpec { token })),
        secret().prop_map(|token| CloudProvider::Hetzner(HetznerCloudSpec { token })),
    ]
}

fn any_operation() -> impl Strategy<Value = Operation> {
    prop::sample::select(Operation::ALL.to_vec())
}

fn active_project() -> Project {
    let mut project = Project::new(
        "my-first-project-ID",
        ProjectSpec {
            name: "my-first-project".to_string(),
        },
    );
    project.status = Some(ProjectStatus {
        phase: ProjectPhase::Active,
    });
    project
}

proptest! {
    /// Kubelets at 9.9.9 accept control planes 9.9.x through 9.11.x only.
    #[test]
    fn skew_window_around_single_kubelet(requested in version_in_major_nine()) {
        let kubelets = [KubernetesVersion::new(9, 9, 9)];
        let admitted = SkewPolicy::default().check(&requested, &kubelets).is_ok();
        let expected = requested >= KubernetesVersion::new(9, 9, 9) && requested.minor() <= 11;
        prop_assert_eq!(admitted, expected);
    }

    /// A control plane older than any kubelet is never admitted.
    #[test]
    fn downgrade_below_kubelet_rejected(
        requested in any_version(),
        kubelets in prop::collection::vec(any_version(), 1..6),
        max_minor_skew in 0..10u64,
    ) {
        let newest = kubelets.iter().max().cloned().unwrap();
        prop_assume!(requested < newest);
        let err = SkewPolicy::new(max_minor_skew).check(&requested, &kubelets).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::IncompatibleNodes);
    }

    /// With no nodes every version is admissible.
    #[test]
    fn empty_node_set_admits_everything(requested in any_version()) {
        prop_assert!(SkewPolicy::default().check(&requested, &[]).is_ok());
    }

    /// Rejections list each offending kubelet version once, in order.
    #[test]
    fn offenders_sorted_and_distinct(
        requested in version_in_major_nine(),
        kubelets in prop::collection::vec(version_in_major_nine(), 1..10),
    ) {
        if let Err(cluster_admission::AdmissionError::IncompatibleNodes { incompatible, .. }) =
            SkewPolicy::default().check(&requested, &kubelets)
        {
            prop_assert!(!incompatible.is_empty());
            prop_assert!(incompatible.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// A principal with no binding is forbidden for every operation; an admin never is.
    #[test]
    fn membership_required_unless_admin(operation in any_operation(), user in "[a-z]{1,10}") {
        let project = active_project();
        let roles = RoleTable::default();
        let principal = Principal::new("id", "User", format!("{}@other.org", user));
        let err = authorize(&principal, &project, &[], operation, &roles).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Forbidden);
        prop_assert!(authorize(&principal.admin(), &project, &[], operation, &roles).is_ok());
    }

    /// Restricted datacenters are visible only inside their domains, in both config forms.
    #[test]
    fn restricted_datacenter_hidden(user in "[a-z]{1,10}", legacy in any::<bool>()) {
        let dc = if legacy {
            Datacenter {
                required_email_domain: Some("acme.com".to_string()),
                ..Datacenter::new("restricted")
            }
        } else {
            Datacenter {
                required_email_domains: vec!["acme.com".to_string()],
                ..Datacenter::new("restricted")
            }
        };
        let outsider = resolve(Some(dc.clone()), "restricted", &format!("{}@other.org", user));
        prop_assert_eq!(outsider.unwrap_err().kind(), ErrorKind::NotFound);
        let member = format!("{}@acme.com", user);
        prop_assert!(resolve(Some(dc), "restricted", &member).is_ok());
    }

    /// Redacted provider blocks never serialize credential values.
    #[test]
    fn redaction_removes_credentials(provider in any_provider()) {
        let secrets: Vec<String> = match &provider {
            CloudProvider::Fake(s) => vec![s.token.clone()],
            CloudProvider::Openstack(s) => vec![s.username.clone(), s.password.clone()],
            CloudProvider::Aws(s) => vec![s.access_key_id.clone(), s.secret_access_key.clone()],
            CloudProvider::Azure(s) => vec![s.client_id.clone(), s.client_secret.clone()],
            CloudProvider::Digitalocean(s) => vec![s.token.clone()],
            CloudProvider::Hetzner(s) => vec![s.token.clone()],
        };
        let redacted = provider.redacted();
        prop_assert_eq!(redacted.kind(), provider.kind());
        prop_assert!(!redacted.missing_credentials().is_empty());

        let spec = cluster_admission::crd::CloudSpec::new("dc", redacted);
        let body = serde_json::to_string(&spec).unwrap();
        for secret in secrets {
            let quoted = format!("\"{}\"", secret);
            prop_assert!(!body.contains(&quoted));
        }
    }
}
