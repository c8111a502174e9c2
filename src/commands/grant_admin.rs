use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  configmap::MAP_USERS_KEY,
  kubectl::{ConfigMapClient, Kubectl},
};

/// Namespace holding the aws-auth ConfigMap
const NAMESPACE: &str = "kube-system";

/// ConfigMap mapping IAM identities to cluster RBAC groups
const CONFIG_MAP_NAME: &str = "aws-auth";

#[derive(Args, Debug, Serialize, Deserialize)]
pub struct GrantAdmin {
  /// AWS account ID whose root principal is granted cluster admin
  pub account_id: String,
}

impl GrantAdmin {
  /// Ensure aws-auth maps the account's root principal to system:masters
  pub fn grant(&self) -> Result<()> {
    self.grant_with(&Kubectl::default())
  }

  fn grant_with(&self, client: &impl ConfigMapClient) -> Result<()> {
    let mut config_map = client.get_config_map(NAMESPACE, CONFIG_MAP_NAME)?;
    debug!("Fetched {NAMESPACE}/{CONFIG_MAP_NAME}: {config_map:#?}");

    if !config_map.grant_root_admin(&self.account_id) {
      info!("{CONFIG_MAP_NAME} already defines {MAP_USERS_KEY} - not updating");
      return Ok(());
    }

    let scratch = tempfile::Builder::new().prefix("eksadm-").tempdir()?;
    let manifest = scratch.path().join("config.yaml");
    config_map.write(&manifest)?;
    debug!("Wrote updated ConfigMap to {}", manifest.display());

    client.apply_manifest(NAMESPACE, &manifest)?;
    info!(
      "Granted system:masters to arn:aws:iam::{}:root in {NAMESPACE}/{CONFIG_MAP_NAME}",
      self.account_id
    );

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, fs, path::Path};

  use anyhow::bail;

  use super::*;
  use crate::configmap::{root_map_users, ConfigMap};

  const AWS_AUTH: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: aws-auth
  namespace: kube-system
data:
  mapRoles: |
    - rolearn: arn:aws:iam::123456789012:role/eks-node-group
      username: system:node:{{EC2PrivateDNSName}}
      groups:
      - system:bootstrappers
      - system:nodes
"#;

  const AWS_AUTH_WITH_USERS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: aws-auth
  namespace: kube-system
data:
  mapUsers: |
    - userarn: arn:aws:iam::999999999999:user/ops
      groups:
      - system:masters
"#;

  /// Fake cluster recording every applied manifest
  struct FakeCluster {
    config_map: Option<&'static str>,
    fail_apply: bool,
    applied: RefCell<Vec<ConfigMap>>,
  }

  impl FakeCluster {
    fn with(config_map: Option<&'static str>) -> Self {
      Self {
        config_map,
        fail_apply: false,
        applied: RefCell::new(Vec::new()),
      }
    }
  }

  impl ConfigMapClient for FakeCluster {
    fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
      assert_eq!(namespace, "kube-system");
      assert_eq!(name, "aws-auth");

      match self.config_map {
        Some(yaml) => ConfigMap::from_yaml(yaml),
        None => bail!("Unable to connect to the server"),
      }
    }

    fn apply_manifest(&self, namespace: &str, path: &Path) -> Result<()> {
      assert_eq!(namespace, "kube-system");
      if self.fail_apply {
        bail!("admission webhook denied the request");
      }

      let contents = fs::read_to_string(path)?;
      self.applied.borrow_mut().push(ConfigMap::from_yaml(&contents)?);

      Ok(())
    }
  }

  fn grant_admin(account_id: &str) -> GrantAdmin {
    GrantAdmin {
      account_id: account_id.to_owned(),
    }
  }

  #[test]
  fn it_grants_when_map_users_is_absent() {
    let cluster = FakeCluster::with(Some(AWS_AUTH));

    grant_admin("123456789012").grant_with(&cluster).unwrap();

    let applied = cluster.applied.borrow();
    assert_eq!(applied.len(), 1);
    assert_eq!(
      applied[0].data[MAP_USERS_KEY],
      "- userarn: arn:aws:iam::123456789012:root\n  groups:\n  - system:masters\n"
    );
    // The rest of the fetched document is applied back unchanged
    assert!(applied[0].data["mapRoles"].contains("eks-node-group"));
  }

  #[test]
  fn it_does_not_apply_when_map_users_exists() {
    let cluster = FakeCluster::with(Some(AWS_AUTH_WITH_USERS));

    grant_admin("123456789012").grant_with(&cluster).unwrap();

    assert!(cluster.applied.borrow().is_empty());
  }

  #[test]
  fn it_aborts_when_the_fetch_fails() {
    let cluster = FakeCluster::with(None);

    let err = grant_admin("123456789012").grant_with(&cluster).unwrap_err();

    assert!(err.to_string().contains("Unable to connect"));
    assert!(cluster.applied.borrow().is_empty());
  }

  #[test]
  fn it_surfaces_an_apply_failure() {
    let mut cluster = FakeCluster::with(Some(AWS_AUTH));
    cluster.fail_apply = true;

    let err = grant_admin("123456789012").grant_with(&cluster).unwrap_err();

    assert!(err.to_string().contains("admission webhook"));
  }

  #[test]
  fn it_applies_the_exact_expected_entry() {
    let cluster = FakeCluster::with(Some(AWS_AUTH));

    grant_admin("210987654321").grant_with(&cluster).unwrap();

    let applied = cluster.applied.borrow();
    assert_eq!(applied[0].data[MAP_USERS_KEY], root_map_users("210987654321"));
  }
}
