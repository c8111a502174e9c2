use std::{
  collections::BTreeMap,
  fs::File,
  io::BufWriter,
  path::Path,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The aws-auth data key listing IAM user ARNs and their granted RBAC groups
pub const MAP_USERS_KEY: &str = "mapUsers";

/// A Kubernetes ConfigMap as returned by the cluster
///
/// Only the `data` mapping is modeled directly; every other top-level field
/// (apiVersion, kind, metadata, ...) is carried through untouched so that a
/// fetched document round-trips without losing server-set fields
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigMap {
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub data: BTreeMap<String, String>,

  #[serde(flatten)]
  rest: BTreeMap<String, serde_yaml::Value>,
}

/// mapUsers entry granting cluster admin to the account's root principal
pub fn root_map_users(account_id: &str) -> String {
  format!("- userarn: arn:aws:iam::{account_id}:root\n  groups:\n  - system:masters\n")
}

impl ConfigMap {
  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(anyhow::Error::from)
  }

  /// Map the account's root principal to system:masters if not already mapped
  ///
  /// Returns false, leaving the document untouched, when `mapUsers` is
  /// already present - an existing mapping is never overwritten
  pub fn grant_root_admin(&mut self, account_id: &str) -> bool {
    if self.data.contains_key(MAP_USERS_KEY) {
      return false;
    }

    self.data.insert(MAP_USERS_KEY.to_owned(), root_map_users(account_id));
    true
  }

  pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_yaml::to_writer(writer, self).map_err(anyhow::Error::from)
  }
}
