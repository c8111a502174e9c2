use std::{path::Path, process::Command};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::configmap::ConfigMap;

/// Narrow interface over the cluster CLI
///
/// ConfigMap patch logic is generic over this trait so it can be exercised
/// against a recording fake instead of a live cluster
pub trait ConfigMapClient {
  /// Fetch a ConfigMap by name from the namespace
  fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap>;

  /// Apply a manifest file to the namespace
  fn apply_manifest(&self, namespace: &str, path: &Path) -> Result<()>;
}

/// `kubectl` invoked as a subprocess
#[derive(Debug)]
pub struct Kubectl {
  bin: String,
}

impl Default for Kubectl {
  fn default() -> Self {
    Self {
      bin: "kubectl".to_owned(),
    }
  }
}

impl Kubectl {
  /// Execute kubectl with the given arguments and return its stdout
  ///
  /// A non-zero exit status is an error carrying the command's stderr
  fn run(&self, args: &[&str]) -> Result<String> {
    debug!("{} {}", self.bin, args.join(" "));

    let output = Command::new(&self.bin)
      .args(args)
      .output()
      .with_context(|| format!("Error executing command {}", self.bin))?;

    if !output.status.success() {
      bail!(
        "{} {} failed: {}",
        self.bin,
        args.join(" "),
        String::from_utf8_lossy(&output.stderr).trim()
      );
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }
}

impl ConfigMapClient for Kubectl {
  fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
    let stdout = self.run(&["get", "configmap", name, "-n", namespace, "-o", "yaml"])?;
    ConfigMap::from_yaml(&stdout)
  }

  fn apply_manifest(&self, namespace: &str, path: &Path) -> Result<()> {
    let path = path.to_string_lossy();
    self.run(&["apply", "-n", namespace, "-f", &path])?;

    Ok(())
  }
}
