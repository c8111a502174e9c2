use std::{collections::BTreeMap, env};

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aws::{self, CredentialSource, ResolvedCredentials};

#[derive(Args, Debug, Serialize, Deserialize)]
pub struct Credentials {
  /// Named profile to read from the shared credentials and config files
  #[arg(long, env = "AWS_PROFILE", default_value = aws::DEFAULT_PROFILE)]
  pub profile: String,
}

impl Credentials {
  /// Resolve the access key pair and region, then print shell export statements
  ///
  /// Values the environment already defines are echoed as-is; a complete key
  /// pair found in the credentials file is exported into the process
  /// environment before being echoed. Missing values print as `None` and the
  /// command succeeds regardless of what was found
  pub fn export(&self) -> Result<()> {
    let environment: BTreeMap<String, String> = env::vars().collect();
    let credentials_file = aws::read_optional(aws::shared_credentials_file());
    let config_file = aws::read_optional(aws::shared_config_file());

    let resolved = aws::resolve_credentials(
      &environment,
      credentials_file.as_deref(),
      config_file.as_deref(),
      &self.profile,
    );

    if resolved.source == CredentialSource::ProfileFile {
      debug!("Populating environment from the {} profile", self.profile);
      if let (Some(key_id), Some(secret)) = (&resolved.access_key_id, &resolved.secret_access_key) {
        env::set_var(aws::ACCESS_KEY_ID_VAR, key_id);
        env::set_var(aws::SECRET_ACCESS_KEY_VAR, secret);
      }
    }

    println!("{}", export_statements(&resolved));

    Ok(())
  }
}

/// Render the three export statements, substituting `None` for absent values
fn export_statements(resolved: &ResolvedCredentials) -> String {
  let value = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_owned());

  format!(
    "export {}={}\nexport {}={}\nexport {}={}",
    aws::ACCESS_KEY_ID_VAR,
    value(&resolved.access_key_id),
    aws::SECRET_ACCESS_KEY_VAR,
    value(&resolved.secret_access_key),
    aws::DEFAULT_REGION_VAR,
    value(&resolved.region),
  )
}
