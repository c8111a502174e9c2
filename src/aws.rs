use std::{collections::BTreeMap, env, fs, path::PathBuf};

use tracing::debug;

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const DEFAULT_REGION_VAR: &str = "AWS_DEFAULT_REGION";

/// Profile consulted when none is named on the command line
pub const DEFAULT_PROFILE: &str = "default";

const CREDENTIALS_FILE_VAR: &str = "AWS_SHARED_CREDENTIALS_FILE";
const CONFIG_FILE_VAR: &str = "AWS_CONFIG_FILE";

/// Where the access key pair was resolved from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
  /// Both keys were already defined in the environment
  Environment,
  /// Both keys were read from the shared credentials file
  ProfileFile,
  /// Neither source provided a complete key pair
  None,
}

/// Credentials and region resolved from the environment and the shared AWS files
#[derive(Debug)]
pub struct ResolvedCredentials {
  pub access_key_id: Option<String>,
  pub secret_access_key: Option<String>,
  pub region: Option<String>,
  pub source: CredentialSource,
}

/// Parse the minimal INI subset used by the AWS shared credentials/config files
///
/// Recognizes `[section]` headers, `key = value` pairs, and `#`/`;` comment
/// lines; malformed lines and values outside any section are skipped
pub fn parse_profile_file(contents: &str) -> BTreeMap<String, BTreeMap<String, String>> {
  let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
  let mut current: Option<String> = None;

  for line in contents.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
      continue;
    }

    if line.starts_with('[') && line.ends_with(']') {
      let name = line[1..line.len() - 1].trim().to_owned();
      sections.entry(name.clone()).or_default();
      current = Some(name);
      continue;
    }

    if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
      sections
        .entry(section.clone())
        .or_default()
        .insert(key.trim().to_owned(), value.trim().to_owned());
    }
  }

  sections
}

/// Extract one profile section from file contents, empty when either is absent
fn profile_section(contents: Option<&str>, profile: &str) -> BTreeMap<String, String> {
  contents
    .map(parse_profile_file)
    .and_then(|mut sections| sections.remove(profile))
    .unwrap_or_default()
}

/// Resolve the access key pair and region from an environment snapshot and
/// the contents of the shared credentials/config files
///
/// The environment takes precedence: the credentials file is only consulted
/// when the environment does not already define the complete key pair, and a
/// file section missing either key is treated as not providing the pair
pub fn resolve_credentials(
  env: &BTreeMap<String, String>,
  credentials_file: Option<&str>,
  config_file: Option<&str>,
  profile: &str,
) -> ResolvedCredentials {
  let region = profile_section(config_file, profile).remove("region");

  let env_key_id = env.get(ACCESS_KEY_ID_VAR).cloned();
  let env_secret = env.get(SECRET_ACCESS_KEY_VAR).cloned();

  if env_key_id.is_some() && env_secret.is_some() {
    return ResolvedCredentials {
      access_key_id: env_key_id,
      secret_access_key: env_secret,
      region,
      source: CredentialSource::Environment,
    };
  }

  let mut section = profile_section(credentials_file, profile);
  let file_key_id = section.remove("aws_access_key_id");
  let file_secret = section.remove("aws_secret_access_key");

  if file_key_id.is_some() && file_secret.is_some() {
    return ResolvedCredentials {
      access_key_id: file_key_id,
      secret_access_key: file_secret,
      region,
      source: CredentialSource::ProfileFile,
    };
  }

  ResolvedCredentials {
    access_key_id: env_key_id,
    secret_access_key: env_secret,
    region,
    source: CredentialSource::None,
  }
}

/// Path to the shared credentials file, honoring `AWS_SHARED_CREDENTIALS_FILE`
pub fn shared_credentials_file() -> Option<PathBuf> {
  aws_file(CREDENTIALS_FILE_VAR, "credentials")
}

/// Path to the shared config file, honoring `AWS_CONFIG_FILE`
pub fn shared_config_file() -> Option<PathBuf> {
  aws_file(CONFIG_FILE_VAR, "config")
}

fn aws_file(var: &str, name: &str) -> Option<PathBuf> {
  match env::var_os(var) {
    Some(path) => Some(PathBuf::from(path)),
    None => dirs::home_dir().map(|home| home.join(".aws").join(name)),
  }
}

/// Read a file to a string, treating any failure as an absent file
pub fn read_optional(path: Option<PathBuf>) -> Option<String> {
  let path = path?;
  match fs::read_to_string(&path) {
    Ok(contents) => Some(contents),
    Err(err) => {
      debug!("Unable to read {}: {err}", path.display());
      None
    }
  }
}
