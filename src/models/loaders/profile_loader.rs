use crate::error::ConfigError;
use crate::models::profile::Profile;
use std::path::Path;
use tokio::fs;

/// 从 JSON 或 TOML 文件加载个人信息
///
/// 根据扩展名选择格式，`.toml` 之外一律按 JSON 解析
pub async fn load_profile(path: &Path) -> Result<Profile, ConfigError> {
    let display = path.display().to_string();

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::ReadFailed {
            path: display.clone(),
            source,
        })?;

    let is_toml = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let profile: Profile = if is_toml {
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: display.clone(),
            source,
        })?
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::JsonParseFailed {
            path: display.clone(),
            source,
        })?
    };

    if profile.classes.is_empty() {
        return Err(ConfigError::NoClasses { path: display });
    }

    tracing::info!(
        "成功加载个人信息: netid={}, {} 个课程",
        profile.credentials.netid,
        profile.classes.len()
    );
    for entry in &profile.classes {
        if let Some(label) = entry.label() {
            tracing::debug!("  CRN {} ({})", entry.crn(), label);
        }
    }

    Ok(profile)
}
