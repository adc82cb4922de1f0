use std::collections::BTreeMap;

use anyhow::anyhow;
use log::{info, warn};
use serde::Deserialize;

use crate::database::DatabaseHelper;
use crate::types::Language;

/// One entry of the legacy `group_configs.json` file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct LegacyGroupConfig {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub welcome_msg: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    pub anti_spam: bool,
    #[serde(default)]
    pub auto_delete: bool,
}

impl LegacyGroupConfig {
    pub fn language(&self) -> Option<Language> {
        self.language.as_deref().and_then(|s| s.parse().ok())
    }
}

pub fn parse_legacy(content: &str) -> anyhow::Result<Vec<(i64, LegacyGroupConfig)>> {
    let map: BTreeMap<String, LegacyGroupConfig> = serde_json::from_str(content)?;
    let mut ret = Vec::with_capacity(map.len());
    for (key, config) in map {
        let group_id = key
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow!("Invalid group id {key:?}: {e}"))?;
        ret.push((group_id, config));
    }
    Ok(ret)
}

pub async fn import_file(file: &str, database: &DatabaseHelper) -> anyhow::Result<usize> {
    let content = tokio::fs::read_to_string(file).await?;
    let configs = parse_legacy(&content)?;
    let mut imported = 0;
    for (group_id, config) in configs {
        if database.config_import(group_id, config).await.is_some() {
            imported += 1;
        } else {
            warn!("Import group {group_id} failed");
        }
    }
    info!("Imported {imported} group config(s) from {file}");
    Ok(imported)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_legacy_file() {
        let configs = parse_legacy(
            r#"{
                "-1001": {"welcome_msg": "hi", "language": "en", "anti_spam": true, "auto_delete": false},
                "-1002": {"group_name": "Test", "language": "fr"},
                "-1003": {}
            }"#,
        )
        .unwrap();
        assert_eq!(configs.len(), 3);
        let (id, first) = &configs[0];
        assert_eq!(*id, -1001);
        assert_eq!(first.welcome_msg.as_deref(), Some("hi"));
        assert_eq!(first.language(), Some(Language::En));
        assert!(first.anti_spam && !first.auto_delete);

        let (_, second) = &configs[1];
        assert_eq!(second.group_name.as_deref(), Some("Test"));
        assert_eq!(second.language(), None);
        assert_eq!(configs[2].1, LegacyGroupConfig::default());
    }

    #[test]
    fn reject_bad_group_id() {
        assert!(parse_legacy(r#"{"abc": {}}"#).is_err());
        assert!(parse_legacy("[]").is_err());
    }
}
