use serde::Deserialize;
use tokio::fs::read_to_string;

const DEFAULT_DATABASE: &str = "group-admin.db";
const DEFAULT_TIMEZONE: chrono_tz::Tz = chrono_tz::Asia::Shanghai;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    admin: Vec<i64>,
    database: Option<String>,
    timezone: Option<String>,
    front: Telegram,
    back: Telegram,
}

impl Config {
    pub fn front(&self) -> &Telegram {
        &self.front
    }

    pub fn back(&self) -> &Telegram {
        &self.back
    }

    pub fn admin(&self) -> &[i64] {
        &self.admin
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    pub fn timezone(&self) -> anyhow::Result<chrono_tz::Tz> {
        match &self.timezone {
            Some(tz) => tz
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid timezone {tz:?}: {e}")),
            None => Ok(DEFAULT_TIMEZONE),
        }
    }

    pub async fn read(file: &str) -> anyhow::Result<Self> {
        let content = read_to_string(file).await?;
        Ok(toml::from_str(&content)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Telegram {
    #[serde(alias = "server", alias = "api-server")]
    api_server: Option<String>,
    #[serde(alias = "key", alias = "api-key", alias = "api")]
    api_key: String,
}

impl Telegram {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_server(&self) -> Option<&String> {
        self.api_server.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_minimal() {
        let config: Config = toml::from_str(
            r#"
            admin = [1, 2]
            [front]
            api-key = "front"
            [back]
            key = "back"
            api-server = "http://127.0.0.1:8081"
            "#,
        )
        .unwrap();
        assert_eq!(config.admin(), &[1, 2]);
        assert_eq!(config.front().api_key(), "front");
        assert_eq!(config.back().api_key(), "back");
        assert!(config.front().api_server().is_none());
        assert_eq!(config.database(), DEFAULT_DATABASE);
        assert_eq!(config.timezone().unwrap(), DEFAULT_TIMEZONE);
    }

    #[test]
    fn reject_unknown_timezone() {
        let config: Config = toml::from_str(
            r#"
            timezone = "Mars/Olympus"
            [front]
            key = "a"
            [back]
            key = "b"
            "#,
        )
        .unwrap();
        assert!(config.timezone().is_err());
    }
}
