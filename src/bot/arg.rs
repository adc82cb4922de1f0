use std::collections::HashSet;

use chrono_tz::Tz;
use teloxide::types::{ChatId, UserId};
use tokio::sync::Mutex;

use super::BotType;
use crate::{database::DatabaseHelper, lottery::monitor::MonitorHelper, wizard::SessionStore};

/// State shared by both dispatchers.
pub struct NecessaryArg {
    database: DatabaseHelper,
    admin: Vec<ChatId>,
    timezone: Tz,
    front: BotType,
    front_id: UserId,
    front_username: String,
    back_username: String,
    monitor: MonitorHelper,
    sessions: SessionStore,
    greeted: Mutex<GreetedUsers>,
}

impl NecessaryArg {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        database: DatabaseHelper,
        admin: Vec<ChatId>,
        timezone: Tz,
        front: BotType,
        front_id: UserId,
        front_username: String,
        back_username: String,
        monitor: MonitorHelper,
    ) -> Self {
        Self {
            database,
            admin,
            timezone,
            front,
            front_id,
            front_username,
            back_username,
            monitor,
            sessions: SessionStore::new(),
            greeted: Default::default(),
        }
    }

    pub fn database(&self) -> &DatabaseHelper {
        &self.database
    }

    pub fn check_admin(&self, id: ChatId) -> bool {
        self.admin.iter().any(|x| &id == x)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Front bot handle, the back bot uses it to query memberships and post in groups.
    pub fn front(&self) -> &BotType {
        &self.front
    }

    pub fn front_id(&self) -> UserId {
        self.front_id
    }

    pub fn front_username(&self) -> &str {
        &self.front_username
    }

    pub fn back_username(&self) -> &str {
        &self.back_username
    }

    pub fn monitor(&self) -> &MonitorHelper {
        &self.monitor
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns `true` the first time a user speaks in a group on `date`.
    pub async fn first_message(&self, group_id: i64, user_id: UserId, date: String) -> bool {
        self.greeted.lock().await.insert(date, group_id, user_id.0)
    }
}

/// Users already greeted today, forgotten once the date changes.
#[derive(Debug, Default)]
pub struct GreetedUsers {
    date: String,
    users: HashSet<(i64, u64)>,
}

impl GreetedUsers {
    pub fn insert(&mut self, date: String, group_id: i64, user_id: u64) -> bool {
        if self.date != date {
            self.users.clear();
            self.date = date;
        }
        self.users.insert((group_id, user_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn greeted_users_reset_daily() {
        let mut greeted = GreetedUsers::default();
        assert!(greeted.insert("2025-01-01".into(), -1, 10));
        assert!(!greeted.insert("2025-01-01".into(), -1, 10));
        assert!(greeted.insert("2025-01-01".into(), -2, 10));

        assert!(greeted.insert("2025-01-02".into(), -1, 10));
        assert_eq!(greeted.users.len(), 1);
        assert!(!greeted.insert("2025-01-02".into(), -1, 10));
    }
}
