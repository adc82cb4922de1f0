use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone as _};
use chrono_tz::Tz;
use sqlx::prelude::FromRow;

pub const END_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEFAULT_WELCOME: &str = "欢迎新成员加入！";
pub const PRIZE_RANGE: std::ops::RangeInclusive<i64> = 1..=100;
pub const TITLE_MAX_LENGTH: usize = 100;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
const FIELD_MAX_NUMBER: i64 = 1_000_000;
const ALIAS_MAX_LENGTH: usize = 50;

pub fn timestamp_to_string(timestamp: i64, tz: Tz) -> String {
    let time = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    time.with_timezone(&tz).format(END_TIME_FORMAT).to_string()
}

/// Calendar day used as the key of every daily cap.
pub fn date_of(timestamp: i64, tz: Tz) -> String {
    let time = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    time.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

pub fn current_second() -> i64 {
    kstool::time::get_current_second() as i64
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Zh,
    En,
    Jp,
    Kr,
}

impl Language {
    pub const ALL: [Language; 4] = [Self::Zh, Self::En, Self::Jp, Self::Kr];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
            Self::Jp => "jp",
            Self::Kr => "kr",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Zh => "🇨🇳 中文",
            Self::En => "🇺🇸 English",
            Self::Jp => "🇯🇵 日本語",
            Self::Kr => "🇰🇷 한국어",
        }
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zh" => Ok(Self::Zh),
            "en" => Ok(Self::En),
            "jp" | "ja" => Ok(Self::Jp),
            "kr" | "ko" => Ok(Self::Kr),
            _ => Err("Unknown language"),
        }
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct GroupRecord {
    group_id: i64,
    group_name: String,
    join_date: i64,
    active: bool,
}

impl GroupRecord {
    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn join_date(&self) -> i64 {
        self.join_date
    }

    pub fn active(&self) -> bool {
        self.active
    }
}

#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct GroupConfig {
    group_name: String,
    welcome_msg: String,
    welcome_enabled: bool,
    language: String,
    anti_spam: bool,
    auto_delete: bool,
}

impl GroupConfig {
    pub fn default_name(group_id: i64) -> String {
        format!("Group {group_id}")
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn welcome_msg(&self) -> &str {
        &self.welcome_msg
    }

    pub fn welcome_enabled(&self) -> bool {
        self.welcome_enabled
    }

    pub fn language(&self) -> Language {
        self.language.parse().unwrap_or_default()
    }

    pub fn anti_spam(&self) -> bool {
        self.anti_spam
    }

    pub fn auto_delete(&self) -> bool {
        self.auto_delete
    }

    pub fn flag(&self, flag: ConfigFlag) -> Option<bool> {
        match flag {
            ConfigFlag::AntiSpam => Some(self.anti_spam),
            ConfigFlag::AutoDelete => Some(self.auto_delete),
            ConfigFlag::Welcome => Some(self.welcome_enabled),
            ConfigFlag::Points => None,
        }
    }
}

#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct PointsConfig {
    points_enabled: bool,
    checkin_points: i64,
    message_points: i64,
    daily_message_limit: i64,
    min_message_length: i64,
    invite_points: i64,
    daily_invite_limit: i64,
    points_alias: String,
    ranking_alias: String,
}

impl PointsConfig {
    pub fn enabled(&self) -> bool {
        self.points_enabled
    }

    pub fn checkin_points(&self) -> i64 {
        self.checkin_points
    }

    pub fn message_points(&self) -> i64 {
        self.message_points
    }

    pub fn daily_message_limit(&self) -> i64 {
        self.daily_message_limit
    }

    pub fn min_message_length(&self) -> i64 {
        self.min_message_length
    }

    pub fn invite_points(&self) -> i64 {
        self.invite_points
    }

    pub fn daily_invite_limit(&self) -> i64 {
        self.daily_invite_limit
    }

    pub fn points_alias(&self) -> &str {
        &self.points_alias
    }

    pub fn ranking_alias(&self) -> &str {
        &self.ranking_alias
    }

    pub fn field(&self, field: PointsField) -> String {
        match field {
            PointsField::Checkin => self.checkin_points.to_string(),
            PointsField::Message => self.message_points.to_string(),
            PointsField::DailyMessageLimit => self.daily_message_limit.to_string(),
            PointsField::MinMessageLength => self.min_message_length.to_string(),
            PointsField::Invite => self.invite_points.to_string(),
            PointsField::DailyInviteLimit => self.daily_invite_limit.to_string(),
            PointsField::Alias => self.points_alias.clone(),
            PointsField::RankingAlias => self.ranking_alias.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFlag {
    AntiSpam,
    AutoDelete,
    Welcome,
    Points,
}

impl ConfigFlag {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Points => "points_config",
            _ => "group_config",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::AntiSpam => "anti_spam",
            Self::AutoDelete => "auto_delete",
            Self::Welcome => "welcome_enabled",
            Self::Points => "points_enabled",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AntiSpam => "Anti-spam",
            Self::AutoDelete => "Auto delete",
            Self::Welcome => "Welcome message",
            Self::Points => "Points",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointsField {
    Checkin,
    Message,
    DailyMessageLimit,
    MinMessageLength,
    Invite,
    DailyInviteLimit,
    Alias,
    RankingAlias,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Number(i64),
    Text(String),
}

impl PointsField {
    pub const ALL: [PointsField; 8] = [
        Self::Checkin,
        Self::Message,
        Self::DailyMessageLimit,
        Self::MinMessageLength,
        Self::Invite,
        Self::DailyInviteLimit,
        Self::Alias,
        Self::RankingAlias,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::Checkin => "checkin_points",
            Self::Message => "message_points",
            Self::DailyMessageLimit => "daily_message_limit",
            Self::MinMessageLength => "min_message_length",
            Self::Invite => "invite_points",
            Self::DailyInviteLimit => "daily_invite_limit",
            Self::Alias => "points_alias",
            Self::RankingAlias => "ranking_alias",
        }
    }

    /// Token used inside callback data, must not contain `_`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::Message => "message",
            Self::DailyMessageLimit => "msglimit",
            Self::MinMessageLength => "minlen",
            Self::Invite => "invite",
            Self::DailyInviteLimit => "invlimit",
            Self::Alias => "alias",
            Self::RankingAlias => "ranking",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.token().eq(token))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Checkin => "Check-in points",
            Self::Message => "Message points",
            Self::DailyMessageLimit => "Daily message points limit",
            Self::MinMessageLength => "Minimum message length",
            Self::Invite => "Invite points",
            Self::DailyInviteLimit => "Daily invite limit",
            Self::Alias => "Points alias",
            Self::RankingAlias => "Ranking alias",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Alias | Self::RankingAlias)
    }

    pub fn validate(&self, input: &str) -> Result<FieldValue, &'static str> {
        let input = input.trim();
        if self.is_text() {
            let length = input.chars().count();
            if length == 0 || length > ALIAS_MAX_LENGTH {
                return Err("Alias must be 1 to 50 characters");
            }
            return Ok(FieldValue::Text(input.to_string()));
        }
        let value: i64 = input.parse().map_err(|_| "Please enter a whole number")?;
        if !(0..=FIELD_MAX_NUMBER).contains(&value) {
            return Err("Number must be between 0 and 1000000");
        }
        Ok(FieldValue::Number(value))
    }
}

#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct UserPoints {
    user_id: i64,
    points: i64,
}

impl UserPoints {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn points(&self) -> i64 {
        self.points
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct PointsHistory {
    user_id: i64,
    delta: i64,
    reason: Option<String>,
    admin_id: Option<i64>,
    created_at: i64,
}

impl PointsHistory {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn reason(&self) -> Option<&String> {
        self.reason.as_ref()
    }

    pub fn admin_id(&self) -> Option<i64> {
        self.admin_id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotteryDraft {
    pub group_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub prize_count: i64,
    pub end_time: i64,
    pub created_by: i64,
}

#[derive(Clone, Debug, FromRow)]
pub struct Lottery {
    id: i64,
    group_id: i64,
    title: String,
    description: Option<String>,
    prize_count: i64,
    end_time: i64,
    created_by: i64,
    open: bool,
    cancelled: bool,
}

impl Lottery {
    #[cfg(test)]
    pub fn new(id: i64, group_id: i64, title: &str, prize_count: i64, end_time: i64) -> Self {
        Self {
            id,
            group_id,
            title: title.to_string(),
            description: None,
            prize_count,
            end_time,
            created_by: 1,
            open: true,
            cancelled: false,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&String> {
        self.description.as_ref()
    }

    pub fn prize_count(&self) -> i64 {
        self.prize_count
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn created_by(&self) -> i64 {
        self.created_by
    }

    pub fn open(&self) -> bool {
        self.open
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct Participant {
    user_id: i64,
    name: String,
}

impl Participant {
    #[cfg(test)]
    pub fn new(user_id: i64, name: String) -> Self {
        Self { user_id, name }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

}

#[derive(Clone, Debug)]
pub struct DrawResult {
    pub lottery: Lottery,
    pub winners: Vec<Participant>,
    pub participants: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinResult {
    Joined,
    AlreadyJoined,
    Closed,
    NotFound,
}

#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct BannedWord {
    id: i64,
    word: String,
}

impl BannedWord {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn word(&self) -> &str {
        &self.word
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub members_with_points: i64,
    pub total_points: i64,
    pub open_lotteries: i64,
    pub total_lotteries: i64,
    pub banned_words: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndTimeError {
    Format,
    Ambiguous,
    NotInFuture,
}

impl EndTimeError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Format => "Time format should be YYYY-MM-DD HH:MM",
            Self::Ambiguous => "This local time does not exist in the group timezone",
            Self::NotInFuture => "End time must be in the future",
        }
    }
}

pub fn parse_end_time(input: &str, now: i64, tz: Tz) -> Result<i64, EndTimeError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), END_TIME_FORMAT)
        .map_err(|_| EndTimeError::Format)?;
    let timestamp = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or(EndTimeError::Ambiguous)?
        .timestamp();
    if timestamp <= now {
        return Err(EndTimeError::NotInFuture);
    }
    Ok(timestamp)
}

pub fn find_banned_word<'a>(text: &str, words: &'a [BannedWord]) -> Option<&'a str> {
    if text.is_empty() {
        return None;
    }
    let text = text.to_lowercase();
    words
        .iter()
        .map(BannedWord::word)
        .find(|word| !word.is_empty() && text.contains(&word.to_lowercase()))
}

pub fn return_tf_emoji(input: bool) -> &'static str {
    if input { "✅" } else { "❌" }
}

#[cfg(test)]
mod test {
    use super::*;

    const NOW: i64 = 1_735_689_600; // 2025-01-01 00:00 UTC

    #[test]
    fn end_time_must_be_future() {
        let tz = chrono_tz::UTC;
        assert_eq!(
            parse_end_time("2025-01-01 00:00", NOW, tz),
            Err(EndTimeError::NotInFuture)
        );
        assert_eq!(
            parse_end_time("2024-12-31 23:59", NOW, tz),
            Err(EndTimeError::NotInFuture)
        );
        assert_eq!(parse_end_time("2025-01-01 00:01", NOW, tz), Ok(NOW + 60));
    }

    #[test]
    fn end_time_respects_timezone() {
        // 08:00 in Shanghai is midnight UTC
        assert_eq!(
            parse_end_time(" 2025-01-01 08:30 ", NOW, chrono_tz::Asia::Shanghai),
            Ok(NOW + 30 * 60)
        );
        assert_eq!(
            timestamp_to_string(NOW, chrono_tz::Asia::Shanghai),
            "2025-01-01 08:00"
        );
        assert_eq!(date_of(NOW - 1, chrono_tz::UTC), "2024-12-31");
    }

    #[test]
    fn end_time_bad_format() {
        for input in ["", "tomorrow", "2025/01/02 10:00", "2025-01-02", "2025-13-01 10:00"] {
            assert_eq!(
                parse_end_time(input, NOW, chrono_tz::UTC),
                Err(EndTimeError::Format),
                "{input}"
            );
        }
    }

    #[test]
    fn points_field_validation() {
        assert_eq!(
            PointsField::Checkin.validate(" 5 "),
            Ok(FieldValue::Number(5))
        );
        assert!(PointsField::Checkin.validate("-1").is_err());
        assert!(PointsField::Invite.validate("abc").is_err());
        assert!(PointsField::DailyMessageLimit.validate("1000001").is_err());
        assert_eq!(
            PointsField::Alias.validate("coins"),
            Ok(FieldValue::Text("coins".into()))
        );
        assert!(PointsField::RankingAlias.validate("   ").is_err());
        for field in PointsField::ALL {
            assert!(!field.token().contains('_'));
            assert_eq!(PointsField::from_token(field.token()), Some(field));
        }
    }

    #[test]
    fn banned_word_matching() {
        let words = vec![
            BannedWord {
                id: 1,
                word: "Spam".into(),
            },
            BannedWord {
                id: 2,
                word: "广告".into(),
            },
        ];
        assert_eq!(find_banned_word("buy SPAM now", &words), Some("Spam"));
        assert_eq!(find_banned_word("这是广告", &words), Some("广告"));
        assert_eq!(find_banned_word("hello", &words), None);
        assert_eq!(find_banned_word("", &words), None);
        assert_eq!(find_banned_word("spam", &[]), None);
    }

    #[test]
    fn language_codes() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>(), Ok(lang));
        }
        assert!("fr".parse::<Language>().is_err());
    }
}
