use std::{collections::HashMap, sync::Arc};

use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::types::{
    DESCRIPTION_MAX_LENGTH, FieldValue, LotteryDraft, PRIZE_RANGE, PointsField, TITLE_MAX_LENGTH,
    parse_end_time, timestamp_to_string,
};

const AMOUNT_MAX: i64 = 1_000_000;
const WELCOME_MAX_LENGTH: usize = 1000;
const BANNED_WORD_MAX_LENGTH: usize = 50;
const REASON_MAX_LENGTH: usize = 200;
const SKIP: &str = "-";

/// Result of feeding one line of text into a wizard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Next(String),
    Reprompt(String),
    /// All fields collected, the string is the summary shown at the confirm gate.
    Ready(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LotteryStep {
    Title,
    Description,
    PrizeCount,
    EndTime,
    Confirm,
}

#[derive(Clone, Debug)]
pub struct LotteryWizard {
    group_id: i64,
    created_by: i64,
    step: LotteryStep,
    title: String,
    description: Option<String>,
    prize_count: i64,
    end_time: i64,
}

impl LotteryWizard {
    pub const FIRST_PROMPT: &'static str = "Please enter the lottery title:";

    pub fn new(group_id: i64, created_by: i64) -> Self {
        Self {
            group_id,
            created_by,
            step: LotteryStep::Title,
            title: String::new(),
            description: None,
            prize_count: 0,
            end_time: 0,
        }
    }

    pub fn feed(&mut self, text: &str, now: i64, tz: Tz) -> Step {
        let text = text.trim();
        match self.step {
            LotteryStep::Title => {
                let length = text.chars().count();
                if length == 0 || length > TITLE_MAX_LENGTH {
                    return Step::Reprompt(format!(
                        "Title must be 1 to {TITLE_MAX_LENGTH} characters, please re-enter:"
                    ));
                }
                self.title = text.to_string();
                self.step = LotteryStep::Description;
                Step::Next(format!("Please enter the description (send {SKIP} to skip):"))
            }
            LotteryStep::Description => {
                if text.chars().count() > DESCRIPTION_MAX_LENGTH {
                    return Step::Reprompt(format!(
                        "Description must be at most {DESCRIPTION_MAX_LENGTH} characters, please re-enter:"
                    ));
                }
                self.description = (!text.is_empty() && text != SKIP).then(|| text.to_string());
                self.step = LotteryStep::PrizeCount;
                Step::Next(format!(
                    "Please enter the number of prizes ({}-{}):",
                    PRIZE_RANGE.start(),
                    PRIZE_RANGE.end()
                ))
            }
            LotteryStep::PrizeCount => match text.parse::<i64>() {
                Ok(count) if PRIZE_RANGE.contains(&count) => {
                    self.prize_count = count;
                    self.step = LotteryStep::EndTime;
                    Step::Next(format!(
                        "Please enter the end time (YYYY-MM-DD HH:MM, {tz}):"
                    ))
                }
                _ => Step::Reprompt(format!(
                    "Prize count must be a number between {} and {}, please re-enter:",
                    PRIZE_RANGE.start(),
                    PRIZE_RANGE.end()
                )),
            },
            LotteryStep::EndTime => match parse_end_time(text, now, tz) {
                Ok(end_time) => {
                    self.end_time = end_time;
                    self.step = LotteryStep::Confirm;
                    Step::Ready(self.summary(tz))
                }
                Err(e) => Step::Reprompt(format!("{}, please re-enter:", e.reason())),
            },
            LotteryStep::Confirm => Step::Reprompt("Please confirm or cancel.".into()),
        }
    }

    pub fn summary(&self, tz: Tz) -> String {
        format!(
            "Title: {}\nDescription: {}\nPrizes: {}\nEnds at: {}",
            self.title,
            self.description.as_deref().unwrap_or("(none)"),
            self.prize_count,
            timestamp_to_string(self.end_time, tz)
        )
    }

    /// Only available once every field passed validation.
    pub fn draft(&self) -> Option<LotteryDraft> {
        (self.step == LotteryStep::Confirm).then(|| LotteryDraft {
            group_id: self.group_id,
            title: self.title.clone(),
            description: self.description.clone(),
            prize_count: self.prize_count,
            end_time: self.end_time,
            created_by: self.created_by,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointsAction {
    Add,
    Deduct,
}

impl PointsAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Deduct => "Deduct",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PointsStep {
    UserId,
    Amount,
    Reason,
    Confirm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsOperation {
    pub group_id: i64,
    pub action: PointsAction,
    pub user_id: i64,
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PointsWizard {
    group_id: i64,
    action: PointsAction,
    step: PointsStep,
    user_id: i64,
    amount: i64,
    reason: Option<String>,
}

impl PointsWizard {
    pub const FIRST_PROMPT: &'static str = "Please enter the target user id:";

    pub fn new(group_id: i64, action: PointsAction) -> Self {
        Self {
            group_id,
            action,
            step: PointsStep::UserId,
            user_id: 0,
            amount: 0,
            reason: None,
        }
    }

    pub fn feed(&mut self, text: &str) -> Step {
        let text = text.trim();
        match self.step {
            PointsStep::UserId => match text.parse::<i64>() {
                Ok(user_id) if user_id > 0 => {
                    self.user_id = user_id;
                    self.step = PointsStep::Amount;
                    Step::Next(format!("Please enter the amount (1-{AMOUNT_MAX}):"))
                }
                _ => Step::Reprompt("User id must be a positive number, please re-enter:".into()),
            },
            PointsStep::Amount => match text.parse::<i64>() {
                Ok(amount) if (1..=AMOUNT_MAX).contains(&amount) => {
                    self.amount = amount;
                    self.step = PointsStep::Reason;
                    Step::Next(format!("Please enter the reason (send {SKIP} to skip):"))
                }
                _ => Step::Reprompt(format!(
                    "Amount must be a number between 1 and {AMOUNT_MAX}, please re-enter:"
                )),
            },
            PointsStep::Reason => {
                if text.chars().count() > REASON_MAX_LENGTH {
                    return Step::Reprompt(format!(
                        "Reason must be at most {REASON_MAX_LENGTH} characters, please re-enter:"
                    ));
                }
                self.reason = (!text.is_empty() && text != SKIP).then(|| text.to_string());
                self.step = PointsStep::Confirm;
                Step::Ready(self.summary())
            }
            PointsStep::Confirm => Step::Reprompt("Please confirm or cancel.".into()),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} points\nUser: {}\nAmount: {}\nReason: {}",
            self.action.name(),
            self.user_id,
            self.amount,
            self.reason.as_deref().unwrap_or("(none)")
        )
    }

    pub fn operation(&self) -> Option<PointsOperation> {
        (self.step == PointsStep::Confirm).then(|| PointsOperation {
            group_id: self.group_id,
            action: self.action,
            user_id: self.user_id,
            amount: self.amount,
            reason: self.reason.clone(),
        })
    }
}

/// Single text field awaited from the admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Welcome,
    BannedWord,
    Field(PointsField),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    Welcome(String),
    BannedWord(String),
    Field(PointsField, FieldValue),
}

impl InputKind {
    pub fn prompt(&self) -> String {
        match self {
            Self::Welcome => "Please send the new welcome message:".into(),
            Self::BannedWord => "Please send the word to ban:".into(),
            Self::Field(field) => format!("Please send the new value of {}:", field.label()),
        }
    }

    pub fn accept(&self, text: &str) -> Result<InputValue, String> {
        let text = text.trim();
        match self {
            Self::Welcome => {
                let length = text.chars().count();
                if length == 0 || length > WELCOME_MAX_LENGTH {
                    return Err(format!(
                        "Welcome message must be 1 to {WELCOME_MAX_LENGTH} characters, please re-enter:"
                    ));
                }
                Ok(InputValue::Welcome(text.to_string()))
            }
            Self::BannedWord => {
                let length = text.chars().count();
                if length == 0 || length > BANNED_WORD_MAX_LENGTH {
                    return Err(format!(
                        "Banned word must be 1 to {BANNED_WORD_MAX_LENGTH} characters, please re-enter:"
                    ));
                }
                Ok(InputValue::BannedWord(text.to_string()))
            }
            Self::Field(field) => field
                .validate(text)
                .map(|value| InputValue::Field(*field, value))
                .map_err(|e| format!("{e}, please re-enter:")),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Session {
    Lottery(LotteryWizard),
    Points(PointsWizard),
    Input { group_id: i64, kind: InputKind },
}

impl Session {
    pub fn group_id(&self) -> i64 {
        match self {
            Self::Lottery(wizard) => wizard.group_id,
            Self::Points(wizard) => wizard.group_id,
            Self::Input { group_id, .. } => *group_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardKind {
    Lottery,
    Points,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Step {
        group_id: i64,
        kind: WizardKind,
        step: Step,
    },
    Input {
        group_id: i64,
        value: InputValue,
    },
    Reprompt(String),
}

/// Sessions idle longer than this are dropped.
pub const SESSION_TTL: i64 = 3600;

#[derive(Debug)]
struct Entry {
    session: Session,
    last_active: i64,
}

impl Entry {
    fn expired(&self, now: i64) -> bool {
        now - self.last_active > SESSION_TTL
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<i64, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any session the user already has and drops idle sessions of other users.
    pub async fn start(&self, user_id: i64, session: Session, now: i64) {
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, entry| !entry.expired(now));
        sessions.insert(
            user_id,
            Entry {
                session,
                last_active: now,
            },
        );
    }

    pub async fn cancel(&self, user_id: i64) -> bool {
        self.inner.lock().await.remove(&user_id).is_some()
    }

    /// Feed a private text message into the user's session, `None` when there is none.
    pub async fn feed(&self, user_id: i64, text: &str, now: i64, tz: Tz) -> Option<Outcome> {
        let mut sessions = self.inner.lock().await;
        let entry = Self::active(&mut sessions, user_id, now)?;
        entry.last_active = now;
        let session = &mut entry.session;
        let group_id = session.group_id();
        let outcome = match session {
            Session::Lottery(wizard) => Outcome::Step {
                group_id,
                kind: WizardKind::Lottery,
                step: wizard.feed(text, now, tz),
            },
            Session::Points(wizard) => Outcome::Step {
                group_id,
                kind: WizardKind::Points,
                step: wizard.feed(text),
            },
            Session::Input { kind, .. } => match kind.accept(text) {
                Ok(value) => Outcome::Input { group_id, value },
                Err(reason) => Outcome::Reprompt(reason),
            },
        };
        if matches!(outcome, Outcome::Input { .. }) {
            sessions.remove(&user_id);
        }
        Some(outcome)
    }

    pub async fn take_lottery(&self, user_id: i64, group_id: i64, now: i64) -> Option<LotteryDraft> {
        let mut sessions = self.inner.lock().await;
        let draft = match &Self::active(&mut sessions, user_id, now)?.session {
            Session::Lottery(wizard) if wizard.group_id == group_id => wizard.draft()?,
            _ => return None,
        };
        sessions.remove(&user_id);
        Some(draft)
    }

    pub async fn take_points(
        &self,
        user_id: i64,
        group_id: i64,
        now: i64,
    ) -> Option<PointsOperation> {
        let mut sessions = self.inner.lock().await;
        let operation = match &Self::active(&mut sessions, user_id, now)?.session {
            Session::Points(wizard) if wizard.group_id == group_id => wizard.operation()?,
            _ => return None,
        };
        sessions.remove(&user_id);
        Some(operation)
    }

    fn active(sessions: &mut HashMap<i64, Entry>, user_id: i64, now: i64) -> Option<&mut Entry> {
        if sessions.get(&user_id)?.expired(now) {
            sessions.remove(&user_id);
            return None;
        }
        sessions.get_mut(&user_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const NOW: i64 = 1_735_689_600;
    const TZ: Tz = chrono_tz::UTC;

    #[test]
    fn lottery_wizard_walkthrough() {
        let mut wizard = LotteryWizard::new(-1, 9);
        assert!(matches!(wizard.feed("  ", NOW, TZ), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("Big prize", NOW, TZ), Step::Next(_)));
        assert!(matches!(wizard.feed("-", NOW, TZ), Step::Next(_)));
        assert!(matches!(wizard.feed("0", NOW, TZ), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("101", NOW, TZ), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("3", NOW, TZ), Step::Next(_)));
        assert!(wizard.draft().is_none());
        assert!(matches!(
            wizard.feed("2024-12-31 10:00", NOW, TZ),
            Step::Reprompt(_)
        ));
        assert!(matches!(wizard.feed("tomorrow", NOW, TZ), Step::Reprompt(_)));
        assert!(matches!(
            wizard.feed("2025-01-02 10:00", NOW, TZ),
            Step::Ready(_)
        ));
        assert!(matches!(wizard.feed("again", NOW, TZ), Step::Reprompt(_)));

        let draft = wizard.draft().unwrap();
        assert_eq!(draft.title, "Big prize");
        assert_eq!(draft.description, None);
        assert_eq!(draft.prize_count, 3);
        assert_eq!(draft.end_time, NOW + 34 * 3600);
        assert_eq!(draft.created_by, 9);
    }

    #[test]
    fn points_wizard_walkthrough() {
        let mut wizard = PointsWizard::new(-1, PointsAction::Deduct);
        assert!(matches!(wizard.feed("abc"), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("-5"), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("42"), Step::Next(_)));
        assert!(matches!(wizard.feed("0"), Step::Reprompt(_)));
        assert!(matches!(wizard.feed("10"), Step::Next(_)));
        assert!(matches!(wizard.feed("spam"), Step::Ready(_)));
        assert_eq!(
            wizard.operation(),
            Some(PointsOperation {
                group_id: -1,
                action: PointsAction::Deduct,
                user_id: 42,
                amount: 10,
                reason: Some("spam".into()),
            })
        );
    }

    #[test]
    fn input_validation() {
        assert!(InputKind::Welcome.accept("  ").is_err());
        assert_eq!(
            InputKind::BannedWord.accept(" ads "),
            Ok(InputValue::BannedWord("ads".into()))
        );
        assert_eq!(
            InputKind::Field(PointsField::Invite).accept("3"),
            Ok(InputValue::Field(PointsField::Invite, FieldValue::Number(3)))
        );
        assert!(InputKind::Field(PointsField::Invite).accept("x").is_err());
    }

    #[tokio::test]
    async fn session_store_lifecycle() {
        let store = SessionStore::new();
        assert!(store.feed(1, "hello", NOW, TZ).await.is_none());

        store
            .start(1, Session::Input { group_id: -1, kind: InputKind::Welcome }, NOW)
            .await;
        assert!(matches!(
            store.feed(1, "", NOW, TZ).await,
            Some(Outcome::Reprompt(_))
        ));
        assert_eq!(
            store.feed(1, "Hi all", NOW, TZ).await,
            Some(Outcome::Input {
                group_id: -1,
                value: InputValue::Welcome("Hi all".into())
            })
        );
        assert!(store.feed(1, "again", NOW, TZ).await.is_none());

        store
            .start(1, Session::Points(PointsWizard::new(-1, PointsAction::Add)), NOW)
            .await;
        for text in ["5", "20", "-"] {
            store.feed(1, text, NOW, TZ).await.unwrap();
        }
        assert!(store.take_points(1, -2, NOW).await.is_none());
        assert!(store.take_lottery(1, -1, NOW).await.is_none());
        let operation = store.take_points(1, -1, NOW).await.unwrap();
        assert_eq!(operation.amount, 20);
        assert_eq!(operation.reason, None);
        assert!(store.take_points(1, -1, NOW).await.is_none());

        store
            .start(1, Session::Lottery(LotteryWizard::new(-1, 1)), NOW)
            .await;
        assert!(store.cancel(1).await);
        assert!(!store.cancel(1).await);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::new();
        store
            .start(1, Session::Input { group_id: -1, kind: InputKind::Welcome }, NOW)
            .await;
        store
            .start(2, Session::Points(PointsWizard::new(-1, PointsAction::Add)), NOW)
            .await;
        assert!(matches!(
            store.feed(2, "5", NOW + SESSION_TTL, TZ).await,
            Some(Outcome::Step { .. })
        ));

        let later = NOW + SESSION_TTL + 1;
        assert!(store.feed(1, "Hi all", later, TZ).await.is_none());
        assert!(!store.cancel(1).await);

        store
            .start(3, Session::Lottery(LotteryWizard::new(-1, 3)), later + SESSION_TTL)
            .await;
        assert_eq!(store.inner.lock().await.len(), 1);
        assert!(store.take_points(2, -1, later + SESSION_TTL).await.is_none());
    }
}
