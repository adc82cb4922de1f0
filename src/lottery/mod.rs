pub mod monitor;

use chrono_tz::Tz;
use itertools::Itertools as _;
use rand::{Rng, seq::IndexedRandom as _};

use crate::bot::replace_all;
use crate::i18n::Text;
use crate::types::{DrawResult, Language, Lottery, Participant, timestamp_to_string};

/// Pick up to `count` distinct participants, returning their user ids.
pub fn choose_winners<R: Rng + ?Sized>(
    participants: &[Participant],
    count: usize,
    rng: &mut R,
) -> Vec<i64> {
    participants
        .choose_multiple(rng, count)
        .map(Participant::user_id)
        .collect()
}

pub fn mention(user_id: i64, name: &str) -> String {
    format!("[{}](tg://user?id={user_id})", replace_all(name))
}

pub fn lottery_text(lottery: &Lottery, tz: Tz, language: Language) -> String {
    let mut text = format!("🎁 *{}*\n\n", replace_all(lottery.title()));
    if let Some(description) = lottery.description() {
        text.push_str(&replace_all(description));
        text.push_str("\n\n");
    }
    text.push_str(&format!(
        "{}: {}\n{}: {}",
        Text::LotteryPrizes.get(language),
        lottery.prize_count(),
        Text::LotteryEndsAt.get(language),
        replace_all(&timestamp_to_string(lottery.end_time(), tz))
    ));
    text
}

pub fn announce_text(result: &DrawResult, language: Language) -> String {
    let title = replace_all(result.lottery.title());
    if result.winners.is_empty() {
        return format!(
            "🎁 *{title}*\n{}",
            replace_all(Text::LotteryNobody.get(language))
        );
    }
    format!(
        "🎉 *{title}*\n{}\n{}: {}\n\n{}:\n{}",
        replace_all(Text::LotteryDrawn.get(language)),
        Text::LotteryParticipants.get(language),
        result.participants,
        Text::LotteryWinners.get(language),
        result
            .winners
            .iter()
            .map(|winner| format!("• {}", mention(winner.user_id(), winner.name())))
            .join("\n")
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools as _;
    use rand::{SeedableRng, rngs::StdRng};

    const NOW: i64 = 1_735_689_600;

    fn participants(n: i64) -> Vec<Participant> {
        (1..=n).map(|id| Participant::new(id, format!("u{id}"))).collect()
    }

    #[test]
    fn winners_are_distinct_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = participants(10);
        for count in [1, 3, 10, 20] {
            let winners = choose_winners(&pool, count, &mut rng);
            assert_eq!(winners.len(), count.min(10));
            assert_eq!(winners.iter().unique().count(), winners.len());
            assert!(winners.iter().all(|id| (1..=10).contains(id)));
        }
        assert!(choose_winners(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn mention_escapes_name() {
        assert_eq!(mention(5, "a_b"), "[a\\_b](tg://user?id=5)");
    }

    #[test]
    fn announce_follows_group_language() {
        let result = DrawResult {
            lottery: Lottery::new(3, -1, "Gift", 2, NOW),
            participants: 4,
            winners: participants(2),
        };
        let zh = announce_text(&result, Language::Zh);
        assert!(zh.contains("抽奖已开奖") && zh.contains("中奖名单"));
        assert!(!zh.contains("Winners"));
        let en = announce_text(&result, Language::Jp);
        assert!(en.contains("Winners") && en.contains("Participants: 4"));
        assert!(en.contains("[u2](tg://user?id=2)"));

        let nobody = DrawResult {
            winners: Vec::new(),
            participants: 0,
            ..result
        };
        assert!(announce_text(&nobody, Language::Zh).contains("无人参与"));
    }

    #[test]
    fn lottery_text_follows_group_language() {
        let lottery = Lottery::new(3, -1, "Gift", 2, NOW);
        let zh = lottery_text(&lottery, chrono_tz::UTC, Language::Zh);
        assert!(zh.contains("奖品数量: 2") && zh.contains("2025\\-01\\-01 00:00"));
        let en = lottery_text(&lottery, chrono_tz::UTC, Language::En);
        assert!(en.starts_with("🎁 *Gift*") && en.contains("Prizes: 2"));
    }
}
