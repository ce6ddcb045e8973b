//! Duplicate detection through the shared message handler.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::{text_update, FailingNotifier, TestBot, TEST_CHAT};
use dedup_bot::config::{DetectionConfig, UpdateMode};
use dedup_bot::error::BotError;
use dedup_bot::handler::{HandleOutcome, IgnoreReason, MessageHandler};
use dedup_db::repositories::MessageRepo;
use dedup_telegram::Update;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 22)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[tokio::test]
async fn first_message_is_recorded() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    let update = text_update(1, TEST_CHAT, 10, 501, "Budi", "0812 3456 7890");

    let outcome = bot.handler.handle_update_at(&update, at(3, 0)).await.unwrap();

    assert_eq!(outcome, HandleOutcome::Recorded);
    assert_eq!(MessageRepo::count_by_chat(&bot.pool, TEST_CHAT).await.unwrap(), 1);
    assert!(bot.notifier.replies().is_empty());
}

#[tokio::test]
async fn repeat_inside_window_sends_notice() {
    let bot = TestBot::new(UpdateMode::Polling).await;

    bot.handler
        .handle_update_at(
            &text_update(1, TEST_CHAT, 10, 501, "Budi", "0812 3456 7890"),
            at(3, 21),
        )
        .await
        .unwrap();

    let outcome = bot
        .handler
        .handle_update_at(
            &text_update(2, TEST_CHAT, 11, 502, "Sari", "  0812   3456 7890 "),
            at(18, 5),
        )
        .await
        .unwrap();

    let notice = assert_matches!(outcome, HandleOutcome::Duplicate(n) => n);
    assert_eq!(notice.original_text, "0812 3456 7890");
    assert_eq!(notice.original_user_name, "Budi");
    assert_eq!(notice.original_time, at(3, 21));
    assert_eq!(notice.current_user_name, "Sari");

    let replies = bot.notifier.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].chat_id, TEST_CHAT);
    assert_eq!(replies[0].reply_to, 11);
    assert_eq!(
        replies[0].text,
        "❌Nomor sudah pernah bergabung❌\n\
         Nomor yang terdeteksi: 0812 3456 7890\n\
         Budi : 2026/02/22 10:21:00 (pertama kali)\n\
         Sari : 2026/02/23 01:05:00 (kali ini)"
    );

    // The first poster stays on record.
    assert_eq!(MessageRepo::count_by_chat(&bot.pool, TEST_CHAT).await.unwrap(), 1);
}

#[tokio::test]
async fn case_differences_are_duplicates() {
    let bot = TestBot::new(UpdateMode::Polling).await;

    bot.handler
        .handle_update_at(&text_update(1, TEST_CHAT, 10, 501, "Budi", "Hello There"), at(1, 0))
        .await
        .unwrap();
    let outcome = bot
        .handler
        .handle_update_at(&text_update(2, TEST_CHAT, 11, 501, "Budi", "hello THERE"), at(2, 0))
        .await
        .unwrap();

    assert_matches!(outcome, HandleOutcome::Duplicate(_));
}

#[tokio::test]
async fn other_chats_are_independent() {
    let bot = TestBot::new(UpdateMode::Polling).await;

    bot.handler
        .handle_update_at(&text_update(1, TEST_CHAT, 10, 501, "Budi", "same text here"), at(1, 0))
        .await
        .unwrap();
    let outcome = bot
        .handler
        .handle_update_at(&text_update(2, -999, 10, 502, "Sari", "same text here"), at(2, 0))
        .await
        .unwrap();

    assert_eq!(outcome, HandleOutcome::Recorded);
    assert!(bot.notifier.replies().is_empty());
}

#[tokio::test]
async fn repeat_after_window_starts_new_record() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    let first_at = at(1, 0);
    let later = first_at + Duration::hours(25);

    bot.handler
        .handle_update_at(&text_update(1, TEST_CHAT, 10, 501, "Budi", "job posting text"), first_at)
        .await
        .unwrap();
    let outcome = bot
        .handler
        .handle_update_at(&text_update(2, TEST_CHAT, 11, 502, "Sari", "job posting text"), later)
        .await
        .unwrap();
    assert_eq!(outcome, HandleOutcome::Recorded);

    // The new record is the reference for the next repeat.
    let outcome = bot
        .handler
        .handle_update_at(
            &text_update(3, TEST_CHAT, 12, 503, "Andi", "job posting text"),
            later + Duration::hours(1),
        )
        .await
        .unwrap();
    let notice = assert_matches!(outcome, HandleOutcome::Duplicate(n) => n);
    assert_eq!(notice.original_user_name, "Sari");
    assert_eq!(notice.original_time, later);
}

#[tokio::test]
async fn ignores_short_commands_and_empty_updates() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    let now = at(1, 0);

    let short = text_update(1, TEST_CHAT, 10, 501, "Budi", "  ok  ");
    assert_eq!(
        bot.handler.handle_update_at(&short, now).await.unwrap(),
        HandleOutcome::Ignored(IgnoreReason::TooShort)
    );

    let command: Update = serde_json::from_value(serde_json::json!({
        "update_id": 2,
        "message": {
            "message_id": 11,
            "from": {"id": 501, "is_bot": false, "first_name": "Budi"},
            "chat": {"id": TEST_CHAT, "type": "supergroup"},
            "date": 0,
            "text": "/start please",
            "entities": [{"type": "bot_command", "offset": 0, "length": 6}]
        }
    }))
    .unwrap();
    assert_eq!(
        bot.handler.handle_update_at(&command, now).await.unwrap(),
        HandleOutcome::Ignored(IgnoreReason::Command)
    );

    let photo: Update = serde_json::from_value(serde_json::json!({
        "update_id": 3,
        "message": {
            "message_id": 12,
            "from": {"id": 501, "is_bot": false, "first_name": "Budi"},
            "chat": {"id": TEST_CHAT, "type": "supergroup"},
            "date": 0,
            "photo": []
        }
    }))
    .unwrap();
    assert_eq!(
        bot.handler.handle_update_at(&photo, now).await.unwrap(),
        HandleOutcome::Ignored(IgnoreReason::NoText)
    );

    let anonymous: Update = serde_json::from_value(serde_json::json!({
        "update_id": 4,
        "message": {
            "message_id": 13,
            "chat": {"id": TEST_CHAT, "type": "supergroup"},
            "date": 0,
            "text": "posted as the group"
        }
    }))
    .unwrap();
    assert_eq!(
        bot.handler.handle_update_at(&anonymous, now).await.unwrap(),
        HandleOutcome::Ignored(IgnoreReason::NoSender)
    );

    let edited: Update =
        serde_json::from_value(serde_json::json!({"update_id": 5, "edited_message": {}})).unwrap();
    assert_eq!(
        bot.handler.handle_update_at(&edited, now).await.unwrap(),
        HandleOutcome::Ignored(IgnoreReason::NoMessage)
    );

    assert_eq!(MessageRepo::count_all(&bot.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_first_name_uses_user_id() {
    let bot = TestBot::new(UpdateMode::Polling).await;

    bot.handler
        .handle_update_at(&text_update(1, TEST_CHAT, 10, 777, "", "anonymous text"), at(1, 0))
        .await
        .unwrap();
    let outcome = bot
        .handler
        .handle_update_at(&text_update(2, TEST_CHAT, 11, 888, "Sari", "anonymous text"), at(2, 0))
        .await
        .unwrap();

    let notice = assert_matches!(outcome, HandleOutcome::Duplicate(n) => n);
    assert_eq!(notice.original_user_name, "777");
}

#[tokio::test]
async fn reply_failure_is_reported() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    let handler = MessageHandler::new(
        bot.pool.clone(),
        Arc::new(FailingNotifier),
        DetectionConfig::default(),
    );

    handler
        .handle_update_at(
            &text_update(1, TEST_CHAT, 10, 501, "Budi", "some repeated text"),
            at(1, 0),
        )
        .await
        .unwrap();
    let result = handler
        .handle_update_at(
            &text_update(2, TEST_CHAT, 11, 502, "Sari", "some repeated text"),
            at(2, 0),
        )
        .await;

    assert_matches!(result, Err(BotError::Telegram(_)));
}

#[tokio::test]
async fn database_failure_is_reported() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    bot.pool.close().await;

    let result = bot
        .handler
        .handle_update_at(&text_update(1, TEST_CHAT, 10, 501, "Budi", "some text here"), at(1, 0))
        .await;

    assert_matches!(result, Err(BotError::Database(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_copies_yield_one_notice() {
    let bot = TestBot::new(UpdateMode::Polling).await;
    let rounds = 25;

    for round in 0..rounds {
        let text = format!("burst message number {round}");
        let first = text_update(2 * round, TEST_CHAT, 2 * round, 501, "Budi", &text);
        let second = text_update(2 * round + 1, TEST_CHAT, 2 * round + 1, 502, "Sari", &text);

        let (h1, h2) = (Arc::clone(&bot.handler), Arc::clone(&bot.handler));
        let a = tokio::spawn(async move { h1.handle_update(&first).await });
        let b = tokio::spawn(async move { h2.handle_update(&second).await });
        let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];

        let recorded = outcomes
            .iter()
            .filter(|o| **o == HandleOutcome::Recorded)
            .count();
        let duplicates = outcomes
            .iter()
            .filter(|o| matches!(o, HandleOutcome::Duplicate(_)))
            .count();
        assert_eq!((recorded, duplicates), (1, 1), "round {round}: {outcomes:?}");
    }

    assert_eq!(bot.notifier.replies().len(), rounds as usize);
    assert_eq!(
        MessageRepo::count_by_chat(&bot.pool, TEST_CHAT).await.unwrap(),
        rounds
    );
}
