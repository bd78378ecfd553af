//! Control loop tests with mock reader, lock and indicator.
//!
//! Time is paused, so lock holds and poll sleeps complete instantly while
//! keeping their measured durations.
//!
//! Run with: cargo test --package latchkey-engine --test controller

use chrono::TimeDelta;
use latchkey_core::{CardId, DeviceIdentity};
use latchkey_engine::{AccessController, Clock, DecisionEngine, FixedClock, StopReason};
use latchkey_hardware::DoorPanel;
use latchkey_hardware::mock::{MockCardReader, MockCardReaderHandle, MockIndicator, MockLock};
use latchkey_hardware::{LedColor, LockState};
use latchkey_network::{AccessCheck, MockAuthority};
use latchkey_storage::{CardCache, MemoryCardCache};
use std::time::Duration;

type Controller = AccessController<
    MockCardReader,
    DoorPanel<MockLock, MockIndicator>,
    MemoryCardCache,
    MockAuthority,
    FixedClock,
>;

struct Rig {
    controller: Controller,
    reader: MockCardReaderHandle,
    lock: MockLock,
    indicator: MockIndicator,
    authority: MockAuthority,
    clock: FixedClock,
}

fn rig(cache: MemoryCardCache, authority: MockAuthority) -> Rig {
    let (reader, handle) = MockCardReader::new();
    let lock = MockLock::new();
    let indicator = MockIndicator::new();
    let clock = FixedClock::at_timestamp(1_760_832_000);
    let engine = DecisionEngine::new(
        DeviceIdentity::new("lab-door").unwrap(),
        TimeDelta::days(7),
        cache,
        authority.clone(),
        clock.clone(),
    );
    let controller = AccessController::new(
        reader,
        DoorPanel::new(lock.clone(), indicator.clone()),
        engine,
    )
    .with_unlock(Duration::from_secs(5))
    .with_poll_interval(Duration::from_millis(50));

    Rig {
        controller,
        reader: handle,
        lock,
        indicator,
        authority,
        clock,
    }
}

#[tokio::test(start_paused = true)]
async fn test_grant_holds_lock_then_audits() {
    let Rig {
        mut controller,
        reader,
        lock,
        indicator,
        authority,
        ..
    } = rig(MemoryCardCache::new(), MockAuthority::new(AccessCheck::Authorized));

    reader.present(0xa1b2).await.unwrap();
    drop(reader);

    let summary = controller.run(std::future::pending()).await;

    assert_eq!(summary.stop, StopReason::ReaderDisconnected);
    assert_eq!((summary.events, summary.grants, summary.denials), (1, 1, 0));

    let history = lock.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].0, LockState::Released);
    assert_eq!(history[1].0, LockState::Engaged);
    assert_eq!(history[1].1 - history[0].1, Duration::from_secs(5));

    // One call to decide before the lock opens, one audit after it closes
    assert_eq!(authority.call_count(), 2);
    let call_times = authority.call_times();
    assert!(call_times[0] <= history[0].1);
    assert!(call_times[1] >= history[1].1);
    assert_eq!(controller.pending_audits(), 0);
    assert_eq!(indicator.history(), vec![LedColor::Yellow, LedColor::Green]);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_grant_is_still_audited() {
    let cache = MemoryCardCache::new();
    let Rig {
        mut controller,
        reader,
        authority,
        clock,
        ..
    } = rig(cache, MockAuthority::new(AccessCheck::Authorized));

    let card = CardId::from_raw_code(0xffee);
    controller
        .engine()
        .cache()
        .insert(&card, clock.now() - TimeDelta::hours(1))
        .await
        .unwrap();

    reader.present(0xffee).await.unwrap();
    drop(reader);
    controller.run(std::future::pending()).await;

    assert_eq!(authority.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_denial_leaves_lock_engaged() {
    let Rig {
        mut controller,
        reader,
        lock,
        indicator,
        authority,
        ..
    } = rig(MemoryCardCache::new(), MockAuthority::new(AccessCheck::NotAuthorized));

    reader.present(0x1234).await.unwrap();
    drop(reader);
    let summary = controller.run(std::future::pending()).await;

    assert_eq!(summary.denials, 1);
    assert_eq!(lock.release_count(), 0);
    assert_eq!(lock.state(), LockState::Engaged);
    assert_eq!(authority.call_count(), 1);
    assert_eq!(indicator.current(), Some(LedColor::Red));
}

#[tokio::test(start_paused = true)]
async fn test_waiting_emitted_once_after_each_event() {
    let Rig {
        mut controller,
        reader,
        indicator,
        ..
    } = rig(
        MemoryCardCache::new(),
        MockAuthority::scripted([AccessCheck::NotAuthorized, AccessCheck::Authorized]),
    );

    reader.present(0x0001).await.unwrap();
    let presenter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        reader.present(0x0002).await.unwrap();
        // Keep the reader connected past shutdown
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(reader);
    });

    let summary = controller
        .run(tokio::time::sleep(Duration::from_secs(20)))
        .await;
    presenter.await.unwrap();

    assert_eq!(summary.stop, StopReason::Shutdown);
    assert_eq!(summary.events, 2);
    assert_eq!(
        indicator.history(),
        vec![
            LedColor::Yellow,
            LedColor::Red,
            LedColor::Blue,
            LedColor::Green,
            LedColor::Blue,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_idle() {
    let Rig {
        mut controller,
        reader,
        lock,
        ..
    } = rig(MemoryCardCache::new(), MockAuthority::new(AccessCheck::Authorized));

    let summary = controller
        .run(tokio::time::sleep(Duration::from_millis(500)))
        .await;

    assert_eq!(summary.stop, StopReason::Shutdown);
    assert_eq!(summary.events, 0);
    assert!(lock.history().is_empty());
    drop(reader);
}
