//! End-to-end decision scenarios against real cache implementations.
//!
//! Run with: cargo test --package latchkey-engine --test decision_scenarios

use chrono::{DateTime, TimeDelta, Utc};
use latchkey_core::{CardId, DeviceIdentity};
use latchkey_engine::{CacheAction, Decision, DecisionEngine, DecisionSource, FixedClock};
use latchkey_network::{AccessCheck, MockAuthority};
use latchkey_storage::{CardCache, CardRecord, FileCardCache, MemoryCardCache};
use tempfile::TempDir;

const NOW: i64 = 1_760_832_000;
const TTL_SECS: i64 = 604_800;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW, 0).unwrap()
}

fn card(id: &str) -> CardId {
    CardId::new(id).unwrap()
}

fn engine<C: CardCache>(
    cache: C,
    authority: &MockAuthority,
) -> DecisionEngine<C, MockAuthority, FixedClock> {
    DecisionEngine::new(
        DeviceIdentity::new("lab-door").unwrap(),
        TimeDelta::seconds(TTL_SECS),
        cache,
        authority.clone(),
        FixedClock::new(now()),
    )
}

fn cached(id: &str, age: TimeDelta) -> MemoryCardCache {
    MemoryCardCache::with_records([CardRecord::new(card(id), now() - age)])
}

#[tokio::test]
async fn test_miss_not_authorized_denies_without_mutation() {
    let authority = MockAuthority::new(AccessCheck::NotAuthorized);
    let mut engine = engine(MemoryCardCache::new(), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Deny);
    assert_eq!(outcome.cache_action, CacheAction::None);
    assert!(engine.cache().is_empty().await.unwrap());
    assert_eq!(authority.call_count(), 1);
}

#[tokio::test]
async fn test_miss_authorized_inserts_one_record_at_now() {
    let authority = MockAuthority::new(AccessCheck::Authorized);
    let mut engine = engine(MemoryCardCache::new(), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Grant);
    assert_eq!(outcome.cache_action, CacheAction::Insert);
    let records = engine.cache().records().await.unwrap();
    assert_eq!(records, vec![CardRecord::new(card("01a1b2"), now())]);
}

#[tokio::test]
async fn test_miss_unreachable_denies_without_mutation() {
    let authority = MockAuthority::new(AccessCheck::Unreachable);
    let mut engine = engine(MemoryCardCache::new(), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Deny);
    assert!(engine.cache().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_fresh_hit_grants_without_remote_call() {
    let authority = MockAuthority::new(AccessCheck::NotAuthorized);
    let stored = now() - TimeDelta::hours(1);
    let mut engine = engine(cached("01FFEE", TimeDelta::hours(1)), &authority);

    let outcome = engine.evaluate(&card("01FFEE")).await;

    assert_eq!(outcome.decision, Decision::Grant);
    assert_eq!(outcome.source, DecisionSource::LocalCache);
    assert_eq!(authority.call_count(), 0);
    assert_eq!(engine.cache().lookup(&card("01FFEE")).await, Some(stored));
}

#[tokio::test]
async fn test_age_exactly_ttl_is_fresh() {
    let authority = MockAuthority::new(AccessCheck::Unreachable);
    let mut engine = engine(cached("01a1b2", TimeDelta::seconds(TTL_SECS)), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Grant);
    assert_eq!(authority.call_count(), 0);
}

#[tokio::test]
async fn test_stale_authorized_refreshes_to_now() {
    let authority = MockAuthority::new(AccessCheck::Authorized);
    let mut engine = engine(cached("01A1B2", TimeDelta::days(8)), &authority);

    let outcome = engine.evaluate(&card("01A1B2")).await;

    assert_eq!(outcome.decision, Decision::Grant);
    assert_eq!(outcome.cache_action, CacheAction::UpdateTimestamp);
    assert_eq!(authority.call_count(), 1);
    assert_eq!(engine.cache().lookup(&card("01A1B2")).await, Some(now()));
}

#[tokio::test]
async fn test_stale_not_authorized_removes_record() {
    let authority = MockAuthority::new(AccessCheck::NotAuthorized);
    let mut engine = engine(cached("01a1b2", TimeDelta::days(8)), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Deny);
    assert_eq!(outcome.cache_action, CacheAction::Delete);
    assert_eq!(engine.cache().lookup(&card("01a1b2")).await, None);
}

#[tokio::test]
async fn test_stale_unreachable_denies_and_keeps_record() {
    let authority = MockAuthority::new(AccessCheck::Unreachable);
    let stored = now() - TimeDelta::days(8);
    let mut engine = engine(cached("01a1b2", TimeDelta::days(8)), &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    assert_eq!(outcome.decision, Decision::Deny);
    assert_eq!(outcome.cache_action, CacheAction::None);
    assert_eq!(engine.cache().lookup(&card("01a1b2")).await, Some(stored));
}

#[tokio::test]
async fn test_unavailable_store_falls_back_to_authority() {
    let authority = MockAuthority::new(AccessCheck::Authorized);
    let cache = cached("01a1b2", TimeDelta::hours(1));
    cache.set_unavailable(true);
    let mut engine = engine(cache, &authority);

    let outcome = engine.evaluate(&card("01a1b2")).await;

    // Lookup misses, the insert fails and is logged; the grant stands
    assert_eq!(outcome.decision, Decision::Grant);
    assert_eq!(outcome.cache_action, CacheAction::Insert);
    assert_eq!(authority.call_count(), 1);
}

#[tokio::test]
async fn test_file_cache_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cards.txt");
    let authority = MockAuthority::scripted([AccessCheck::Authorized, AccessCheck::NotAuthorized]);
    let clock = FixedClock::new(now());
    let mut engine = DecisionEngine::new(
        DeviceIdentity::new("lab-door").unwrap(),
        TimeDelta::seconds(TTL_SECS),
        FileCardCache::new(&path),
        authority.clone(),
        clock.clone(),
    );
    let badge = CardId::from_raw_code(0xa1b2);

    // First presentation: remote grant, record created
    assert_eq!(engine.evaluate(&badge).await.decision, Decision::Grant);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("01a1b2,{NOW}\n")
    );

    // Next day: served from the cache
    clock.advance(TimeDelta::days(1));
    assert_eq!(engine.evaluate(&badge).await.decision, Decision::Grant);
    assert_eq!(authority.call_count(), 1);

    // After the TTL: revoked remotely, record deleted
    clock.advance(TimeDelta::days(7));
    assert_eq!(engine.evaluate(&badge).await.decision, Decision::Deny);
    assert_eq!(authority.call_count(), 2);
    assert!(engine.cache().lookup(&badge).await.is_none());
}
