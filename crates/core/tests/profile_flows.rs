//! End-to-end flows across the profile services over in-memory backends.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use profile_common::{AppError, CacheConfig, LimitsConfig, MemoryCacheStore};
use profile_core::{
    BanInput, InterestInput, InterestService, MemoryProfileStore, ModerationService, PhotoDecision,
    PhotoService, Principal, ProfileCache, ProfileService, ProfileView, Role, VisibilityFilter,
    DELETE_CONFIRMATION,
};
use profile_db::entities::user::{ModerationStatus, UserStatus};
use profile_db::test_utils::user_fixture;

struct World {
    store: Arc<MemoryProfileStore>,
    cache_store: Arc<MemoryCacheStore>,
    profiles: ProfileService,
    moderation: ModerationService,
    photos: PhotoService,
    interests: InterestService,
    visibility: VisibilityFilter,
}

async fn world() -> World {
    let store = Arc::new(MemoryProfileStore::new());
    for (id, name) in [("alice", "alice"), ("bob", "bob"), ("carol", "carol")] {
        store.insert_user(user_fixture(id, name)).await;
    }
    let cache_store = Arc::new(MemoryCacheStore::new());
    let cache = ProfileCache::new(cache_store.clone(), &CacheConfig::default());
    let limits = LimitsConfig::default();

    World {
        profiles: ProfileService::new(store.clone(), cache.clone()),
        moderation: ModerationService::new(store.clone(), cache.clone()),
        photos: PhotoService::new(store.clone(), cache.clone(), limits),
        interests: InterestService::new(store.clone(), cache, limits),
        visibility: VisibilityFilter::new(store.clone()),
        store,
        cache_store,
    }
}

fn moderator() -> Principal {
    Principal::user("mod").with_role(Role::Moderator)
}

fn own(view: ProfileView) -> Box<profile_core::ProfileSnapshot> {
    match view {
        ProfileView::Own(snapshot) => snapshot,
        ProfileView::Public(_) => panic!("expected the owner's view"),
    }
}

#[tokio::test]
async fn block_is_symmetric_for_every_pair() {
    let w = world().await;
    w.store.block("alice", "bob").await;

    let users = ["alice", "bob", "carol"];
    for a in users {
        for b in users {
            let blocked = (a == "alice" && b == "bob") || (a == "bob" && b == "alice");
            let visible = w.visibility.is_visible(a, b).await.unwrap();
            assert_eq!(visible, !blocked, "{a} -> {b}");
        }
    }
}

#[tokio::test]
async fn self_view_never_records_regardless_of_ghost_mode() {
    let w = world().await;
    for ghost in [false, true] {
        w.profiles
            .get_public_profile("alice", &Principal::user("alice").with_ghost_mode(ghost))
            .await
            .unwrap();
    }
    assert!(w.store.profile_views().await.is_empty());
}

#[tokio::test]
async fn ban_replaces_cached_snapshot() {
    let w = world().await;
    let before = own(w.profiles.get_profile("bob", "bob").await.unwrap());
    assert_eq!(before.status, UserStatus::Active);
    assert!(w.cache_store.contains("user_profile:bob").await);

    w.moderation
        .ban(
            &moderator(),
            "bob",
            BanInput {
                reason: "harassment".to_string(),
                expires_at: Some(Utc::now() + Duration::days(3)),
            },
        )
        .await
        .unwrap();

    let after = own(w.profiles.get_profile("bob", "bob").await.unwrap());
    assert_eq!(after.status, UserStatus::TemporaryBan);
    assert!(matches!(
        w.profiles.get_profile("bob", "alice").await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn rejected_ban_leaves_state_and_cache_alone() {
    let w = world().await;
    w.profiles.get_profile("bob", "bob").await.unwrap();

    let result = w
        .moderation
        .ban(
            &moderator(),
            "bob",
            BanInput {
                reason: "harassment".to_string(),
                expires_at: Some(Utc::now()),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
    assert_eq!(w.store.user("bob").await.unwrap().status, UserStatus::Active);
    assert!(w.cache_store.contains("user_profile:bob").await);
}

#[tokio::test]
async fn new_main_photo_needs_review_again() {
    let w = world().await;
    w.photos
        .set_main_photo("carol", "https://cdn.example.com/c1.jpg")
        .await
        .unwrap();
    w.moderation
        .moderate_photo(&moderator(), "carol", PhotoDecision::Approved)
        .await
        .unwrap();

    let photos = w
        .photos
        .set_main_photo("carol", "https://cdn.example.com/c2.jpg")
        .await
        .unwrap();
    assert_eq!(photos.main_photo_moderation_status, ModerationStatus::Pending);

    let snapshot = own(w.profiles.get_profile("carol", "carol").await.unwrap());
    assert_eq!(snapshot.main_photo_moderation_status, ModerationStatus::Pending);
}

#[tokio::test]
async fn re_moderation_is_idempotent() {
    let w = world().await;
    w.photos
        .set_main_photo("carol", "https://cdn.example.com/c1.jpg")
        .await
        .unwrap();

    for _ in 0..2 {
        let outcome = w
            .moderation
            .moderate_photo(&moderator(), "carol", PhotoDecision::Approved)
            .await
            .unwrap();
        assert_eq!(outcome.status, ModerationStatus::Approved);
    }
}

#[tokio::test]
async fn interest_limit_keeps_existing_tags() {
    let w = world().await;
    let tags = (0..20)
        .map(|i| InterestInput::new(format!("tag{i}"), Some(0.5)))
        .collect();
    w.interests.set_interests("alice", tags).await.unwrap();

    let result = w
        .interests
        .add_interest("alice", InterestInput::new("climbing", None))
        .await;
    assert!(matches!(result, Err(AppError::LimitExceeded { .. })));

    let updated = w
        .interests
        .add_interest("alice", InterestInput::new("Tag7", Some(0.9)))
        .await
        .unwrap();
    assert_eq!(updated.len(), 20);
    assert_eq!(updated[0].tag, "tag7");
}

#[tokio::test]
async fn interests_are_embedded_in_snapshot() {
    let w = world().await;
    w.profiles.get_profile("alice", "alice").await.unwrap();
    w.interests
        .add_interest("alice", InterestInput::new("chess", None))
        .await
        .unwrap();

    let snapshot = own(w.profiles.get_profile("alice", "alice").await.unwrap());
    assert_eq!(snapshot.interests.len(), 1);
}

#[tokio::test]
async fn deleted_account_is_gone_and_frees_username() {
    let w = world().await;
    w.interests
        .add_interest("alice", InterestInput::new("chess", None))
        .await
        .unwrap();

    w.profiles
        .delete_account("alice", DELETE_CONFIRMATION)
        .await
        .unwrap();

    assert!(matches!(
        w.profiles.get_profile("alice", "alice").await,
        Err(AppError::NotFound { .. })
    ));
    assert!(matches!(
        w.moderation.unban(&moderator(), "alice").await,
        Err(AppError::NotFound { .. })
    ));

    let snapshot = w.profiles.update_username("bob", "Alice").await.unwrap();
    assert_eq!(snapshot.username, "Alice");
}

#[tokio::test]
async fn cache_outage_never_reaches_callers() {
    let w = world().await;
    w.cache_store.set_unavailable(true);

    w.profiles.get_profile("alice", "bob").await.unwrap();
    w.moderation
        .ban(
            &moderator(),
            "alice",
            BanInput {
                reason: "spam".to_string(),
                expires_at: None,
            },
        )
        .await
        .unwrap();

    w.cache_store.set_unavailable(false);
    let snapshot = own(w.profiles.get_profile("alice", "alice").await.unwrap());
    assert_eq!(snapshot.status, UserStatus::Banned);
}
