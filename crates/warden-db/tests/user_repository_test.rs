//! Integration tests for the user repository using in-memory SurrealDB.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::models::user::{CreateUser, UpdateUser, UserRole};
use warden_core::repository::{Pagination, UserRepository};
use warden_db::SurrealUserRepository;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> SurrealUserRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    SurrealUserRepository::new(db)
}

fn new_user(name: &str) -> CreateUser {
    CreateUser {
        email: format!("{name}@example.com"),
        nickname: name.into(),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into(),
        role: UserRole::User,
        first_name: None,
        last_name: None,
        bio: None,
        profile_picture_url: None,
        verification_token: Some("digest-of-token".into()),
        is_verified: false,
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = setup().await;

    let user = repo.create(new_user("alice")).await.unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.nickname, "alice");
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.failed_login_attempts, 0);
    assert!(!user.is_locked);
    assert!(!user.is_verified);

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.verification_token.as_deref(), Some("digest-of-token"));

    let by_email = repo.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);

    let by_nickname = repo.get_by_nickname("alice").await.unwrap();
    assert_eq!(by_nickname.id, user.id);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let repo = setup().await;

    let err = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));

    let err = repo.get_by_email("ghost@example.com").await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));

    let err = repo.get_by_nickname("ghost").await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_email_rejected() {
    let repo = setup().await;
    repo.create(new_user("bob")).await.unwrap();

    let mut clash = new_user("bobby");
    clash.email = "bob@example.com".into();
    let err = repo.create(clash).await.unwrap_err();
    assert!(
        matches!(err, WardenError::AlreadyExists { .. }),
        "expected AlreadyExists, got: {err:?}"
    );
}

#[tokio::test]
async fn duplicate_nickname_rejected() {
    let repo = setup().await;
    repo.create(new_user("carol")).await.unwrap();

    let mut clash = new_user("carol");
    clash.email = "someone-else@example.com".into();
    assert!(repo.create(clash).await.is_err());
}

#[tokio::test]
async fn update_user_partially() {
    let repo = setup().await;
    let user = repo.create(new_user("dave")).await.unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                nickname: Some("david".into()),
                bio: Some("Writes tests".into()),
                role: Some(UserRole::Manager),
                verification_token: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.nickname, "david");
    assert_eq!(updated.bio.as_deref(), Some("Writes tests"));
    assert_eq!(updated.role, UserRole::Manager);
    assert!(updated.verification_token.is_none());
    assert_eq!(updated.email, "dave@example.com"); // unchanged
}

#[tokio::test]
async fn update_missing_user_is_not_found() {
    let repo = setup().await;
    let err = repo
        .update(
            uuid::Uuid::new_v4(),
            UpdateUser {
                bio: Some("nobody".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

#[tokio::test]
async fn hard_delete_user() {
    let repo = setup().await;
    let user = repo.create(new_user("erin")).await.unwrap();

    assert!(repo.delete(user.id).await.unwrap());
    assert!(repo.get_by_id(user.id).await.is_err());
    assert!(!repo.delete(user.id).await.unwrap());
}

#[tokio::test]
async fn list_users_with_pagination() {
    let repo = setup().await;

    for i in 0..5 {
        repo.create(new_user(&format!("user-{i}"))).await.unwrap();
    }

    let page1 = repo
        .list(Pagination {
            offset: 0,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 5);

    let page2 = repo
        .list(Pagination {
            offset: 3,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 2);

    for item in &page2.items {
        assert!(page1.items.iter().all(|u| u.id != item.id));
    }

    let beyond = repo
        .list(Pagination {
            offset: 40,
            limit: 3,
        })
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(repo.count().await.unwrap(), 5);
}

#[tokio::test]
async fn failed_logins_lock_at_threshold() {
    let repo = setup().await;
    let user = repo.create(new_user("frank")).await.unwrap();

    let after_one = repo.record_failed_login(user.id, 3).await.unwrap();
    assert_eq!(after_one.failed_login_attempts, 1);
    assert!(!after_one.is_locked);

    repo.record_failed_login(user.id, 3).await.unwrap();
    let after_three = repo.record_failed_login(user.id, 3).await.unwrap();
    assert_eq!(after_three.failed_login_attempts, 3);
    assert!(after_three.is_locked);
    assert!(after_three.locked_at.is_some());

    // Locked accounts stop counting.
    let after_four = repo.record_failed_login(user.id, 3).await.unwrap();
    assert_eq!(after_four.failed_login_attempts, 3);
    assert!(after_four.is_locked);
}

#[tokio::test]
async fn successful_login_refused_while_locked() {
    let repo = setup().await;
    let user = repo.create(new_user("grace")).await.unwrap();

    repo.record_failed_login(user.id, 5).await.unwrap();
    let reset = repo.record_successful_login(user.id).await.unwrap().unwrap();
    assert_eq!(reset.failed_login_attempts, 0);
    assert!(reset.last_login_at.is_some());

    repo.record_failed_login(user.id, 1).await.unwrap();
    assert!(repo.record_successful_login(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn unlock_only_changes_locked_accounts() {
    let repo = setup().await;
    let user = repo.create(new_user("heidi")).await.unwrap();

    assert!(!repo.unlock(user.id).await.unwrap());

    repo.record_failed_login(user.id, 1).await.unwrap();
    assert!(repo.unlock(user.id).await.unwrap());

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert!(!fetched.is_locked);
    assert_eq!(fetched.failed_login_attempts, 0);
    assert!(fetched.locked_at.is_none());

    assert!(!repo.unlock(uuid::Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn verification_token_is_single_use() {
    let repo = setup().await;
    let user = repo.create(new_user("ivan")).await.unwrap();

    assert!(!repo.consume_verification_token(user.id, "wrong").await.unwrap());
    assert!(
        repo.consume_verification_token(user.id, "digest-of-token")
            .await
            .unwrap()
    );
    assert!(
        !repo
            .consume_verification_token(user.id, "digest-of-token")
            .await
            .unwrap()
    );

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert!(fetched.is_verified);
    assert!(fetched.verification_token.is_none());
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let repo = setup().await;
    let user = repo.create(new_user("judy")).await.unwrap();

    repo.update(
        user.id,
        UpdateUser {
            password_reset_token: Some(Some("reset-digest".into())),
            password_reset_expires_at: Some(Some(
                chrono::Utc::now() - chrono::Duration::minutes(1),
            )),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(
        !repo
            .consume_password_reset_token(user.id, "reset-digest", "new-hash")
            .await
            .unwrap()
    );
    assert_eq!(
        repo.get_by_id(user.id).await.unwrap().password_hash,
        user.password_hash
    );
}

#[tokio::test]
async fn reset_token_replaces_hash_once() {
    let repo = setup().await;
    let user = repo.create(new_user("ken")).await.unwrap();

    repo.update(
        user.id,
        UpdateUser {
            password_reset_token: Some(Some("reset-digest".into())),
            password_reset_expires_at: Some(Some(chrono::Utc::now() + chrono::Duration::hours(1))),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(
        repo.consume_password_reset_token(user.id, "reset-digest", "new-hash")
            .await
            .unwrap()
    );
    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.password_hash, "new-hash");
    assert!(fetched.password_reset_token.is_none());

    assert!(
        !repo
            .consume_password_reset_token(user.id, "reset-digest", "other-hash")
            .await
            .unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failed_logins_are_not_lost() {
    let repo = Arc::new(setup().await);
    let user = repo.create(new_user("leo")).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.record_failed_login(user.id, 100).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.failed_login_attempts, 16);
    assert!(!fetched.is_locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failed_logins_lock_exactly_at_threshold() {
    let repo = Arc::new(setup().await);
    let user = repo.create(new_user("mia")).await.unwrap();

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.record_failed_login(user.id, 5).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert!(fetched.is_locked);
    assert!(fetched.locked_at.is_some());
    assert_eq!(fetched.failed_login_attempts, 5);
}

#[tokio::test]
async fn failed_login_locks_in_the_same_write() {
    let repo = setup().await;
    let user = repo.create(new_user("nia")).await.unwrap();

    let first = repo.record_failed_login(user.id, 2).await.unwrap();
    assert!(!first.is_locked);
    assert!(first.locked_at.is_none());

    let second = repo.record_failed_login(user.id, 2).await.unwrap();
    assert_eq!(second.failed_login_attempts, 2);
    assert!(second.is_locked);
    assert!(second.locked_at.is_some());

    // A success racing in after the lock cannot reset the counter.
    assert!(repo.record_successful_login(user.id).await.unwrap().is_none());
    assert_eq!(repo.get_by_id(user.id).await.unwrap().failed_login_attempts, 2);
}
