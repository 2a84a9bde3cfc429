//! Fixtures shared by the store's unit tests.

use barakholka_shared::{Ad, AdId, User, UserId};
use chrono::Utc;
use tempfile::TempDir;

use crate::database::Database;

pub(crate) fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (db, dir)
}

pub(crate) fn user(db: &Database, id: i64, name: &str, is_staff: bool) -> User {
    let user = User {
        id: UserId(id),
        display_name: name.to_string(),
        is_seller: false,
        is_staff,
        joined_at: Utc::now(),
    };
    db.upsert_user(&user).unwrap();
    user
}

pub(crate) fn ad(db: &Database, id: i64, seller: i64, available: bool) -> Ad {
    let ad = Ad {
        id: AdId(id),
        seller: UserId(seller),
        title: format!("Ad #{id}"),
        available,
        created_at: Utc::now(),
    };
    db.upsert_ad(&ad).unwrap();
    ad
}
