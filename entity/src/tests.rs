//! # 实体定义测试

use crate::{provider_links, users};
use sea_orm::Set;

#[test]
fn test_user_active_model_without_password() {
    let user = users::ActiveModel {
        email: Set("a@x.com".to_string()),
        password_hash: Set(None),
        full_name: Set("Ada".to_string()),
        role: Set("freelancer".to_string()),
        is_active: Set(true),
        ..Default::default()
    };

    assert_eq!(user.email.as_ref(), "a@x.com");
    assert_eq!(user.password_hash.as_ref(), &None);
    assert_eq!(user.is_active.as_ref(), &true);
}

#[test]
fn test_link_serialization_hides_credentials() {
    let now = chrono::Utc::now().naive_utc();
    let link = provider_links::Model {
        id: 1,
        user_id: 7,
        provider: "google".to_string(),
        external_id: "g-42".to_string(),
        email: "a@x.com".to_string(),
        access_token: "ciphertext".to_string(),
        refresh_token: Some("ciphertext-2".to_string()),
        token_expires_at: None,
        is_verified: true,
        profile_data: "{}".to_string(),
        created_at: now,
        updated_at: now,
    };

    let json = serde_json::to_value(&link).unwrap();
    assert!(json.get("access_token").is_none());
    assert!(json.get("refresh_token").is_none());
    assert_eq!(json["external_id"], "g-42");
}
