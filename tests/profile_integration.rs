use biblio_core::auth::Principal;
use biblio_core::db::Database;
use biblio_core::error::BiblioError;
use biblio_core::media::{MediaStore, MediaUpload};
use biblio_core::profile::manager::{PasswordChange, ProfileManager, ProfileUpdate};
use tempfile::TempDir;

async fn setup(tmp: &TempDir) -> Result<(ProfileManager, MediaStore), BiblioError> {
    let db = Database::open(&tmp.path().join("test.db")).await?;
    let media = MediaStore::new(tmp.path().join("media"))?;
    Ok((ProfileManager::new(db.pool().clone(), media.clone()), media))
}

fn plain_update(name: &str, email: &str) -> ProfileUpdate {
    ProfileUpdate {
        name: name.to_string(),
        email: email.to_string(),
        profile_picture: None,
        password: None,
    }
}

#[tokio::test]
async fn register_and_authenticate() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    let user = profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    assert_eq!(user.name, "Alice");

    let authed = profiles
        .authenticate("alice@example.com", "secret-password")
        .await?;
    assert_eq!(authed.id, user.id);

    let found = profiles.find_by_email("alice@example.com").await?;
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert!(profiles.find_by_email("nobody@example.com").await?.is_none());

    let wrong = profiles.authenticate("alice@example.com", "not-it").await;
    assert!(matches!(wrong, Err(BiblioError::Forbidden(_))));

    let unknown = profiles
        .authenticate("nobody@example.com", "secret-password")
        .await;
    assert!(matches!(unknown, Err(BiblioError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn registering_a_taken_email_is_a_duplicate() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let result = profiles
        .register("Impostor", "alice@example.com", "other-password")
        .await;
    assert!(matches!(result, Err(BiblioError::Duplicate(_))));

    Ok(())
}

#[tokio::test]
async fn registration_reports_all_violations() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    let result = profiles.register("", "not-an-email", "short").await;
    match result {
        Err(BiblioError::Validation(violations)) => {
            let fields: Vec<_> = violations.as_slice().iter().map(|v| v.field).collect();
            assert!(fields.contains(&"name"));
            assert!(fields.contains(&"email"));
            assert!(fields.contains(&"password"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn update_profile_changes_name_and_email() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    let user = profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let me = Principal::member(user.id);

    let updated = profiles
        .update_profile(&me, plain_update("Alice Cooper", "cooper@example.com"))
        .await?;
    assert_eq!(updated.name, "Alice Cooper");
    assert_eq!(updated.email, "cooper@example.com");

    Ok(())
}

#[tokio::test]
async fn update_profile_rejects_an_email_in_use() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let bob = profiles
        .register("Bob", "bob@example.com", "secret-password")
        .await?;

    let result = profiles
        .update_profile(
            &Principal::member(bob.id),
            plain_update("Bob", "alice@example.com"),
        )
        .await;
    match result {
        Err(BiblioError::Validation(violations)) => {
            assert!(violations.as_slice().iter().any(|v| v.field == "email"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    // keeping your own email is fine
    profiles
        .update_profile(&Principal::member(bob.id), plain_update("Bobby", "bob@example.com"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn password_change_requires_the_current_password() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    let user = profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let me = Principal::member(user.id);

    let mut update = plain_update("Renamed", "alice@example.com");
    update.password = Some(PasswordChange {
        current_password: "wrong-password".to_string(),
        new_password: "another-password".to_string(),
    });
    let result = profiles.update_profile(&me, update).await;
    assert!(matches!(result, Err(BiblioError::Forbidden(_))));

    // nothing was applied, not even the rename
    let unchanged = profiles.get(user.id).await?;
    assert_eq!(unchanged.name, "Alice");

    Ok(())
}

#[tokio::test]
async fn password_change_rehashes_the_credential() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, _media) = setup(&tmp).await?;

    let user = profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let me = Principal::member(user.id);

    let mut update = plain_update("Alice", "alice@example.com");
    update.password = Some(PasswordChange {
        current_password: "secret-password".to_string(),
        new_password: "brand-new-password".to_string(),
    });
    profiles.update_profile(&me, update).await?;

    profiles
        .authenticate("alice@example.com", "brand-new-password")
        .await?;
    let stale = profiles
        .authenticate("alice@example.com", "secret-password")
        .await;
    assert!(matches!(stale, Err(BiblioError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn replacing_the_profile_picture_deletes_the_old_file() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let (profiles, media) = setup(&tmp).await?;

    let user = profiles
        .register("Alice", "alice@example.com", "secret-password")
        .await?;
    let me = Principal::member(user.id);

    let mut first = plain_update("Alice", "alice@example.com");
    first.profile_picture = Some(MediaUpload::new(vec![1, 2, 3], "png"));
    let with_picture = profiles.update_profile(&me, first).await?;
    let old_name = with_picture.profile_picture.expect("picture stored");
    assert!(media.picture_path(&old_name).exists());

    let mut second = plain_update("Alice", "alice@example.com");
    second.profile_picture = Some(MediaUpload::new(vec![4, 5, 6], "gif"));
    let replaced = profiles.update_profile(&me, second).await?;
    let new_name = replaced.profile_picture.expect("picture replaced");

    assert_ne!(new_name, old_name);
    assert!(media.picture_path(&new_name).exists());
    assert!(!media.picture_path(&old_name).exists());

    Ok(())
}

#[test]
fn a_missing_session_maps_to_authentication_required() {
    let result = Principal::require(None);
    assert!(matches!(result, Err(BiblioError::AuthenticationRequired)));

    let me = Principal::member(7);
    let passed = Principal::require(Some(&me)).unwrap();
    assert_eq!(passed.user_id, 7);
}
