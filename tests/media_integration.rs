use biblio_core::error::BiblioError;
use biblio_core::media::{MediaStore, MediaUpload};
use std::fs;
use tempfile::TempDir;

#[test]
fn stored_covers_keep_their_extension_and_differ() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let media = MediaStore::new(tmp.path())?;

    let first = media.store_cover(&MediaUpload::new(vec![1, 2, 3], "JPG"))?;
    let second = media.store_cover(&MediaUpload::new(vec![1, 2, 3], "png"))?;

    assert!(first.ends_with(".jpg"));
    assert!(second.ends_with(".png"));
    assert_ne!(first, second);

    assert_eq!(fs::read(media.cover_path(&first))?, vec![1, 2, 3]);

    Ok(())
}

#[test]
fn unsupported_extension_is_a_validation_failure() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let media = MediaStore::new(tmp.path())?;

    let result = media.store_cover(&MediaUpload::new(vec![1, 2, 3], "svg"));
    match result {
        Err(BiblioError::Validation(violations)) => {
            assert!(
                violations
                    .as_slice()
                    .iter()
                    .any(|v| v.field == "cover_image")
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    Ok(())
}

#[test]
fn oversized_upload_is_a_validation_failure() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let media = MediaStore::new(tmp.path())?;

    let too_big = vec![0u8; 2 * 1024 * 1024 + 1];
    let result = media.store_profile_picture(&MediaUpload::new(too_big, "jpg"));
    assert!(matches!(result, Err(BiblioError::Validation(_))));

    Ok(())
}

#[test]
fn removing_a_missing_file_is_not_an_error() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let media = MediaStore::new(tmp.path())?;

    let name = media.store_cover(&MediaUpload::new(vec![9, 9], "gif"))?;
    media.remove_cover(&name)?;
    assert!(!media.cover_path(&name).exists());

    // already gone: still fine
    media.remove_cover(&name)?;
    media.remove_profile_picture("never-stored.png")?;

    Ok(())
}
