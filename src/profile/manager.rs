use crate::auth::Principal;
use crate::error::{BiblioError, BiblioResult, Violations};
use crate::media::{MediaStore, MediaUpload};
use crate::profile::storage::{ProfileStorage, User};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use sqlx::SqlitePool;

const MAX_TEXT_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

/// A requested password change. The current password must verify
/// against the stored hash before the new one is accepted.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// The editable profile fields, submitted together.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub profile_picture: Option<MediaUpload>,
    pub password: Option<PasswordChange>,
}

/// Account registration and profile maintenance.
pub struct ProfileManager {
    users: ProfileStorage,
    media: MediaStore,
}

impl ProfileManager {
    pub fn new(pool: SqlitePool, media: MediaStore) -> Self {
        Self {
            users: ProfileStorage::new(pool),
            media,
        }
    }

    /// Creates an account with an argon2id credential hash. A taken
    /// email surfaces as [`BiblioError::Duplicate`].
    pub async fn register(&self, name: &str, email: &str, password: &str) -> BiblioResult<User> {
        let mut violations = Violations::new();
        check_name(&mut violations, name);
        check_email(&mut violations, email);
        if password.chars().count() < MIN_PASSWORD_LEN {
            violations.add("password", "must be at least 8 characters");
        }
        violations.into_result()?;

        let hash = hash_password(password)?;
        let user = self.users.insert(name.trim(), email.trim(), &hash).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Resolves credentials to a user. Unknown email and wrong password
    /// fail identically so callers cannot probe for accounts.
    pub async fn authenticate(&self, email: &str, password: &str) -> BiblioResult<User> {
        let denied = || BiblioError::Forbidden("invalid credentials".to_string());

        let user = self.users.find_by_email(email).await?.ok_or_else(denied)?;
        let hash = self.users.password_hash(user.id).await?;

        if verify_password(&hash, password)? {
            Ok(user)
        } else {
            Err(denied())
        }
    }

    pub async fn get(&self, user_id: i64) -> BiblioResult<User> {
        self.users
            .user(user_id)
            .await?
            .ok_or(BiblioError::NotFound("user"))
    }

    /// Looks a user up by email, for host login flows.
    pub async fn find_by_email(&self, email: &str) -> BiblioResult<Option<User>> {
        self.users.find_by_email(email).await
    }

    /// Applies a profile update for the caller.
    ///
    /// All field violations are reported together. A password change
    /// requires the correct current password; on a wrong one the whole
    /// update fails with no field applied. A replacement picture is
    /// written before the row commits and the old file removed after.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> BiblioResult<User> {
        let user = self
            .users
            .user(principal.user_id)
            .await?
            .ok_or(BiblioError::NotFound("user"))?;

        let mut violations = Violations::new();
        check_name(&mut violations, &update.name);
        check_email(&mut violations, &update.email);
        if self.users.email_taken(update.email.trim(), user.id).await? {
            violations.add("email", "is already in use");
        }
        if let Some(upload) = &update.profile_picture {
            upload.check("profile_picture", &mut violations);
        }
        if let Some(change) = &update.password {
            if change.new_password.chars().count() < MIN_PASSWORD_LEN {
                violations.add("password", "must be at least 8 characters");
            }
        }
        violations.into_result()?;

        if let Some(change) = &update.password {
            let hash = self.users.password_hash(user.id).await?;
            if !verify_password(&hash, &change.current_password)? {
                return Err(BiblioError::Forbidden(
                    "current password is incorrect".to_string(),
                ));
            }
        }

        let replacement = match &update.profile_picture {
            Some(upload) => Some(self.media.store_profile_picture(upload)?),
            None => None,
        };
        let picture = replacement.as_deref().or(user.profile_picture.as_deref());

        let updated = self
            .users
            .update(user.id, update.name.trim(), update.email.trim(), picture)
            .await?;

        if let Some(change) = &update.password {
            let new_hash = hash_password(&change.new_password)?;
            self.users.set_password_hash(user.id, &new_hash).await?;
        }

        if replacement.is_some() {
            if let Some(old) = &user.profile_picture {
                self.media.remove_profile_picture(old)?;
            }
        }

        tracing::info!(user_id = user.id, "profile updated");
        Ok(updated)
    }
}

fn check_name(violations: &mut Violations, name: &str) {
    if name.trim().is_empty() {
        violations.add("name", "must not be empty");
    }
    if name.chars().count() > MAX_TEXT_LEN {
        violations.add("name", "must be at most 255 characters");
    }
}

fn check_email(violations: &mut Violations, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        violations.add("email", "must not be empty");
        return;
    }
    if email.chars().count() > MAX_TEXT_LEN {
        violations.add("email", "must be at most 255 characters");
    }
    if !valid_email(email) {
        violations.add("email", "must be a valid email address");
    }
}

/// Structural check only: a non-empty local part and a dotted domain.
fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn hash_password(password: &str) -> BiblioResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BiblioError::Other(format!("password hashing failed: {e}")))
}

fn verify_password(hash: &str, candidate: &str) -> BiblioResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| BiblioError::Other(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}
