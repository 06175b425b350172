use model::entities::{prelude::*, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{BookingError, Result, is_unique_violation};
use crate::password::PasswordHashing;

pub const DEFAULT_ROLE: &str = "USER";

/// Registration input. The password is plaintext here and never leaves
/// [`UserService::register`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// Partial profile update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl UserPatch {
    /// The requested new password, ignoring empty strings.
    fn password_change(&self) -> Option<&str> {
        self.new_password.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct UserService {
    db: DatabaseConnection,
    hashing: PasswordHashing,
}

impl UserService {
    pub fn new(db: DatabaseConnection, hashing: PasswordHashing) -> Self {
        Self { db, hashing }
    }

    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn register(&self, new_user: NewUser) -> Result<user::Model> {
        if self.username_taken(&new_user.username).await? {
            warn!("Username already exists");
            return Err(BookingError::Duplicate("Username already exists".to_string()));
        }
        if self.email_taken(&new_user.email).await? {
            warn!("Email already exists");
            return Err(BookingError::Duplicate("Email already exists".to_string()));
        }

        let password_hash = self.hashing.hash(&new_user.password)?;
        let role = new_user
            .role
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let created = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(password_hash),
            full_name: Set(new_user.full_name),
            phone_number: Set(new_user.phone_number),
            address: Set(new_user.address),
            role: Set(role),
            active: Set(true),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::Duplicate("Username or email already exists".to_string())
            } else {
                BookingError::from(e)
            }
        })?;

        info!(user_id = created.id, "User registered");
        Ok(created)
    }

    /// Verifies credentials. Every failure is reported as the same
    /// `Auth` error so callers cannot tell which usernames exist.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<user::Model> {
        let invalid = || BookingError::Auth("Invalid credentials".to_string());

        let Some(found) = self.find_by_username(username).await? else {
            debug!("Unknown username");
            return Err(invalid());
        };
        if !self.hashing.verify(password, &found.password_hash)? {
            debug!(user_id = found.id, "Password mismatch");
            return Err(invalid());
        }
        if !found.active {
            warn!(user_id = found.id, "Login attempt on inactive account");
            return Err(invalid());
        }

        info!(user_id = found.id, "User authenticated");
        Ok(found)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<user::Model>> {
        Ok(User::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i32, patch: UserPatch) -> Result<user::Model> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound("User not found".to_string()))?;

        if let Some(email) = patch.email.as_deref() {
            if email != existing.email && self.email_taken(email).await? {
                warn!("Email already exists");
                return Err(BookingError::Duplicate("Email already exists".to_string()));
            }
        }

        let new_hash = match patch.password_change() {
            Some(new_password) => {
                let current = patch
                    .current_password
                    .as_deref()
                    .ok_or_else(|| BookingError::Auth("Current password is required".to_string()))?;
                if !self.hashing.verify(current, &existing.password_hash)? {
                    warn!("Current password mismatch on password change");
                    return Err(BookingError::Auth(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(self.hashing.hash(new_password)?)
            }
            None => None,
        };

        let mut active: user::ActiveModel = existing.into();
        if let Some(full_name) = patch.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(phone_number) = patch.phone_number {
            active.phone_number = Set(Some(phone_number));
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(hash) = new_hash {
            debug!("Password changed");
            active.password_hash = Set(hash);
        }

        let updated = active.update(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::Duplicate("Email already exists".to_string())
            } else {
                BookingError::from(e)
            }
        })?;
        info!(user_id = updated.id, "User updated");
        Ok(updated)
    }

    /// Refuses to delete users that still own appointments.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<()> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound("User not found".to_string()))?;

        let owned = existing.find_related(Appointment).count(&self.db).await?;
        if owned > 0 {
            warn!(appointments = owned, "User still owns appointments");
            return Err(BookingError::HasAppointments(
                "User has existing appointments".to_string(),
            ));
        }

        existing.delete(&self.db).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        let count = User::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::entities::appointment;

    use super::*;
    use crate::testing::{setup_db, test_users};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password: "secret1".to_string(),
            full_name: Some("Test Person".to_string()),
            phone_number: None,
            address: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password_and_sets_defaults() {
        let users = test_users(setup_db().await);

        let created = users.register(new_user("alice")).await.unwrap();

        assert_eq!(created.role, DEFAULT_ROLE);
        assert!(created.active);
        assert_ne!(created.password_hash, "secret1");
        assert!(created.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let users = test_users(setup_db().await);
        users.register(new_user("alice")).await.unwrap();

        let same_name = users.register(new_user("alice")).await;
        assert!(matches!(same_name, Err(BookingError::Duplicate(ref m)) if m == "Username already exists"));

        let mut same_email = new_user("bob");
        same_email.email = "alice@clinic.test".to_string();
        let same_email = users.register(same_email).await;
        assert!(matches!(same_email, Err(BookingError::Duplicate(ref m)) if m == "Email already exists"));

        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = test_users(setup_db().await);
        let created = users.register(new_user("alice")).await.unwrap();

        let found = users.authenticate("alice", "secret1").await.unwrap();
        assert_eq!(found.id, created.id);

        assert!(matches!(
            users.authenticate("alice", "wrong").await,
            Err(BookingError::Auth(_))
        ));
        assert!(matches!(
            users.authenticate("nobody", "secret1").await,
            Err(BookingError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_new_password_without_current_is_rejected() {
        let users = test_users(setup_db().await);
        let created = users.register(new_user("alice")).await.unwrap();

        let result = users
            .update(
                created.id,
                UserPatch {
                    new_password: Some("another1".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BookingError::Auth(_))));

        let stored = users.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, created.password_hash);
        assert!(users.authenticate("alice", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_password_change_with_current_password() {
        let users = test_users(setup_db().await);
        let created = users.register(new_user("alice")).await.unwrap();

        let wrong = users
            .update(
                created.id,
                UserPatch {
                    current_password: Some("nope".to_string()),
                    new_password: Some("another1".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(wrong, Err(BookingError::Auth(_))));

        users
            .update(
                created.id,
                UserPatch {
                    current_password: Some("secret1".to_string()),
                    new_password: Some("another1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(users.authenticate("alice", "another1").await.is_ok());
        assert!(users.authenticate("alice", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_new_password_is_ignored() {
        let users = test_users(setup_db().await);
        let created = users.register(new_user("alice")).await.unwrap();

        let updated = users
            .update(
                created.id,
                UserPatch {
                    address: Some("1 Main St".to_string()),
                    new_password: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.address.as_deref(), Some("1 Main St"));
        assert_eq!(updated.password_hash, created.password_hash);
        assert_eq!(updated.full_name, created.full_name);
    }

    #[tokio::test]
    async fn test_email_change_checks_uniqueness() {
        let users = test_users(setup_db().await);
        let alice = users.register(new_user("alice")).await.unwrap();
        users.register(new_user("bob")).await.unwrap();

        let taken = users
            .update(
                alice.id,
                UserPatch {
                    email: Some("bob@clinic.test".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(BookingError::Duplicate(_))));

        // Re-submitting the current email is not a conflict
        let same = users
            .update(
                alice.id,
                UserPatch {
                    email: Some("alice@clinic.test".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.email, "alice@clinic.test");
    }

    #[tokio::test]
    async fn test_delete() {
        let users = test_users(setup_db().await);
        let created = users.register(new_user("alice")).await.unwrap();

        users.delete(created.id).await.unwrap();
        assert!(users.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            users.delete(created.id).await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_user_with_appointments_is_refused() {
        let db = setup_db().await;
        let users = test_users(db.clone());
        let created = users.register(new_user("alice")).await.unwrap();
        let now = Utc::now().naive_utc();
        appointment::ActiveModel {
            user_id: Set(created.id),
            patient_name: Set("Jane Roe".to_string()),
            appointment_date: Set(now),
            doctor_name: Set("Dr. Lee".to_string()),
            status: Set(AppointmentStatus::Completed),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let refused = users.delete(created.id).await;
        assert!(matches!(
            refused,
            Err(BookingError::HasAppointments(ref m)) if m == "User has existing appointments"
        ));
        assert!(users.find_by_id(created.id).await.unwrap().is_some());
    }
}
