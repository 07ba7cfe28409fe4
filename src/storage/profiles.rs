//! Profile operations

use rusqlite::{params, OptionalExtension};

use crate::storage::engine::{now, StorageEngine};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::rows::{self, encode_list, PROFILE_COLUMNS};
use crate::storage::types::{NewProfile, Profile, ProfileUpdate, Role};

impl StorageEngine {
    /// Register a profile for `user_id`
    pub async fn create_profile(&self, user_id: &str, input: NewProfile) -> StorageResult<Profile> {
        let conn = self.connection()?;
        let ts = now();

        let inserted = conn.execute(
            "INSERT INTO profiles (id, full_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO NOTHING",
            params![user_id, input.full_name, input.role.as_str(), ts],
        )?;
        if inserted == 0 {
            return Err(StorageError::Conflict(format!(
                "profile already exists: {}",
                user_id
            )));
        }

        tracing::debug!(user_id, role = input.role.as_str(), "Created profile");

        let profile = conn.query_row(
            &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
            [user_id],
            rows::profile,
        )?;
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> StorageResult<Option<Profile>> {
        let conn = self.connection()?;
        let profile = conn
            .query_row(
                &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
                [user_id],
                rows::profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Apply a partial update; absent fields keep their stored value
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> StorageResult<Profile> {
        let conn = self.connection()?;

        let restrictions = match &update.dietary_restrictions {
            Some(list) => Some(encode_list(list)?.unwrap_or_else(|| "[]".to_string())),
            None => None,
        };

        let changed = conn.execute(
            "UPDATE profiles SET
                full_name = COALESCE(?2, full_name),
                age = COALESCE(?3, age),
                height_cm = COALESCE(?4, height_cm),
                weight_kg = COALESCE(?5, weight_kg),
                activity_level = COALESCE(?6, activity_level),
                dietary_restrictions = COALESCE(?7, dietary_restrictions),
                updated_at = ?8
             WHERE id = ?1",
            params![
                user_id,
                update.full_name,
                update.age,
                update.height_cm,
                update.weight_kg,
                update.activity_level,
                restrictions,
                now(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Profile", user_id));
        }

        let profile = conn.query_row(
            &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
            [user_id],
            rows::profile,
        )?;
        Ok(profile)
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> StorageResult<()> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE profiles SET role = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, role.as_str(), now()],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Profile", user_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(name: &str) -> NewProfile {
        NewProfile {
            full_name: name.to_string(),
            role: Role::Client,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_profile() {
        let engine = StorageEngine::in_memory().await.unwrap();

        let created = engine.create_profile("u1", new_profile("Grace")).await.unwrap();
        assert_eq!(created.id, "u1");
        assert_eq!(created.role, Role::Client);
        assert!(created.is_active);
        assert!(created.dietary_restrictions.is_empty());

        let fetched = engine.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(engine.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_profile_conflicts() {
        let engine = StorageEngine::in_memory().await.unwrap();
        engine.create_profile("u1", new_profile("Grace")).await.unwrap();

        let err = engine
            .create_profile("u1", new_profile("Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let engine = StorageEngine::in_memory().await.unwrap();
        engine.create_profile("u1", new_profile("Grace")).await.unwrap();

        let updated = engine
            .update_profile(
                "u1",
                ProfileUpdate {
                    age: Some(34),
                    dietary_restrictions: Some(vec!["vegetarian".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Grace");
        assert_eq!(updated.age, Some(34));
        assert_eq!(updated.height_cm, None);
        assert_eq!(updated.dietary_restrictions, vec!["vegetarian".to_string()]);
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let engine = StorageEngine::in_memory().await.unwrap();
        let err = engine
            .update_profile("ghost", ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_role() {
        let engine = StorageEngine::in_memory().await.unwrap();
        engine.create_profile("u1", new_profile("Grace")).await.unwrap();
        engine.set_role("u1", Role::Admin).await.unwrap();

        assert!(engine.get_profile("u1").await.unwrap().unwrap().is_admin());
    }
}
