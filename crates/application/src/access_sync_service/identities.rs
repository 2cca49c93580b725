use std::collections::HashMap;

use schemabridge_core::AppError;
use schemabridge_domain::{ALL_USERS_GROUP, PersonName, Role, is_reserved_group};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::*;

impl AccessSyncService {
    pub(super) async fn create_missing_groups(
        &self,
        roles: &[Role],
        groups: &mut BTreeMap<String, i64>,
        report: &mut AccessSyncReport,
    ) -> AppResult<()> {
        for role in roles {
            if groups.contains_key(role.name()) {
                continue;
            }

            info!(group = %role.name(), "creating group");
            let created = self
                .target_api
                .post(GROUPS_PATH, Some(json!({ "name": role.name() })))
                .await?;
            let group: TargetGroup = serde_json::from_value(created).map_err(|error| {
                AppError::Internal(format!(
                    "unexpected group payload for '{}': {error}",
                    role.name()
                ))
            })?;
            groups.insert(group.name, group.id);
            report.groups_created += 1;
        }

        Ok(())
    }

    pub(super) async fn upsert_role_members(
        &self,
        roles: &[Role],
        groups: &BTreeMap<String, i64>,
        users: &[TargetUser],
        report: &mut AccessSyncReport,
    ) -> AppResult<HashSet<String>> {
        let all_users_group = group_id(groups, ALL_USERS_GROUP)?;
        let known: HashMap<&str, &TargetUser> = users
            .iter()
            .map(|user| (user.email.as_str(), user))
            .collect();
        let mut mirrored = HashSet::new();

        for role in roles {
            let role_group = group_id(groups, role.name())?;
            for email in role.mirrored_members() {
                mirrored.insert(email.to_owned());
                let payload = match user_payload(email, role, role_group, all_users_group) {
                    Ok(payload) => payload,
                    Err(error) => {
                        warn!(email = %email, role = %role.name(), error = %error, "skipping member");
                        report.members_skipped += 1;
                        continue;
                    }
                };

                match known.get(email) {
                    Some(user) => {
                        if !user.is_active {
                            info!(email = %email, "reactivating user");
                            self.target_api
                                .put(&format!("{USERS_PATH}/{}/reactivate", user.id), json!({}))
                                .await?;
                            report.users_reactivated += 1;
                        }
                        debug!(email = %email, role = %role.name(), "updating user");
                        self.target_api
                            .put(&format!("{USERS_PATH}/{}", user.id), payload)
                            .await?;
                        report.users_updated += 1;
                    }
                    None => {
                        info!(email = %email, role = %role.name(), "creating user");
                        self.target_api.post(USERS_PATH, Some(payload)).await?;
                        report.users_created += 1;
                    }
                }
            }
        }

        Ok(mirrored)
    }

    pub(super) async fn delete_orphaned_groups(
        &self,
        roles: &[Role],
        groups: &mut BTreeMap<String, i64>,
        report: &mut AccessSyncReport,
    ) -> AppResult<()> {
        let role_names: HashSet<&str> = roles.iter().map(Role::name).collect();
        let orphaned: Vec<(String, i64)> = groups
            .iter()
            .filter(|(name, _)| !is_reserved_group(name.as_str()) && !role_names.contains(name.as_str()))
            .map(|(name, id)| (name.clone(), *id))
            .collect();

        for (name, id) in orphaned {
            info!(group = %name, "deleting group");
            self.target_api
                .delete(&format!("{GROUPS_PATH}/{id}"))
                .await?;
            groups.remove(&name);
            report.groups_deleted += 1;
        }

        Ok(())
    }

    pub(super) async fn delete_orphaned_users(
        &self,
        mirrored: &HashSet<String>,
        users: &[TargetUser],
        report: &mut AccessSyncReport,
    ) -> AppResult<()> {
        for user in users {
            if !user.is_active
                || user.email == self.options.admin_email
                || mirrored.contains(&user.email)
            {
                continue;
            }

            info!(email = %user.email, "deactivating user");
            self.target_api
                .delete(&format!("{USERS_PATH}/{}", user.id))
                .await?;
            report.users_deleted += 1;
        }

        Ok(())
    }
}

fn group_id(groups: &BTreeMap<String, i64>, name: &str) -> AppResult<i64> {
    groups
        .get(name)
        .copied()
        .ok_or_else(|| AppError::NotFound(format!("group '{name}' does not exist in the target")))
}

fn user_payload(email: &str, role: &Role, role_group: i64, all_users_group: i64) -> AppResult<Value> {
    let name = PersonName::from_email(email)?;

    Ok(json!({
        "email": email,
        "first_name": name.first_name,
        "last_name": name.last_name,
        "is_superuser": role.grants_superuser(),
        "google_auth": true,
        "group_ids": [role_group, all_users_group],
    }))
}

#[cfg(test)]
mod payload_tests {
    use schemabridge_core::{AppError, AppResult};
    use schemabridge_domain::Role;
    use serde_json::json;

    use super::user_payload;

    #[test]
    fn analyst_payload_matches_target_shape() -> AppResult<()> {
        let role = Role::new("Analysts", vec!["jane.doe@example.com".to_owned()])?;

        let payload = user_payload("jane.doe@example.com", &role, 5, 1)?;
        assert_eq!(
            payload,
            json!({
                "email": "jane.doe@example.com",
                "first_name": "Jane",
                "last_name": "Doe",
                "is_superuser": false,
                "google_auth": true,
                "group_ids": [5, 1],
            })
        );
        Ok(())
    }

    #[test]
    fn administrators_are_superusers() -> AppResult<()> {
        let role = Role::new("Administrators", Vec::new())?;

        let payload = user_payload("ops@example.com", &role, 2, 1)?;
        assert_eq!(payload["is_superuser"], json!(true));
        assert_eq!(payload["first_name"], json!("Ops"));
        assert_eq!(payload["last_name"], json!("Example"));
        Ok(())
    }

    #[test]
    fn identity_without_email_shape_is_rejected() -> AppResult<()> {
        let role = Role::new("Analysts", Vec::new())?;

        assert!(matches!(
            user_payload("jane", &role, 5, 1),
            Err(AppError::Validation(_))
        ));
        Ok(())
    }
}
