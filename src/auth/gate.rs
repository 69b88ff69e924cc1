//! Role checks and the comment mutation gate.

use std::sync::Arc;

use crate::models::{Comment, CurrentUser};
use crate::store::{read_record, wiki_db_name, DocumentStore};

/// Global role that may administer every wiki.
pub const MASTER_ROLE: &str = "master";

/// Exact, case-sensitive role membership.
pub fn has_role(roles: &[String], role_name: &str) -> bool {
    roles.iter().any(|r| r == role_name)
}

/// Admin role scoped to one namespace (a wiki id or the main namespace).
pub fn admin_role(scope: &str) -> String {
    format!("{}:admin", scope)
}

/// Decides whether a principal may mutate an entity.
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn DocumentStore>,
    main_db_name: String,
}

impl AccessGate {
    pub fn new(store: Arc<dyn DocumentStore>, main_db_name: impl Into<String>) -> Self {
        Self {
            store,
            main_db_name: main_db_name.into(),
        }
    }

    /// Whether the principal administers `wiki`, the main namespace, or everything.
    pub fn is_admin(&self, wiki: &str, principal: &CurrentUser) -> bool {
        let roles = &principal.user.roles;
        has_role(roles, &admin_role(wiki))
            || has_role(roles, &admin_role(&self.main_db_name))
            || has_role(roles, MASTER_ROLE)
    }

    /// Only the comment's author or an admin may update or delete it. Fails
    /// closed when the comment cannot be read. Never cached: role changes take
    /// effect on the next call.
    pub async fn allowed_to_update_comment(
        &self,
        wiki: &str,
        comment_id: &str,
        principal: &CurrentUser,
    ) -> bool {
        let comment: Comment =
            match read_record(self.store.as_ref(), &wiki_db_name(wiki), comment_id).await {
                Ok(comment) => comment,
                Err(e) => {
                    tracing::debug!(wiki, comment_id, error = %e, "Comment unreadable, denying");
                    return false;
                }
            };

        let allowed = comment.author == principal.username() || self.is_admin(wiki, principal);
        tracing::debug!(
            wiki,
            comment_id,
            user = principal.username(),
            allowed,
            "Comment update authorization"
        );
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAIN_DB;
    use crate::store::{write_record, SqliteDocumentStore};
    use tempfile::TempDir;

    async fn gate_with_comment(author: &str) -> (AccessGate, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteDocumentStore::open(&temp_dir.path().join("gate.sqlite"))
            .await
            .unwrap();
        let comment = Comment {
            id: "c1".into(),
            page_id: "p1".into(),
            author: author.into(),
            ..Default::default()
        };
        write_record(&store, "wiki_w1", "c1", "", &comment)
            .await
            .unwrap();
        (AccessGate::new(Arc::new(store), DEFAULT_MAIN_DB), temp_dir)
    }

    fn user(name: &str, roles: &[&str]) -> CurrentUser {
        CurrentUser::new(name, roles.iter().map(|r| r.to_string()).collect())
    }

    #[test]
    fn test_role_helpers() {
        let roles = vec!["w1:admin".to_string(), "master".to_string()];
        assert!(has_role(&roles, "master"));
        assert!(!has_role(&roles, "Master"));
        assert_eq!(admin_role("w1"), "w1:admin");
    }

    #[tokio::test]
    async fn test_author_allowed() {
        let (gate, _dir) = gate_with_comment("alice").await;
        assert!(gate.allowed_to_update_comment("w1", "c1", &user("alice", &[])).await);
    }

    #[tokio::test]
    async fn test_admins_allowed() {
        let (gate, _dir) = gate_with_comment("alice").await;
        for role in ["w1:admin", "wikifeat_main_db:admin", "master"] {
            assert!(
                gate.allowed_to_update_comment("w1", "c1", &user("bob", &[role]))
                    .await,
                "{role} should be allowed"
            );
        }
    }

    #[tokio::test]
    async fn test_other_users_denied() {
        let (gate, _dir) = gate_with_comment("alice").await;
        let bob = user("bob", &["w2:admin", "w1:reader", "Master"]);
        assert!(!gate.allowed_to_update_comment("w1", "c1", &bob).await);
    }

    #[tokio::test]
    async fn test_missing_comment_fails_closed() {
        let (gate, _dir) = gate_with_comment("alice").await;
        let master = user("root", &["master"]);
        assert!(!gate.allowed_to_update_comment("w1", "nope", &master).await);
        assert!(!gate.allowed_to_update_comment("w9", "c1", &master).await);
    }
}
