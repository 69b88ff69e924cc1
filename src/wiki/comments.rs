//! Comment lifecycle: save, read, delete and paged listing.

use std::sync::Arc;

use super::Wiki;
use crate::auth::AccessGate;
use crate::errors::AppError;
use crate::models::{Comment, CommentIndexPage, CurrentUser, Paging};
use crate::render::Renderer;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct CommentManager {
    store: Arc<dyn DocumentStore>,
    gate: AccessGate,
    renderer: Renderer,
}

impl CommentManager {
    pub fn new(store: Arc<dyn DocumentStore>, gate: AccessGate, renderer: Renderer) -> Self {
        Self {
            store,
            gate,
            renderer,
        }
    }

    fn wiki(&self, wiki_id: &str) -> Wiki<'_> {
        Wiki::select(self.store.as_ref(), wiki_id)
    }

    /// Create (empty `comment_rev`) or update a comment. Updates are only
    /// allowed for the author or an admin.
    pub async fn save(
        &self,
        wiki_id: &str,
        page_id: &str,
        comment: &mut Comment,
        comment_id: &str,
        comment_rev: &str,
        user: &CurrentUser,
    ) -> Result<String, AppError> {
        if !comment_rev.is_empty()
            && !self
                .gate
                .allowed_to_update_comment(wiki_id, comment_id, user)
                .await
        {
            return Err(forbidden(comment_id, user));
        }

        comment.content.formatted = self.renderer.render(comment.content.raw.clone()).await;
        self.wiki(wiki_id)
            .save_comment(comment, comment_id, comment_rev, page_id, user.username())
            .await
    }

    pub async fn read(&self, wiki_id: &str, comment_id: &str) -> Result<Comment, AppError> {
        self.wiki(wiki_id).read_comment(comment_id).await
    }

    /// Delete a comment at its current revision, read just before the delete.
    pub async fn delete(
        &self,
        wiki_id: &str,
        comment_id: &str,
        user: &CurrentUser,
    ) -> Result<String, AppError> {
        if !self
            .gate
            .allowed_to_update_comment(wiki_id, comment_id, user)
            .await
        {
            return Err(forbidden(comment_id, user));
        }

        let wiki = self.wiki(wiki_id);
        let current = wiki.read_comment(comment_id).await?;
        wiki.delete_comment(comment_id, &current.rev).await
    }

    /// One page of the comments on `page_id`, oldest first.
    pub async fn list(
        &self,
        wiki_id: &str,
        page_id: &str,
        page_num: i64,
        num_per_page: i64,
    ) -> Result<CommentIndexPage, AppError> {
        let paging = Paging::new(page_num, num_per_page)?;
        self.wiki(wiki_id).comments_for_page(page_id, paging).await
    }
}

fn forbidden(comment_id: &str, user: &CurrentUser) -> AppError {
    tracing::warn!(comment_id, user = user.username(), "Comment mutation denied");
    AppError::Forbidden(format!(
        "{} may not modify comment {}",
        user.username(),
        comment_id
    ))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Content, Page};
    use crate::store::RecordingStore;
    use crate::wiki::{PageManager, WikiDirectory};

    struct Fixture {
        comments: CommentManager,
        store: Arc<RecordingStore>,
        page_id: String,
        alice: CurrentUser,
        _temp_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            RecordingStore::open(&temp_dir.path().join("comments.sqlite"))
                .await
                .unwrap(),
        );
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let renderer = Renderer::default();
        let alice = CurrentUser::new("alice", vec![]);

        let pages = PageManager::new(
            dyn_store.clone(),
            WikiDirectory::new(dyn_store.clone(), "main"),
            renderer,
        );
        let mut page = Page {
            title: "Discussed".into(),
            ..Default::default()
        };
        pages.save("w1", &mut page, "", "", &alice).await.unwrap();

        Fixture {
            comments: CommentManager::new(
                dyn_store.clone(),
                AccessGate::new(dyn_store, "main"),
                renderer,
            ),
            store,
            page_id: page.id,
            alice,
            _temp_dir: temp_dir,
        }
    }

    fn comment(raw: &str) -> Comment {
        Comment {
            content: Content {
                raw: raw.into(),
                formatted: String::new(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let f = fixture().await;
        let mut c = comment("**nice** <script>x()</script>");
        let rev = f
            .comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();

        let stored = f.comments.read("w1", &c.id).await.unwrap();
        assert_eq!(stored.rev, rev);
        assert_eq!(stored.author, "alice");
        assert_eq!(stored.page_id, f.page_id);
        assert!(!stored.created_time.is_empty());
        assert!(stored.content.formatted.contains("<strong>nice</strong>"));
        assert!(!stored.content.formatted.contains("<script"));
    }

    #[tokio::test]
    async fn test_comment_on_missing_page_not_found() {
        let f = fixture().await;
        let mut c = comment("hi");
        let err = f
            .comments
            .save("w1", "no-such-page", &mut c, "", "", &f.alice)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_author_update_forbidden_without_write() {
        let f = fixture().await;
        let mut c = comment("original");
        let rev = f
            .comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();
        let writes_before = f.store.mutations();

        let mallory = CurrentUser::new("mallory", vec!["w1:reader".into()]);
        let mut edit = comment("defaced");
        let err = f
            .comments
            .save("w1", &f.page_id, &mut edit, &c.id, &rev, &mallory)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(f.store.mutations(), writes_before);

        let stored = f.comments.read("w1", &c.id).await.unwrap();
        assert_eq!(stored.content.raw, "original");
    }

    #[tokio::test]
    async fn test_admin_update_keeps_author() {
        let f = fixture().await;
        let mut c = comment("original");
        let rev = f
            .comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();

        let admin = CurrentUser::new("moderator", vec!["w1:admin".into()]);
        let mut edit = comment("moderated");
        f.comments
            .save("w1", &f.page_id, &mut edit, &c.id, &rev, &admin)
            .await
            .unwrap();

        let stored = f.comments.read("w1", &c.id).await.unwrap();
        assert_eq!(stored.author, "alice");
        assert_eq!(stored.content.raw, "moderated");
        assert_eq!(stored.created_time, c.created_time);
    }

    #[tokio::test]
    async fn test_author_update_with_stale_rev_conflicts() {
        let f = fixture().await;
        let mut c = comment("v1");
        let rev1 = f
            .comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();
        let mut edit = comment("v2");
        f.comments
            .save("w1", &f.page_id, &mut edit, &c.id, &rev1, &f.alice)
            .await
            .unwrap();

        let mut stale = comment("v3");
        let err = f
            .comments
            .save("w1", &f.page_id, &mut stale, &c.id, &rev1, &f.alice)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_gated() {
        let f = fixture().await;
        let mut c = comment("bye");
        f.comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();

        let writes_before = f.store.mutations();
        let bob = CurrentUser::new("bob", vec![]);
        let err = f.comments.delete("w1", &c.id, &bob).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(f.store.mutations(), writes_before);

        f.comments.delete("w1", &c.id, &f.alice).await.unwrap();
        assert!(matches!(
            f.comments.read("w1", &c.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_uses_latest_rev() {
        let f = fixture().await;
        let mut c = comment("v1");
        let rev1 = f
            .comments
            .save("w1", &f.page_id, &mut c, "", "", &f.alice)
            .await
            .unwrap();
        let mut edit = comment("v2");
        f.comments
            .save("w1", &f.page_id, &mut edit, &c.id, &rev1, &f.alice)
            .await
            .unwrap();

        let master = CurrentUser::new("root", vec!["master".into()]);
        f.comments.delete("w1", &c.id, &master).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_paged() {
        let f = fixture().await;
        for i in 0..5 {
            let mut c = comment(&format!("comment {}", i));
            f.comments
                .save("w1", &f.page_id, &mut c, "", "", &f.alice)
                .await
                .unwrap();
        }

        let first = f.comments.list("w1", &f.page_id, 0, 2).await.unwrap();
        assert_eq!(first.total_rows, 5);
        assert_eq!(first.offset, 0);
        assert_eq!(first.rows.len(), 2);

        let last = f.comments.list("w1", &f.page_id, 2, 2).await.unwrap();
        assert_eq!(last.offset, 4);
        assert_eq!(last.rows.len(), 1);

        assert!(matches!(
            f.comments.list("w1", &f.page_id, 0, 0).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
