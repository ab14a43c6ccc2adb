//! Article management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bon_manual_core::{Article, ArticleDraft, ArticleId, Category, CategoryId, Credential};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::categories::{ConfirmForm, parse_number};
use super::{done, failed};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/articles";

/// Shown when an article points at a category that no longer exists.
const UNKNOWN_CATEGORY: &str = "Unknown";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LIST_PATH, get(index).post(create))
        .route("/admin/articles/new", get(new))
        .route("/admin/articles/{id}", get(edit).post(update))
        .route("/admin/articles/{id}/delete", post(delete))
}

// =============================================================================
// Templates
// =============================================================================

/// One row of the article table.
#[derive(Debug, Clone)]
pub struct ArticleRow {
    pub article: Article,
    pub category_name: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/articles/index.html")]
pub struct ArticlesTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub categories: Vec<Category>,
    pub selected: Option<CategoryId>,
    pub search: String,
    pub rows: Vec<ArticleRow>,
}

impl ArticlesTemplate {
    // Templates pass loop items by reference
    #[allow(clippy::trivially_copy_pass_by_ref)]
    fn is_selected(&self, id: &CategoryId) -> bool {
        self.selected == Some(*id)
    }

    fn new_path(&self) -> String {
        self.selected.map_or_else(
            || "/admin/articles/new".to_string(),
            |id| format!("/admin/articles/new?category={id}"),
        )
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/articles/form.html")]
pub struct ArticleFormTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub editing: Option<ArticleId>,
    pub categories: Vec<Category>,
    pub form: ArticleForm,
}

impl ArticleFormTemplate {
    fn action(&self) -> String {
        self.editing
            .map_or_else(|| LIST_PATH.to_string(), |id| format!("{LIST_PATH}/{id}"))
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    fn is_selected(&self, id: &CategoryId) -> bool {
        self.form.category_id.trim() == id.to_string()
    }
}

// =============================================================================
// Forms
// =============================================================================

/// List filters: `?category=<id>&q=<title substring>`.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl ArticleFilter {
    /// The selected category. Blank or malformed means all categories.
    fn category(&self) -> Option<CategoryId> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    fn search(&self) -> &str {
        self.q.as_deref().map_or("", str::trim)
    }
}

/// Raw article form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleForm {
    pub category_id: String,
    #[serde(default)]
    pub priority: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub is_published: Option<String>,
    #[serde(default)]
    pub requires_sm: Option<String>,
}

impl ArticleForm {
    fn draft(&self) -> Result<ArticleDraft, String> {
        let category_id = self
            .category_id
            .parse()
            .map_err(|_| "Choose a category".to_string())?;
        ArticleDraft {
            category_id,
            title: self.title.clone(),
            content: self.content.clone(),
            summary: Some(self.summary.clone()),
            priority: parse_number("Priority", &self.priority)?,
            requires_sm: self.requires_sm.is_some(),
            is_published: self.is_published.is_some(),
        }
        .validate()
        .map_err(|e| e.to_string())
    }
}

impl From<&ArticleDraft> for ArticleForm {
    fn from(draft: &ArticleDraft) -> Self {
        Self {
            category_id: draft.category_id.to_string(),
            priority: draft.priority.to_string(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            summary: draft.summary.clone().unwrap_or_default(),
            is_published: draft.is_published.then(|| "on".to_string()),
            requires_sm: draft.requires_sm.then(|| "on".to_string()),
        }
    }
}

/// Keep articles whose title contains `search`. Case-sensitive; empty keeps all.
fn filter_by_title(articles: Vec<Article>, search: &str) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| a.title.contains(search))
        .collect()
}

fn category_name(categories: &[Category], id: CategoryId) -> String {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or_else(|| UNKNOWN_CATEGORY.to_string(), |c| c.name.clone())
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /admin/articles
#[instrument(skip_all)]
async fn index(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ArticleFilter>,
) -> impl IntoResponse {
    let mut flash = Flash::take(&session).await;
    let selected = filter.category();

    let categories = match state.backend().categories(&credential).await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load categories");
            Vec::new()
        }
    };
    let articles = match state.backend().articles(&credential, selected).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load articles");
            flash = Some(Flash::error(e.user_message()));
            Vec::new()
        }
    };

    let rows = filter_by_title(articles, filter.search())
        .into_iter()
        .map(|article| ArticleRow {
            category_name: category_name(&categories, article.category_id),
            article,
        })
        .collect();

    ArticlesTemplate {
        flash,
        current_path: LIST_PATH,
        categories,
        selected,
        search: filter.search().to_string(),
        rows,
    }
}

/// GET /admin/articles/new
///
/// `?category=<id>` preselects the category.
#[instrument(skip_all)]
async fn new(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ArticleFilter>,
) -> impl IntoResponse {
    let mut draft = ArticleDraft::default();
    if let Some(category) = filter.category() {
        draft.category_id = category;
    }

    ArticleFormTemplate {
        flash: Flash::take(&session).await,
        current_path: LIST_PATH,
        editing: None,
        categories: state.backend().categories(&credential).await.unwrap_or_default(),
        form: ArticleForm::from(&draft),
    }
}

/// POST /admin/articles
#[instrument(skip_all)]
async fn create(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ArticleForm>,
) -> Response {
    let draft = match form.draft() {
        Ok(draft) => draft,
        Err(message) => return invalid(&state, &credential, None, form, message).await,
    };

    match state.backend().create_article(&credential, &draft).await {
        Ok(()) => {
            tracing::info!(title = %draft.title, "article created");
            done(&session, "Article created.", LIST_PATH).await
        }
        Err(e) => failed(&session, "create article", &e, LIST_PATH).await,
    }
}

/// GET /admin/articles/{id}
#[instrument(skip_all, fields(id = %id))]
async fn edit(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ArticleId>,
) -> Response {
    let article = match state.backend().article(&credential, id).await {
        Ok(article) => article,
        Err(e) => return failed(&session, "load article", &e, LIST_PATH).await,
    };

    ArticleFormTemplate {
        flash: Flash::take(&session).await,
        current_path: LIST_PATH,
        editing: Some(id),
        categories: state.backend().categories(&credential).await.unwrap_or_default(),
        form: ArticleForm::from(&ArticleDraft::from(&article)),
    }
    .into_response()
}

/// POST /admin/articles/{id}
#[instrument(skip_all, fields(id = %id))]
async fn update(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ArticleId>,
    Form(form): Form<ArticleForm>,
) -> Response {
    let draft = match form.draft() {
        Ok(draft) => draft,
        Err(message) => return invalid(&state, &credential, Some(id), form, message).await,
    };

    match state.backend().update_article(&credential, id, &draft).await {
        Ok(()) => {
            tracing::info!("article updated");
            done(&session, "Article updated.", LIST_PATH).await
        }
        Err(e) => failed(&session, "update article", &e, LIST_PATH).await,
    }
}

/// POST /admin/articles/{id}/delete
#[instrument(skip_all, fields(id = %id))]
async fn delete(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ArticleId>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    if form.confirm.is_none() {
        Flash::warning("Tick the confirmation box to delete.")
            .push(&session)
            .await;
        return Redirect::to(LIST_PATH).into_response();
    }

    match state.backend().delete_article(&credential, id).await {
        Ok(()) => {
            tracing::info!("article deleted");
            done(&session, "Article deleted.", LIST_PATH).await
        }
        Err(e) => failed(&session, "delete article", &e, LIST_PATH).await,
    }
}

async fn invalid(
    state: &AppState,
    credential: &Credential,
    editing: Option<ArticleId>,
    form: ArticleForm,
    message: String,
) -> Response {
    ArticleFormTemplate {
        flash: Some(Flash::warning(message)),
        current_path: LIST_PATH,
        editing,
        categories: state.backend().categories(credential).await.unwrap_or_default(),
        form,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, category: i64, title: &str) -> Article {
        Article {
            id: ArticleId::new(id),
            category_id: CategoryId::new(category),
            title: title.to_string(),
            content: "Body".to_string(),
            summary: None,
            priority: 0,
            requires_sm: false,
            is_published: true,
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            code: "OPS".to_string(),
            name: name.to_string(),
            description: None,
            sort_order: 0,
            is_active: true,
            article_count: None,
            doc_count: None,
        }
    }

    #[test]
    fn test_title_search_is_substring_match() {
        let articles = vec![
            article(1, 1, "Opening checklist"),
            article(2, 1, "Closing checklist"),
            article(3, 1, "Refund policy"),
        ];

        let found = filter_by_title(articles.clone(), "checklist");
        assert_eq!(found.len(), 2);

        assert_eq!(filter_by_title(articles.clone(), "").len(), 3);
        assert!(filter_by_title(articles, "CHECKLIST").is_empty());
    }

    #[test]
    fn test_missing_category_is_unknown() {
        let categories = vec![category(1, "Operations")];
        assert_eq!(category_name(&categories, CategoryId::new(1)), "Operations");
        assert_eq!(category_name(&categories, CategoryId::new(9)), "Unknown");
    }

    #[test]
    fn test_filter_ignores_blank_category() {
        let filter = ArticleFilter {
            category: Some(String::new()),
            q: Some("  fry ".to_string()),
        };
        assert_eq!(filter.category(), None);
        assert_eq!(filter.search(), "fry");

        let filter = ArticleFilter {
            category: Some("4".to_string()),
            q: None,
        };
        assert_eq!(filter.category(), Some(CategoryId::new(4)));
    }

    #[test]
    fn test_form_checkboxes_map_to_flags() {
        let form = ArticleForm {
            category_id: "2".to_string(),
            priority: "5".to_string(),
            title: " Fryer cleaning ".to_string(),
            content: "Drain the oil first.".to_string(),
            summary: " ".to_string(),
            is_published: None,
            requires_sm: Some("on".to_string()),
        };

        let draft = form.draft().unwrap();
        assert_eq!(draft.category_id, CategoryId::new(2));
        assert_eq!(draft.priority, 5);
        assert_eq!(draft.title, "Fryer cleaning");
        assert_eq!(draft.summary, None);
        assert!(!draft.is_published);
        assert!(draft.requires_sm);
    }

    #[test]
    fn test_form_requires_content() {
        let form = ArticleForm {
            category_id: "1".to_string(),
            title: "Fryer cleaning".to_string(),
            ..ArticleForm::default()
        };
        assert_eq!(form.draft().unwrap_err(), "Content is required");
    }

    #[test]
    fn test_new_form_defaults() {
        let form = ArticleForm::from(&ArticleDraft::default());
        assert_eq!(form.category_id, "1");
        assert_eq!(form.priority, "0");
        assert!(form.is_published.is_some());
        assert!(form.requires_sm.is_none());
    }

    #[test]
    fn test_filter_dropdown_marks_selected_category() {
        let page = ArticlesTemplate {
            flash: None,
            current_path: LIST_PATH,
            categories: vec![category(1, "Operations"), category(2, "People")],
            selected: Some(CategoryId::new(2)),
            search: String::new(),
            rows: Vec::new(),
        };
        let html = page.render().unwrap();
        assert!(html.contains(r#"<option value="2" selected>"#));
        assert!(!html.contains(r#"<option value="1" selected>"#));
    }

    #[test]
    fn test_form_dropdown_marks_chosen_category() {
        let page = ArticleFormTemplate {
            flash: None,
            current_path: LIST_PATH,
            editing: Some(ArticleId::new(3)),
            categories: vec![category(1, "Operations"), category(2, "People")],
            form: ArticleForm {
                category_id: "1".to_string(),
                ..ArticleForm::default()
            },
        };
        let html = page.render().unwrap();
        assert!(html.contains(r#"<option value="1" selected>"#));
        assert!(!html.contains(r#"<option value="2" selected>"#));
    }
}
