//! Category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bon_manual_core::{Category, CategoryDraft, CategoryId, CategoryUpdate, Credential};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{done, failed};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/categories";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LIST_PATH, get(index).post(create))
        .route("/admin/categories/new", get(new))
        .route("/admin/categories/{id}", post(update))
        .route("/admin/categories/{id}/edit", get(edit))
        .route("/admin/categories/{id}/delete", post(delete))
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/categories/index.html")]
pub struct CategoriesTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub categories: Vec<Category>,
}

/// Create and edit form. The code field is locked when editing.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories/form.html")]
pub struct CategoryFormTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub editing: Option<CategoryId>,
    pub form: CategoryForm,
}

impl CategoryFormTemplate {
    fn action(&self) -> String {
        self.editing
            .map_or_else(|| LIST_PATH.to_string(), |id| format!("{LIST_PATH}/{id}"))
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Raw category form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: String,
    /// Checkbox: present when ticked.
    #[serde(default)]
    pub is_active: Option<String>,
}

impl CategoryForm {
    fn active(&self) -> bool {
        self.is_active.is_some()
    }

    fn sort_order(&self) -> Result<i32, String> {
        parse_number("Sort order", &self.sort_order)
    }

    fn draft(&self) -> Result<CategoryDraft, String> {
        CategoryDraft::new(
            &self.code,
            &self.name,
            &self.description,
            self.sort_order()?,
            self.active(),
        )
        .map_err(|e| e.to_string())
    }

    fn update(&self) -> Result<CategoryUpdate, String> {
        CategoryUpdate::new(&self.name, &self.description, self.sort_order()?, self.active())
            .map_err(|e| e.to_string())
    }
}

impl From<&Category> for CategoryForm {
    fn from(category: &Category) -> Self {
        Self {
            code: category.code.clone(),
            name: category.name.clone(),
            description: category.description.clone().unwrap_or_default(),
            sort_order: category.sort_order.to_string(),
            is_active: category.is_active.then(|| "on".to_string()),
        }
    }
}

/// Delete confirmation checkbox.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Parse an optional integer field; blank means zero.
pub(crate) fn parse_number(field: &str, value: &str) -> Result<i32, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| format!("{field} must be a whole number"))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /admin/categories
#[instrument(skip_all)]
async fn index(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let mut flash = Flash::take(&session).await;
    let mut categories = match state.backend().categories(&credential).await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load categories");
            flash = Some(Flash::error(e.user_message()));
            Vec::new()
        }
    };
    categories.sort_by_key(|c| (c.sort_order, c.id));

    CategoriesTemplate {
        flash,
        current_path: LIST_PATH,
        categories,
    }
}

/// GET /admin/categories/new
async fn new(RequireAdmin(_credential): RequireAdmin, session: Session) -> impl IntoResponse {
    CategoryFormTemplate {
        flash: Flash::take(&session).await,
        current_path: LIST_PATH,
        editing: None,
        form: CategoryForm {
            is_active: Some("on".to_string()),
            ..CategoryForm::default()
        },
    }
}

/// POST /admin/categories
#[instrument(skip_all, fields(code = %form.code))]
async fn create(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CategoryForm>,
) -> Response {
    let draft = match form.draft() {
        Ok(draft) => draft,
        Err(message) => return invalid(None, form, message),
    };

    match state.backend().create_category(&credential, &draft).await {
        Ok(()) => {
            tracing::info!(code = %draft.code, "category created");
            done(&session, "Category created.", LIST_PATH).await
        }
        Err(e) => failed(&session, "create category", &e, LIST_PATH).await,
    }
}

/// GET /admin/categories/{id}/edit
#[instrument(skip_all, fields(id = %id))]
async fn edit(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
) -> Response {
    match find(&state, &credential, id).await {
        Ok(Some(category)) => CategoryFormTemplate {
            flash: Flash::take(&session).await,
            current_path: LIST_PATH,
            editing: Some(id),
            form: CategoryForm::from(&category),
        }
        .into_response(),
        Ok(None) => {
            Flash::error("Category not found.").push(&session).await;
            Redirect::to(LIST_PATH).into_response()
        }
        Err(e) => failed(&session, "load category", &e, LIST_PATH).await,
    }
}

/// POST /admin/categories/{id}
#[instrument(skip_all, fields(id = %id))]
async fn update(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let update = match form.update() {
        Ok(update) => update,
        Err(message) => return invalid(Some(id), form, message),
    };

    match state.backend().update_category(&credential, id, &update).await {
        Ok(()) => {
            tracing::info!("category updated");
            done(&session, "Category updated.", LIST_PATH).await
        }
        Err(e) => failed(&session, "update category", &e, LIST_PATH).await,
    }
}

/// POST /admin/categories/{id}/delete
///
/// The category's articles stop being listed with it.
#[instrument(skip_all, fields(id = %id))]
async fn delete(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    if form.confirm.is_none() {
        Flash::warning("Tick the confirmation box to delete.")
            .push(&session)
            .await;
        return Redirect::to(LIST_PATH).into_response();
    }

    match state.backend().delete_category(&credential, id).await {
        Ok(()) => {
            tracing::info!("category deleted");
            done(&session, "Category deleted.", LIST_PATH).await
        }
        Err(e) => failed(&session, "delete category", &e, LIST_PATH).await,
    }
}

/// The backend has no single-category read, so look it up in the list.
async fn find(
    state: &AppState,
    credential: &Credential,
    id: CategoryId,
) -> Result<Option<Category>, crate::backend::BackendError> {
    let categories = state.backend().categories(credential).await?;
    Ok(categories.into_iter().find(|c| c.id == id))
}

fn invalid(editing: Option<CategoryId>, form: CategoryForm, message: String) -> Response {
    CategoryFormTemplate {
        flash: Some(Flash::warning(message)),
        current_path: LIST_PATH,
        editing,
        form,
    }
    .into_response()
}
