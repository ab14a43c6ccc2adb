//! Admin dashboard: category overview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use bon_manual_core::Category;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin", get(index))
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub categories: Vec<Category>,
}

/// GET /admin
///
/// Category cards link to the article list filtered by that category.
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

    DashboardTemplate {
        flash,
        current_path: "/admin",
        categories,
    }
}
