use axum::{extract::State, response::Html};
use minijinja::context;
use std::sync::Arc;

use crate::db::DatabaseKind;
use crate::web::state::AppState;
use crate::web::templates::render_template;

// Main UI entry point
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let session = state.session.lock().await;
    let status = session.status();

    let kinds: Vec<&str> = DatabaseKind::ALL.iter().map(|kind| kind.label()).collect();
    let html = render_template(
        &state.template_env,
        "index.html",
        context! {
            version => env!("CARGO_PKG_VERSION"),
            kinds => kinds,
            selected => status.selected.label(),
            status => minijinja::Value::from_serialize(&status),
            prefill => session.prefill(),
            load_warning => session.load_warning(),
        },
    );

    Html(html)
}
