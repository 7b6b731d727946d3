use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

pub async fn static_handler(Path(path): Path<String>) -> Response {
    serve_static_file(&path)
}

// Embedded static file handler
pub fn serve_static_file(path: &str) -> Response {
    let path = path.trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();

            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_embedded_assets_with_mime_type() {
        let response = serve_static_file("/app.js");
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.contains("javascript"));

        assert_eq!(serve_static_file("style.css").status(), StatusCode::OK);
        assert_eq!(serve_static_file("missing.png").status(), StatusCode::NOT_FOUND);
    }
}
