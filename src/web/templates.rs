use minijinja::{Environment, Value};
use tracing::error;

pub fn init_templates() -> Environment<'static> {
    let mut env = Environment::new();

    if let Err(e) = env.add_template("index.html", include_str!("../../templates/index.html")) {
        error!("Failed to add index template: {}", e);
    }

    // Safe for embedding in a <script> block
    env.add_filter("json", |value: Value| {
        let json = serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string());
        Value::from_safe_string(json.replace('<', "\\u003c"))
    });

    env
}

pub fn render_template(env: &Environment, template_name: &str, context: Value) -> String {
    match env.get_template(template_name) {
        Ok(tmpl) => match tmpl.render(context) {
            Ok(result) => result,
            Err(e) => {
                error!("Template render error: {}", e);
                format!("<h1>Template Error</h1><p>{}</p>", e)
            }
        },
        Err(e) => {
            error!("Template not found: {} ({})", template_name, e);
            format!("<h1>Template Not Found</h1><p>{}: {}</p>", template_name, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn index_renders_prefill_escaped() {
        let env = init_templates();
        let html = render_template(
            &env,
            "index.html",
            context! {
                version => "0.1.0",
                kinds => vec!["Demo Database", "MySQL"],
                selected => "MySQL",
                status => context! { state => "disconnected" },
                prefill => "Top <5> artists",
                load_warning => (),
            },
        );

        assert!(html.contains("Top &lt;5&gt; artists"));
        assert!(html.contains("<option value=\"MySQL\" selected>MySQL</option>"));
    }

    #[test]
    fn unknown_template_is_reported_inline() {
        let env = init_templates();
        let html = render_template(&env, "missing.html", Value::UNDEFINED);
        assert!(html.contains("Template Not Found"));
    }
}
