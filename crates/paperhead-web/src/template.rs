use axum::response::Html;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Render the index page, injecting the GROBID address it talks to.
pub fn render_index(grobid_url: &str) -> Html<String> {
    let html = INDEX_HTML.replace("{{ grobid_url }}", &escape_html(grobid_url));
    Html(html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
