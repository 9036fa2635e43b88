use super::draft::Draft;

/// Wrap the draft body in `<article>` and append its JSON-LD blocks.
pub fn apply_template(draft: &Draft) -> String {
    let body = draft.article_html.trim();
    let mut html = if body.to_ascii_lowercase().starts_with("<article") {
        body.to_string()
    } else {
        format!("<article>\n{}\n</article>", body)
    };
    for ld in &draft.jsonld {
        html.push_str(&format!(
            "\n<script type=\"application/ld+json\">{}</script>",
            ld.replace("</", "<\\/")
        ));
    }
    html
}
