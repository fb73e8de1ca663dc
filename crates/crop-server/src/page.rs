use anyhow::anyhow;
use axum::response::Html;
use rust_embed::Embed;

use crate::AppError;

#[derive(Embed)]
#[folder = "templates/"]
#[include = "*.html"]
pub struct Templates;

const INDEX_TEMPLATE: &str = "index.html";
const RESULT_SLOT: &str = "{{ result_block }}";

/// Render the input form, optionally with a result message below it.
pub fn render_index(result: Option<&str>) -> Result<Html<String>, AppError> {
    let file = Templates::get(INDEX_TEMPLATE)
        .ok_or_else(|| anyhow!("template {INDEX_TEMPLATE} is not embedded"))?;
    let template = std::str::from_utf8(&file.data)?;

    let block = match result {
        Some(message) => format!(
            r#"<div class="result" id="result">{}</div>"#,
            escape_html(message)
        ),
        None => String::new(),
    };
    Ok(Html(template.replace(RESULT_SLOT, &block)))
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Rice" & 'Jute'</b>"#),
            "&lt;b&gt;&quot;Rice&quot; &amp; &#39;Jute&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_without_result() {
        let Html(page) = render_index(None).ok().unwrap();
        assert!(page.contains(r#"name="Phosporus""#));
        assert!(!page.contains("{{"));
        assert!(!page.contains(r#"id="result""#));
    }

    #[test]
    fn test_render_with_result() {
        let Html(page) = render_index(Some("Rice is the best crop to be cultivated right there."))
            .ok()
            .unwrap();
        assert!(page.contains(
            r#"<div class="result" id="result">Rice is the best crop to be cultivated right there.</div>"#
        ));
    }
}
