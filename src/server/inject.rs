// src/server/inject.rs

use std::sync::LazyLock;

use regex::Regex;

use super::LIVERELOAD_SCRIPT_PATH;

static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</body\s*>").unwrap_or_else(|e| panic!("invalid body regex: {e}"))
});

/// Insert the live-reload `<script>` tag before the last `</body>`, or append
/// it when the document has none.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{LIVERELOAD_SCRIPT_PATH}"></script>"#);

    match BODY_CLOSE.find_iter(html).last() {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + tag.len() + 1);
            out.push_str(&html[..m.start()]);
            out.push_str(&tag);
            out.push('\n');
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}
