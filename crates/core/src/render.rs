use crate::collaborators::Renderer;

/// 將文字轉義後包在 `<pre>` 中的預設渲染器。 / Default renderer: escapes the text into a `<pre>` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreformattedRenderer;

impl Renderer for PreformattedRenderer {
    fn render_to_html(&self, markdown: &str) -> String {
        format!("<pre>{}</pre>", escape_html(markdown))
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// 將渲染後的內容包成獨立的 HTML 頁面。 / Wraps a rendered body into a standalone HTML page.
pub fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n\
         body {{ max-width: 48rem; margin: 2rem auto; padding: 0 1rem; font-family: Georgia, serif; line-height: 1.7; }}\n\
         pre {{ white-space: pre-wrap; word-wrap: break-word; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         {body}\n\
         </body>\n\
         </html>\n",
        title = escape_html(title),
    )
}
