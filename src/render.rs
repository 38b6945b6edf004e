//! Plain text to HTML for ticket descriptions.
//!
//! Output is always escaped. Bare URLs become links, blank lines split
//! paragraphs and single newlines become `<br>`.

use linkify::{LinkFinder, LinkKind};

/// Escapes a string for use in HTML text and attribute values.
pub fn sanitize_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

fn linkify_line(finder: &LinkFinder, line: &str) -> String {
    let mut output = String::with_capacity(line.len());
    for span in finder.spans(line) {
        match span.kind() {
            Some(LinkKind::Url) => {
                let url = sanitize_html(span.as_str());
                output.push_str(&format!(
                    "<a href=\"{}\" rel=\"nofollow noopener\">{}</a>",
                    url, url
                ));
            }
            _ => output.push_str(&sanitize_html(span.as_str())),
        }
    }
    output
}

/// Renders a description into the HTML stored beside it.
pub fn render_description(text: &str) -> String {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);

    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| {
            let lines: Vec<String> = paragraph
                .lines()
                .map(|line| linkify_line(&finder, line))
                .collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_html_escapes_all_special_chars() {
        let input = "<script>alert('xss' & \"bad\")</script>";
        let expected =
            "&lt;script&gt;alert(&#x27;xss&#x27; &amp; &quot;bad&quot;)&lt;/script&gt;";
        assert_eq!(sanitize_html(input), expected);
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(render_description(""), "");
        assert_eq!(render_description("\n\n  \n"), "");
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        assert_eq!(
            render_description("first line\nsecond line\n\nnext paragraph"),
            "<p>first line<br>second line</p>\n<p>next paragraph</p>"
        );
    }

    #[test]
    fn test_windows_newlines() {
        assert_eq!(render_description("a\r\n\r\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_urls_become_links() {
        assert_eq!(
            render_description("see https://example.com/x for details"),
            "<p>see <a href=\"https://example.com/x\" rel=\"nofollow noopener\">https://example.com/x</a> for details</p>"
        );
    }

    #[test]
    fn test_markup_is_escaped() {
        assert_eq!(
            render_description("<b>bold</b>"),
            "<p>&lt;b&gt;bold&lt;/b&gt;</p>"
        );
    }
}
