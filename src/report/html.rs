//! HTML fragments shared by the renderer and the composer.
//!
//! The markup is deliberately plain so the report opens in any browser on
//! an analysis workstation without network access.

use std::fmt::Write as _;

use crate::constants::{HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN, LOOKUP_URL, REPORT_VERSION};

const STYLESHEET: &str = "\
table {margin: 1em 0; width: 100%; overflow: hidden; background: #FFF; color: #024457; border-radius: 10px; border: 1px solid #167F92;}
table tr {border: 1px solid #D9E4E6;}
table tr:nth-child(odd) {background-color: #EAF3F3;}
table th {border: 1px solid #FFF; background-color: #167F92; color: #FFF; padding: 1em;}
table td {word-wrap: break-word; border: 1px solid #D9E4E6;}
table th, table td {text-align: left; margin: .5em 1em; padding: 1em;}
body {padding: 0 2em; font-family: Arial, sans-serif; color: #024457; background: #f2f2f2;}
h1 {font-family: Verdana; font-weight: normal; color: #024457;}
.collapse {display: none;}
.collapse + label {cursor: pointer; display: block; font-weight: bold; line-height: 21px; margin-bottom: 5px;}
.collapse + label + div {display: none; margin-bottom: 10px;}
.collapse:checked + label + div {display: block;}
.collapse + label:before {background-color: #4F5150; border-radius: 10px; color: #FFFFFF; content: \"+\"; display: block; float: left; font-weight: bold; height: 20px; line-height: 20px; margin-right: 5px; text-align: center; width: 20px;}
.collapse:checked + label:before {content: \"\\2212\";}
";

const SEARCH_SCRIPT: &str = "<script>function searchIOC (IOCParm) {var name = prompt(\"IOC Search\", IOCParm); \
if (name != null) {window.find(name, 0, 0, 1); setTimeout(() => {searchIOC(name);}, 100);}} </script>";

pub const END_REPORT: &str = "<hr><h1><Center> * * * End Report * * * </Center></h1>\n</body></html>\n";

/// Escape text for element content and double-quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Body of a double-quoted JavaScript string literal inside an HTML attribute.
///
/// JavaScript escapes come first; the result is then HTML-escaped because the
/// browser decodes entities before the script sees the string.
pub fn js_string(text: &str) -> String {
    let mut literal = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\'' => literal.push_str("\\'"),
            '<' => literal.push_str("\\x3c"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            _ => literal.push(c),
        }
    }
    escape(&literal)
}

/// Wrap already-escaped markup in the IOC highlight
pub fn highlight(markup: &str) -> String {
    format!("{}{}{}", HIGHLIGHT_OPEN, markup, HIGHLIGHT_CLOSE)
}

/// Escaped text, highlighted when `hit`
pub fn text(value: &str, hit: bool) -> String {
    let escaped = escape(value);
    if hit {
        highlight(&escaped)
    } else {
        escaped
    }
}

/// Threat-intel lookup link around `value`
pub fn lookup_link(value: &str, hit: bool) -> String {
    format!(
        "<a href=\"{}{}\" target=_blank>{}</a>",
        LOOKUP_URL,
        escape(value),
        text(value, hit)
    )
}

/// Document head, title block, optional branding and navigation strip
pub fn document_header(collection_name: &str, branding: Option<&str>, nav: &[(&str, &str)]) -> String {
    let name = escape(collection_name);
    let mut out = String::new();
    out.push_str("<html><head><style>\n");
    out.push_str(STYLESHEET);
    out.push_str("</style>\n<script src=\"sortable-Ach.js\"></script>\n");
    out.push_str(SEARCH_SCRIPT);
    out.push('\n');
    let _ = writeln!(out, "<title>Triage Collection Endpoint Report({})</title></head>", name);
    out.push_str("<body>\n<p><Center>\n");
    let _ = writeln!(
        out,
        "<a name=Top></a>\n<H1>Triage Collection Endpoint Report ({})</H1>",
        REPORT_VERSION
    );
    // Branding is operator-supplied HTML and is written as-is
    if let Some(branding) = branding {
        let _ = writeln!(out, "{}", branding);
    }
    let _ = writeln!(out, "({})<br>", name);

    out.push_str("<table border=1 cellpadding=3 width=100%>\n<tr><td> <a href=#Top>Top</a> </td>\n");
    for (anchor, label) in nav {
        let _ = writeln!(out, "<td> <a href=#{}>{}</a> </td>", anchor, escape(label));
    }
    out.push_str("</tr></table>\n</Center></p>\n");
    out
}

/// Anchor, collapsible heading and help paragraph of a section
pub fn section_open(anchor: &str, checkbox: usize, title: &str, help: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<a name={}></a>", anchor);
    let _ = writeln!(
        out,
        "<input class=\"collapse\" id=\"id{:02}\" type=\"checkbox\" checked>",
        checkbox
    );
    let _ = writeln!(out, "<label for=\"id{:02}\">", checkbox);
    let _ = writeln!(out, "<H2>{}</H2>", escape(title));
    out.push_str("</label><div><hr>\n");
    if !help.is_empty() {
        let _ = writeln!(out, "<p><i><font color=firebrick>{}</font></i></p>", help);
    }
    out
}

pub fn section_close() -> &'static str {
    "</div>\n"
}

pub fn banner(message: &str) -> String {
    format!("<p><b><font color = red> {} </font></b></p>\n", message)
}

pub fn records_found(count: usize) -> String {
    format!("<p>Records Found: {}</p>\n", count)
}

pub fn subheading(title: &str) -> String {
    format!("<h3>{}</h3>\n", escape(title))
}

pub fn table_open(header: &[String]) -> String {
    let mut out = String::from("<table class=\"sortable\" border=1 cellpadding=5 width=100%>\n<thead><tr>");
    for label in header {
        let _ = write!(out, "<th> {} (+/-)</th>", escape(label));
    }
    out.push_str("</tr></thead><tbody>\n");
    out
}

pub fn table_row(cells: &[String]) -> String {
    let mut out = String::from("<tr>");
    for cell in cells {
        let _ = write!(out, "<td>{}</td>", cell);
    }
    out.push_str("</tr>\n");
    out
}

pub fn table_close() -> &'static str {
    "</tbody></table>\n"
}

/// Format a byte count with thousands separators
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<script>&\"'"), "&lt;script&gt;&amp;&quot;&#39;");
        assert_eq!(escape("C:\\Temp\\a.exe"), "C:\\Temp\\a.exe");
    }

    #[test]
    fn test_js_string_escapes_before_html() {
        assert_eq!(js_string("c:\\temp\\evil.exe"), "c:\\\\temp\\\\evil.exe");
        assert_eq!(js_string("a\"b"), "a\\&quot;b");
        assert_eq!(js_string("it's"), "it\\&#39;s");
        assert_eq!(js_string("</script>"), "\\x3c/script&gt;");
        assert_eq!(js_string("evil.example"), "evil.example");
    }

    #[test]
    fn test_highlighted_text_is_escaped_first() {
        assert_eq!(text("<evil>", true), "<b><font color=red>&lt;evil&gt;</font></b>");
        assert_eq!(text("plain", false), "plain");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(5_000_000), "5,000,000");
        assert_eq!(thousands(123_456_789_012), "123,456,789,012");
    }

    #[test]
    fn test_section_open_ids() {
        let html = section_open("RDP", 7, "Successful RDP Logins", "");
        assert!(html.starts_with("<a name=RDP></a>\n"));
        assert!(html.contains("id=\"id07\""));
        assert!(html.contains("<H2>Successful RDP Logins</H2>"));
        assert!(!html.contains("firebrick"));
    }

    #[test]
    fn test_header_lists_nav_entries() {
        let html = document_header("HOST1", Some("<b>ACME</b>"), &[("RDP", "RDP"), ("Logins", "FaiLgn")]);
        assert!(html.contains("Triage Collection Endpoint Report(HOST1)"));
        assert!(html.contains("(v1.51)"));
        assert!(html.contains("<b>ACME</b>"));
        assert!(html.contains("<a href=#Logins>FaiLgn</a>"));
        assert!(html.contains("function searchIOC"));
    }
}
