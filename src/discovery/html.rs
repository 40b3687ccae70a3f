//! Anchor extraction from listing documents.

use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Matches an opening `<a>` tag and captures its attribute text. Quoted values may contain `>`.
static ANCHOR_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<a\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
});

/// Matches one attribute: name, then an optional double, single, or unquoted value.
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?s)([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    )
});

/// Matches regions whose text is never markup: comments, scripts and styles.
/// An unterminated region runs to the end of the document.
static INERT_REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?is)<!--.*?(?:-->|\z)|<script\b.*?(?:</script\s*>|\z)|<style\b.*?(?:</style\s*>|\z)",
    )
});

/// Matches any element, comment, or doctype opener.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"<[A-Za-z!/]"));

/// Returns true if `document` contains at least one HTML tag.
#[must_use]
pub(crate) fn looks_like_html(document: &str) -> bool {
    MARKUP_RE.is_match(document)
}

/// Returns every anchor `href` value in document order, with character references decoded.
///
/// Only a real `href` attribute counts; `data-href`, `xlink:href` and anchors
/// inside comments or scripts are ignored.
#[must_use]
pub(crate) fn anchor_hrefs(document: &str) -> Vec<String> {
    let markup = INERT_REGION_RE.replace_all(document, " ");
    ANCHOR_TAG_RE
        .captures_iter(&markup)
        .filter_map(|tag| tag.get(1).and_then(|attrs| href_value(attrs.as_str())))
        .map(|value| decode_character_references(value.trim()))
        .collect()
}

/// Returns the value of the first `href` attribute in an attribute list.
fn href_value(attributes: &str) -> Option<&str> {
    ATTRIBUTE_RE
        .captures_iter(attributes)
        .find(|attr| attr[1].eq_ignore_ascii_case("href"))
        .and_then(|attr| attr.get(2).or_else(|| attr.get(3)).or_else(|| attr.get(4)))
        .map(|m| m.as_str())
}

/// Decodes the character references that commonly appear inside attribute values.
fn decode_character_references(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_hrefs_in_document_order() {
        let html = r#"
            <a href="/download/item/b.mp4">b</a>
            <p>text</p>
            <A class="x" HREF='/download/item/a.mp4'>a</A>
            <a href=/download/item/c.mp4>c</a>
        "#;
        assert_eq!(
            anchor_hrefs(html),
            vec![
                "/download/item/b.mp4",
                "/download/item/a.mp4",
                "/download/item/c.mp4"
            ]
        );
    }

    #[test]
    fn test_anchor_without_href_is_ignored() {
        let html = r#"<a name="top">top</a><a href="/x">x</a>"#;
        assert_eq!(anchor_hrefs(html), vec!["/x"]);
    }

    #[test]
    fn test_non_anchor_href_is_ignored() {
        let html = r#"<link href="/style.css"><area href="/map"><a href="/keep">k</a>"#;
        assert_eq!(anchor_hrefs(html), vec!["/keep"]);
    }

    #[test]
    fn test_href_spanning_attributes_over_lines() {
        let html = "<a\n  class=\"stealth\"\n  href=\"/download/item/file.zip\"\n>file</a>";
        assert_eq!(anchor_hrefs(html), vec!["/download/item/file.zip"]);
    }

    #[test]
    fn test_character_references_decoded() {
        let html = r#"<a href="/download/item/Tom &amp; Jerry.mp4">t</a>"#;
        assert_eq!(anchor_hrefs(html), vec!["/download/item/Tom & Jerry.mp4"]);
    }

    #[test]
    fn test_prefixed_href_attributes_are_not_hrefs() {
        let html = r#"
            <a data-href="/download/item/evil.mp4" href="/details/other">x</a>
            <a xlink:href="/download/item/svg.mp4">y</a>
            <a data-href='/download/item/only-data.mp4'>z</a>
        "#;
        assert_eq!(anchor_hrefs(html), vec!["/details/other"]);
    }

    #[test]
    fn test_anchors_in_comments_and_scripts_are_ignored() {
        let html = r#"
            <!-- <a href="/download/item/commented.mp4">old</a> -->
            <script>document.write('<a href="/download/item/scripted.mp4">s</a>');</script>
            <style>a[href="/download/item/styled.mp4"] { color: red; }</style>
            <a href="/download/item/real.mp4">real</a>
            <!-- unterminated <a href="/download/item/tail.mp4">
        "#;
        assert_eq!(anchor_hrefs(html), vec!["/download/item/real.mp4"]);
    }

    #[test]
    fn test_quoted_angle_bracket_does_not_end_tag() {
        let html = r#"<a title="a > b" href="/download/item/x.mp4">x</a>"#;
        assert_eq!(anchor_hrefs(html), vec!["/download/item/x.mp4"]);
    }

    #[test]
    fn test_href_text_inside_other_attribute_value_is_ignored() {
        let html = r#"<a title="see href=/download/item/fake.mp4">no</a>"#;
        assert!(anchor_hrefs(html).is_empty());
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<div>x</div>"));
        assert!(!looks_like_html("{\"files\": []}"));
        assert!(!looks_like_html(""));
    }
}
