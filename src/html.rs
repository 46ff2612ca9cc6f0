use std::collections::HashMap;

use crate::dom::Dom;
use crate::{Error, Result};

/// Parses an HTML fragment into a fresh [`Dom`].
///
/// Lenient about unclosed elements (closing a tag pops everything above its
/// nearest open match), strict about malformed tags and attributes.
pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") {
            let end = find_subslice(bytes, i, b">")
                .ok_or_else(|| Error::HtmlParse("unclosed markup declaration".into()))?;
            i = end + 1;
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;
                if stack.iter().skip(1).any(|node| dom.has_tag(*node, &tag)) {
                    while stack.len() > 1 {
                        let top = stack.pop().unwrap_or(dom.root);
                        if dom.has_tag(top, &tag) {
                            break;
                        }
                    }
                }
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = html.get(text_start..i) {
            if !text.is_empty() {
                let parent = *stack
                    .last()
                    .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
                dom.create_text(parent, text.to_string());
            }
        }
    }

    dom.initialize_form_control_values()?;
    Ok(dom)
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    skip_ws(bytes, &mut i);
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();
    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}")));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if starts_with_at(bytes, i, b"/>") {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::HtmlParse(format!("invalid attribute name in <{tag}>")));
        }

        skip_ws(bytes, &mut i);
        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            "true".to_string()
        };
        attrs.entry(name).or_insert(value);
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }
    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
            .to_string();
        *i += 1;
        return Ok(value);
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !starts_with_at(bytes, *i, b"/>")
    {
        *i += 1;
    }
    Ok(html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
        .to_string())
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .map(|window| window == needle)
        .unwrap_or(false)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut needle = b"</".to_vec();
    needle.extend(tag.iter().map(|b| b.to_ascii_lowercase()));
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(&needle))
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_form_controls() -> Result<()> {
        let dom = parse_html(
            r#"<!DOCTYPE html>
            <body>
              <form id="f">
                <input id="name" value="foo">
                <input id="agree" type="checkbox" checked>
                <textarea id="bio">hi <b>there</b></textarea>
                <!-- ignored -->
              </form>
            </body>"#,
        )?;
        let name = dom.by_id("name").ok_or(Error::SelectorNotFound("#name".into()))?;
        let agree = dom.by_id("agree").ok_or(Error::SelectorNotFound("#agree".into()))?;
        let bio = dom.by_id("bio").ok_or(Error::SelectorNotFound("#bio".into()))?;
        let form = dom.by_id("f").ok_or(Error::SelectorNotFound("#f".into()))?;

        assert_eq!(dom.value(name), "foo");
        assert!(dom.checked(agree));
        assert_eq!(dom.value(bio), "hi <b>there</b>");
        assert!(dom.is_descendant_of(name, form));
        assert!(dom.has_tag(dom.body(), "body"));
        Ok(())
    }

    #[test]
    fn boolean_and_unquoted_attributes() -> Result<()> {
        let dom = parse_html("<input id=x disabled data-safe-edits-value=abc/>")?;
        let input = dom.by_id("x").ok_or(Error::SelectorNotFound("#x".into()))?;
        assert!(dom.disabled(input));
        assert_eq!(dom.attr(input, "data-safe-edits-value").as_deref(), Some("abc"));
        Ok(())
    }

    #[test]
    fn stray_end_tag_is_ignored() -> Result<()> {
        let dom = parse_html("<div id='a'></span><p id='b'></p></div>")?;
        let a = dom.by_id("a").ok_or(Error::SelectorNotFound("#a".into()))?;
        let b = dom.by_id("b").ok_or(Error::SelectorNotFound("#b".into()))?;
        assert!(dom.is_descendant_of(b, a));
        Ok(())
    }

    #[test]
    fn malformed_markup_is_reported() {
        for html in ["<input value='x", "<!-- open", "<textarea>never closed", "<div"] {
            assert!(
                matches!(parse_html(html), Err(Error::HtmlParse(_))),
                "{html:?} should fail"
            );
        }
    }
}
