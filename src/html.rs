use std::collections::HashMap;

use tracing::{debug, trace};

use crate::dom::{Dom, NodeId, parse_style_sheet};
use crate::error::{Error, Result};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 4 * 1024 * 1024;

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let root = dom.root;
    parse_into(&mut dom, root, html)?;
    Ok(dom)
}

/// Parses `html` below the empty document node `document`, synthesizing
/// `html`, `head` and `body` so every document starts with that skeleton.
pub(crate) fn parse_into(dom: &mut Dom, document: NodeId, html: &str) -> Result<()> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
        let mut builder = TreeBuilder::new(dom, document);
        builder.run(dom, html)?;
        for script in &builder.scripts {
            for (id, event) in extract_script_listeners(script) {
                if let Some(target) = dom.by_id_in(document, &id) {
                    trace!(id = %id, event = %event, "script listener");
                    dom.add_event_listener(target, &event);
                }
            }
        }
        debug!(
            document = document.0,
            nodes = dom.len(),
            "parsed html document"
        );
        Ok(())
    })
}

struct TreeBuilder {
    document: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    in_head: bool,
    body_started: bool,
    stack: Vec<NodeId>,
    scripts: Vec<String>,
}

impl TreeBuilder {
    fn new(dom: &mut Dom, document: NodeId) -> Self {
        let html = dom.create_element(document, "html".to_string(), HashMap::new());
        let head = dom.create_element(html, "head".to_string(), HashMap::new());
        let body = dom.create_element(html, "body".to_string(), HashMap::new());
        Self {
            document,
            html,
            head,
            body,
            in_head: false,
            body_started: false,
            stack: vec![body],
            scripts: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.body)
    }

    fn run(&mut self, dom: &mut Dom, html: &str) -> Result<()> {
        let bytes = html.as_bytes();
        let mut i = 0usize;

        while i < bytes.len() {
            if starts_with_at(bytes, i, b"<!--") {
                let end = find_subslice(bytes, i + 4, b"-->")
                    .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
                let text = html.get(i + 4..end).unwrap_or_default().to_string();
                if self.body_started {
                    dom.create_comment(self.current(), text);
                } else if self.in_head {
                    dom.create_comment(self.head, text);
                }
                i = end + 3;
                continue;
            }

            if bytes[i] == b'<' && starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;
                self.close_element(dom, &tag);
                continue;
            }

            if bytes[i] == b'<' && (starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?")) {
                i = parse_declaration_tag(html, i)?;
                continue;
            }

            if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
                let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
                i = self.open_element(dom, html, tag, attrs, self_closing, next)?;
                continue;
            }

            let text_start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'<' {
                i += 1;
            }
            if let Some(text) = html.get(text_start..i) {
                self.insert_text(dom, text);
            }
        }
        Ok(())
    }

    fn insert_text(&mut self, dom: &mut Dom, raw: &str) {
        if raw.is_empty() {
            return;
        }
        if !self.body_started {
            if raw.chars().all(char::is_whitespace) {
                return;
            }
            self.start_body();
        }
        let parent = self.current();
        let mut decoded = decode_html_character_references(raw);
        if should_strip_initial_newline(dom, parent) {
            decoded = strip_initial_newline(&decoded);
        }
        if !decoded.is_empty() {
            dom.create_text(parent, decoded);
        }
    }

    fn start_body(&mut self) {
        self.body_started = true;
        self.in_head = false;
    }

    fn open_element(
        &mut self,
        dom: &mut Dom,
        html: &str,
        tag: String,
        attrs: HashMap<String, String>,
        self_closing: bool,
        next: usize,
    ) -> Result<usize> {
        match tag.as_str() {
            "html" => {
                dom.merge_attrs(self.html, attrs);
                return Ok(next);
            }
            "head" => {
                if !self.body_started {
                    dom.merge_attrs(self.head, attrs);
                    self.in_head = true;
                }
                return Ok(next);
            }
            "body" => {
                dom.merge_attrs(self.body, attrs);
                self.start_body();
                return Ok(next);
            }
            _ => {}
        }

        let parent = if !self.body_started && is_head_content_tag(&tag) {
            self.head
        } else {
            self.start_body();
            close_optional_description_item_start_tag(dom, &mut self.stack, &tag);
            close_optional_list_item_start_tag(dom, &mut self.stack, &tag);
            close_optional_option_start_tag(dom, &mut self.stack, &tag);
            close_optional_optgroup_start_tag(dom, &mut self.stack, &tag);
            close_optional_table_cell_start_tag(dom, &mut self.stack, &tag);
            close_optional_table_row_start_tag(dom, &mut self.stack, &tag);
            close_optional_table_section_start_tag(dom, &mut self.stack, &tag);
            close_optional_paragraph_start_tag(dom, &mut self.stack, &tag);
            if tag == "tr" && dom.is_tag(self.current(), "table") {
                let tbody = dom.create_element(self.current(), "tbody".to_string(), HashMap::new());
                self.stack.push(tbody);
            }
            self.current()
        };

        let srcdoc = if tag == "iframe" || tag == "frame" {
            attrs.get("srcdoc").cloned()
        } else {
            None
        };
        let executable_script =
            tag == "script" && is_executable_script_type(attrs.get("type").map(String::as_str));
        let node = dom.create_element(parent, tag.clone(), attrs);

        if let Some(srcdoc) = srcdoc {
            let frame_document = dom.create_document();
            parse_into(dom, frame_document, &srcdoc)?;
            dom.attach_frame_document(node, frame_document)?;
        }

        if is_raw_text_tag(&tag) && !self_closing {
            let bytes = html.as_bytes();
            let close = find_case_insensitive_raw_end_tag(bytes, next, tag.as_bytes())
                .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
            let body = html.get(next..close).unwrap_or_default();
            match tag.as_str() {
                "script" => {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                        if executable_script {
                            self.scripts.push(body.to_string());
                        }
                    }
                }
                "style" => {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                        let rules = parse_style_sheet(self.document, body, dom.style_rules.len());
                        dom.add_style_rules(rules);
                    }
                }
                "title" | "textarea" => {
                    let mut decoded = decode_html_character_references(body);
                    if tag == "textarea" {
                        decoded = strip_initial_newline(&decoded);
                    }
                    if !decoded.is_empty() {
                        dom.create_text(node, decoded);
                    }
                }
                "noscript" => {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                    }
                }
                _ => {}
            }
            let (_, after_end) = parse_end_tag(html, close)?;
            return Ok(after_end);
        }

        if !self_closing && !is_void_tag(&tag) && parent != self.head {
            self.stack.push(node);
        }
        Ok(next)
    }

    fn close_element(&mut self, dom: &Dom, tag: &str) {
        match tag {
            "html" | "body" => {}
            "head" => self.in_head = false,
            _ if !self.body_started => {}
            _ => {
                let open = (1..self.stack.len())
                    .rev()
                    .find(|index| dom.is_tag(self.stack[*index], tag));
                if let Some(index) = open {
                    self.stack.truncate(index);
                }
            }
        }
    }
}

fn is_head_content_tag(tag: &str) -> bool {
    matches!(
        tag,
        "title" | "meta" | "link" | "style" | "script" | "base" | "noscript"
    )
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "title" | "textarea" | "noscript" | "iframe"
    )
}

fn close_open_tag(
    dom: &Dom,
    stack: &mut Vec<NodeId>,
    closes: &[&str],
    boundaries: &[&str],
) {
    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if closes.iter().any(|tag| open_tag.eq_ignore_ascii_case(tag)) {
            close_index = Some(index);
            break;
        }
        if boundaries.iter().any(|tag| open_tag.eq_ignore_ascii_case(tag)) {
            break;
        }
    }
    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_description_item_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if matches!(tag, "dt" | "dd") {
        close_open_tag(dom, stack, &["dt", "dd"], &["dl"]);
    }
}

fn close_optional_list_item_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if tag == "li" {
        close_open_tag(dom, stack, &["li"], &["ol", "ul", "menu"]);
    }
}

fn close_optional_option_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if matches!(tag, "option" | "optgroup") {
        close_open_tag(dom, stack, &["option"], &["optgroup", "select", "datalist"]);
    }
}

fn close_optional_optgroup_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if tag == "optgroup" {
        close_open_tag(dom, stack, &["optgroup"], &["select"]);
    }
}

fn close_optional_table_cell_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if matches!(tag, "td" | "th") {
        close_open_tag(dom, stack, &["td", "th"], &["tr", "table"]);
    }
}

fn close_optional_table_row_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if tag == "tr" {
        close_open_tag(dom, stack, &["tr"], &["tbody", "thead", "tfoot", "table"]);
    }
}

fn close_optional_table_section_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if matches!(tag, "tbody" | "thead" | "tfoot") {
        close_open_tag(dom, stack, &["tbody", "thead", "tfoot"], &["table"]);
    }
}

fn close_optional_paragraph_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if is_optional_paragraph_terminator_tag(tag) {
        close_open_tag(dom, stack, &["p"], &["button", "table", "td", "th"]);
    }
}

fn is_optional_paragraph_terminator_tag(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn should_strip_initial_newline(dom: &Dom, parent: NodeId) -> bool {
    dom.is_tag(parent, "pre") && dom.children(parent).is_empty()
}

fn strip_initial_newline(text: &str) -> String {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .or_else(|| text.strip_prefix('\r'))
        .unwrap_or(text)
        .to_string()
}

fn is_executable_script_type(raw_type: Option<&str>) -> bool {
    let Some(raw_type) = raw_type else {
        return true;
    };
    let media_type = raw_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    media_type.is_empty()
        || matches!(
            media_type.as_str(),
            "text/javascript"
                | "application/javascript"
                | "application/ecmascript"
                | "text/ecmascript"
                | "module"
        )
}

/// Listener registrations of the forms
/// `getElementById('x').addEventListener('evt', ...)` and
/// `getElementById('x').onevt = ...`.
pub(crate) fn extract_script_listeners(script: &str) -> Vec<(String, String)> {
    const LOOKUP: &str = "getElementById(";
    let mut out = Vec::new();
    let mut rest = script;

    while let Some(at) = rest.find(LOOKUP) {
        rest = &rest[at + LOOKUP.len()..];
        let Some((id, after_id)) = quoted_literal(rest.trim_start()) else {
            continue;
        };
        let Some(after_call) = after_id.trim_start().strip_prefix(')') else {
            continue;
        };
        let Some(member) = after_call.trim_start().strip_prefix('.') else {
            continue;
        };
        let member = member.trim_start();

        if let Some(args) = member.strip_prefix("addEventListener(") {
            if let Some((event, _)) = quoted_literal(args.trim_start()) {
                out.push((id, event.to_ascii_lowercase()));
            }
            continue;
        }

        let Some(handler) = member.strip_prefix("on") else {
            continue;
        };
        let name_len = handler
            .find(|ch: char| !ch.is_ascii_alphanumeric())
            .unwrap_or(handler.len());
        let assignment = handler[name_len..].trim_start();
        if name_len > 0 && assignment.starts_with('=') && !assignment.starts_with("==") {
            out.push((id, handler[..name_len].to_ascii_lowercase()));
        }
    }
    out
}

fn quoted_literal(src: &str) -> Option<(String, &str)> {
    let quote = src.chars().next().filter(|ch| matches!(ch, '\'' | '"' | '`'))?;
    let body = &src[1..];
    let end = body.find(quote)?;
    Some((body[..end].to_string(), &body[end + 1..]))
}

fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn is_entity_token_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '#'
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "ensp" => Some('\u{2002}'),
            "emsp" => Some('\u{2003}'),
            "thinsp" => Some('\u{2009}'),
            "copy" => Some('©'),
            "reg" => Some('®'),
            "trade" => Some('™'),
            "euro" => Some('€'),
            "pound" => Some('£'),
            "yen" => Some('¥'),
            "laquo" => Some('«'),
            "raquo" => Some('»'),
            "ldquo" => Some('“'),
            "rdquo" => Some('”'),
            "lsquo" => Some('‘'),
            "rsquo" => Some('’'),
            "hellip" => Some('…'),
            "middot" => Some('·'),
            "auml" => Some('ä'),
            "ouml" => Some('ö'),
            "uuml" => Some('ü'),
            "Auml" => Some('Ä'),
            "Ouml" => Some('Ö'),
            "Uuml" => Some('Ü'),
            "szlig" => Some('ß'),
            "deg" => Some('°'),
            "times" => Some('×'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut i = 0usize;

    while i < src.len() {
        let Some(ch) = src[i..].chars().next() else {
            break;
        };
        if ch != '&' {
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        let tail = &src[i + 1..];
        let entity_end = tail
            .char_indices()
            .find_map(|(idx, ch)| (!is_entity_token_char(ch)).then_some(idx))
            .unwrap_or(tail.len());
        let raw = &tail[..entity_end];
        let decoded = if raw.is_empty() {
            None
        } else if let Some(rest) = raw.strip_prefix('#') {
            decode_numeric(rest)
        } else {
            decode_named(raw)
        };

        match decoded {
            Some(value) => {
                out.push(value);
                i += 1 + entity_end;
                if tail[entity_end..].starts_with(';') {
                    i += 1;
                }
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }

    out
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;
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
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}>")));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        if !is_attr_name_char(bytes[i]) {
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && !(bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>')
            {
                i += 1;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };
        attrs.entry(name).or_insert(value);
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_declaration_tag(html: &str, at: usize) -> Result<usize> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    let mut quote: Option<u8> = None;
    let mut bracket_depth = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"') => quote = Some(b),
            (None, b'[') => bracket_depth += 1,
            (None, b']') if bracket_depth > 0 => bracket_depth -= 1,
            (None, b'>') if bracket_depth == 0 => return Ok(i + 1),
            _ => {}
        }
        i += 1;
    }

    Err(Error::HtmlParse("unclosed declaration tag".into()))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
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
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
        *i += 1;
        return Ok(decode_html_character_references(value));
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }
    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
    Ok(decode_html_character_references(value))
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

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "frame"
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
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_case_insensitive_raw_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let tag_end = j + tag.len();
            if tag_end <= bytes.len()
                && bytes[j..tag_end].eq_ignore_ascii_case(tag)
                && bytes.get(tag_end).is_none_or(|b| !b.is_ascii_alphanumeric())
            {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
#[path = "tests/html.rs"]
mod tests;
