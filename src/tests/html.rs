use super::*;
use crate::dom::NodeType;

fn outline(dom: &Dom, node: NodeId) -> String {
    match dom.node_type(node) {
        Some(NodeType::Document) => dom
            .children(node)
            .iter()
            .map(|child| outline(dom, *child))
            .collect::<Vec<_>>()
            .join(""),
        Some(NodeType::Element(element)) => {
            let inner = dom
                .children(node)
                .iter()
                .map(|child| outline(dom, *child))
                .collect::<Vec<_>>()
                .join("");
            format!("<{}>{}</{}>", element.tag_name, inner, element.tag_name)
        }
        Some(NodeType::Text(text)) => text.clone(),
        Some(NodeType::Comment(text)) => format!("<!--{text}-->"),
        None => String::new(),
    }
}

#[test]
fn skeleton_is_synthesized() -> Result<()> {
    let dom = parse_html("hello")?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head></head><body>hello</body></html>"
    );
    Ok(())
}

#[test]
fn explicit_skeleton_is_merged() -> Result<()> {
    let dom = parse_html(
        "<html lang='en'><head><title>T</title></head><body class='main'><p>x</p></body></html>",
    )?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head><title>T</title></head><body><p>x</p></body></html>"
    );
    let root = dom.document_element(dom.root());
    assert_eq!(root.and_then(|html| dom.attr(html, "lang")), Some("en"));
    let body = dom.body(dom.root());
    assert_eq!(body.and_then(|body| dom.attr(body, "class")), Some("main"));
    Ok(())
}

#[test]
fn comments_are_kept_inside_body() -> Result<()> {
    let dom = parse_html("<html><body><!-- note --><div></div></body></html>")?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head></head><body><!-- note --><div></div></body></html>"
    );
    Ok(())
}

#[test]
fn optional_end_tags_are_implied() -> Result<()> {
    let dom = parse_html("<ol><li>a<li>b</ol><p>one<p>two<select><option>x<option>y</select>")?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head></head><body><ol><li>a</li><li>b</li></ol><p>one</p>\
         <p>two<select><option>x</option><option>y</option></select></p></body></html>"
    );
    Ok(())
}

#[test]
fn table_rows_get_an_implied_tbody() -> Result<()> {
    let dom = parse_html("<table><tr><td>a<td>b<tr><td>c</table>")?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head></head><body><table><tbody><tr><td>a</td><td>b</td></tr>\
         <tr><td>c</td></tr></tbody></table></body></html>"
    );
    Ok(())
}

#[test]
fn void_and_self_closing_elements_have_no_children() -> Result<()> {
    let dom = parse_html("<p>a<br>b<img src='x.png'/>c<input type='text'>d</p>")?;
    assert_eq!(
        outline(&dom, dom.root()),
        "<html><head></head><body><p>a<br></br>b<img></img>c<input></input>d</p></body></html>"
    );
    Ok(())
}

#[test]
fn attributes_are_parsed_with_and_without_values() -> Result<()> {
    let dom = parse_html("<input id=plain type=\"checkbox\" checked data-testid='t 1'>")?;
    let input = dom.require_by_id("plain")?;
    assert_eq!(dom.attr(input, "type"), Some("checkbox"));
    assert_eq!(dom.attr(input, "checked"), Some(""));
    assert_eq!(dom.attr(input, "data-testid"), Some("t 1"));
    Ok(())
}

#[test]
fn character_references_are_decoded() -> Result<()> {
    let dom = parse_html("<p id='p'>a&amp;b &lt;c&gt; &#65;&#x42; &auml;&nbsp;x &unknown;</p>")?;
    let paragraph = dom.require_by_id("p")?;
    assert_eq!(
        dom.text_content(paragraph),
        "a&b <c> AB ä\u{00A0}x &unknown;"
    );
    Ok(())
}

#[test]
fn raw_text_elements_keep_markup() -> Result<()> {
    let dom = parse_html(
        "<p>x</p><script>if (a < b) { x = '<p>'; }</script><textarea id='t'>\n<b>bold</b></textarea>",
    )?;
    let textarea = dom.require_by_id("t")?;
    assert_eq!(dom.text_content(textarea), "<b>bold</b>");
    let body = dom
        .body(dom.root())
        .ok_or_else(|| Error::NodeNotFound("body".into()))?;
    let script = dom
        .descendant_elements(body)
        .into_iter()
        .find(|node| dom.is_tag(*node, "script"))
        .ok_or_else(|| Error::NodeNotFound("script".into()))?;
    assert_eq!(dom.text_content(script), "if (a < b) { x = '<p>'; }");
    Ok(())
}

#[test]
fn pre_drops_its_leading_newline() -> Result<()> {
    let dom = parse_html("<pre id='p'>\nline</pre>")?;
    assert_eq!(dom.text_content(dom.require_by_id("p")?), "line");
    Ok(())
}

#[test]
fn stray_less_than_is_text() -> Result<()> {
    let dom = parse_html("<p id='p'>1 < 2</p>")?;
    assert_eq!(dom.text_content(dom.require_by_id("p")?), "1 < 2");
    Ok(())
}

#[test]
fn unclosed_comment_is_an_error() {
    assert!(matches!(
        parse_html("<p>x<!-- never closed"),
        Err(Error::HtmlParse(_))
    ));
}

#[test]
fn unclosed_raw_text_is_an_error() {
    assert!(matches!(
        parse_html("<script>var a = 1;"),
        Err(Error::HtmlParse(_))
    ));
}

#[test]
fn srcdoc_becomes_a_frame_document() -> Result<()> {
    let dom = parse_html("<iframe id='f' srcdoc=\"<span id='same'>inner</span>\"></iframe><span id='same'>outer</span>")?;
    let frame = dom.require_by_id("f")?;
    let document = dom
        .frame_document(frame)
        .ok_or_else(|| Error::NodeNotFound("frame document".into()))?;
    assert_ne!(document, dom.root());

    let inner = dom
        .by_id_in(document, "same")
        .ok_or_else(|| Error::NodeNotFound("inner".into()))?;
    let outer = dom.require_by_id("same")?;
    assert_ne!(inner, outer);
    assert_eq!(dom.text_content(inner), "inner");
    assert_eq!(dom.text_content(outer), "outer");
    assert_eq!(dom.owner_document(inner), document);
    Ok(())
}

#[test]
fn script_listeners_are_registered() -> Result<()> {
    let dom = parse_html(
        "<span id='a'>a</span><span id='b'>b</span>\
         <script>\
           document.getElementById('a').addEventListener('CLICK', function () {});\
           document.getElementById(\"b\").onmouseover = function () {};\
           document.getElementById('b').onclick == null;\
         </script>",
    )?;
    let a = dom.require_by_id("a")?;
    let b = dom.require_by_id("b")?;
    assert!(dom.has_event_handler(a, "click"));
    assert!(dom.has_event_handler(b, "mouseover"));
    assert!(!dom.has_event_handler(b, "click"));
    Ok(())
}

#[test]
fn non_executable_scripts_register_nothing() -> Result<()> {
    let dom = parse_html(
        "<span id='a'>a</span><script type='text/template'>\
         document.getElementById('a').onclick = go;</script>",
    )?;
    assert!(!dom.has_event_handler(dom.require_by_id("a")?, "click"));
    Ok(())
}

#[test]
fn listener_extraction_shapes() {
    assert_eq!(
        extract_script_listeners(
            "getElementById( 'x' ) . addEventListener( \"dblclick\", f); getElementById(`y`).onContextMenu = g;"
        ),
        vec![
            ("x".to_string(), "dblclick".to_string()),
            ("y".to_string(), "contextmenu".to_string()),
        ]
    );
    assert!(extract_script_listeners("getElementById(id).onclick = f;").is_empty());
}

#[test]
fn style_blocks_feed_the_cascade() -> Result<()> {
    let dom = parse_html(
        "<style>.hide { display: none } #shown { display: block }</style>\
         <span id='shown' class='hide'>x</span><span id='gone' class='hide'>y</span>",
    )?;
    assert_eq!(dom.computed_style(dom.require_by_id("shown")?).display, "block");
    assert_eq!(dom.computed_style(dom.require_by_id("gone")?).display, "none");
    Ok(())
}
