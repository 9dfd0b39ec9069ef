use super::*;

fn assert_text(html: &str, expected: &str, expected_without_form_controls: &str) -> Result<()> {
    let dom = Dom::parse(html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    assert_eq!(index.text(), expected, "text of {html}");
    assert_eq!(
        index.text_without_form_controls(),
        expected_without_form_controls,
        "text without form controls of {html}"
    );
    Ok(())
}

fn body(inner: &str) -> String {
    format!("<html><body>{inner}</body></html>")
}

fn by_id(dom: &Dom, id: &str) -> Result<NodeId> {
    dom.require_by_id(id)
}

#[test]
fn empty_page_has_no_text() -> Result<()> {
    assert_text(&body(""), "", "")
}

#[test]
fn whitespace_and_line_breaks_collapse() -> Result<()> {
    assert_text(&body("a simple\ntext"), "a simple text", "a simple text")?;
    assert_text(&body("a<br>simple <br> text"), "a simple text", "a simple text")
}

#[test]
fn paragraphs_are_framed_by_blanks() -> Result<()> {
    let html = body(
        "before<p>Paragraph 1</p>between<p>Paragraph 2</p><p> Paragraph 3</p>\
         <p>Paragraph 4 </p> <p>Paragraph 5</p><p>Paragraph 6</p> <p>Paragraph <br>7</p>after",
    );
    let expected = "before Paragraph 1 between Paragraph 2 Paragraph 3 Paragraph 4 \
                    Paragraph 5 Paragraph 6 Paragraph 7 after";
    assert_text(&html, expected, expected)
}

#[test]
fn inline_elements_keep_text_glued() -> Result<()> {
    let html = body(
        "before<span>Span 1</span>between<span> Span 2</span>between<span>Span 3 </span>between \
         <span>Span 4</span>between<span>Span 5</span> between<span>Span 6</span><span>Span 7</span>\
         between<span>Span 8</span> <span>Span 9</span>after",
    );
    let expected = "beforeSpan 1between Span 2betweenSpan 3 between Span 4betweenSpan 5 \
                    betweenSpan 6Span 7betweenSpan 8 Span 9after";
    assert_text(&html, expected, expected)
}

#[test]
fn formatting_elements_do_not_add_blanks() -> Result<()> {
    let html = body(
        "before<b>1</b><big>2</big><em>3</em><i>4</i><small>5</small><strong>6</strong><sub>7</sub>\
         <sup>8</sup><ins>9</ins><del>10</del><b> 11</b><b>12 </b><b>13</b> <b>14</b>after",
    );
    let expected = "before12345678910 1112 13 14after";
    assert_text(&html, expected, expected)
}

#[test]
fn preformatted_block_and_quotation() -> Result<()> {
    let html = body(
        "before<code>1</code><kbd>2</kbd><samp>3</samp><tt>4</tt><var>5</var><pre>6</pre>after",
    );
    assert_text(&html, "before12345 6 after", "before12345 6 after")?;

    let html = body(
        "before<abbr title='a'>1</abbr><acronym title='b'>2</acronym><q>3</q><cite>4</cite>\
         <dfn>5</dfn>after",
    );
    assert_text(&html, "before12\"3\"45after", "before12\"3\"45after")
}

#[test]
fn table_cells_are_separated() -> Result<()> {
    let html = body(
        "before<table><tr>  <th>header1</th><th>header2</th></tr><tr>  <td>data1</td><td> data2</td>\
         </tr><tr>  <td>data3 </td><td>data4</td></tr><tr>  <td colspan='2'>data5</td></tr><tr>  \
         <td rowspan='2'>data6</td><td>data7</td></tr><tr>  <td>data8</td></tr></table>after",
    );
    let expected = "before header1 header2 data1 data2 data3 data4 data5 data6 data7 data8 after";
    assert_text(&html, expected, expected)
}

#[test]
fn ordered_list_items_are_numbered() -> Result<()> {
    let html = body(
        "before<ol id='idOl'>  <li id='idLi1'>Line1  <li id='idLi2'>Line2  <li> Line3  <li>Line4 </ol>after",
    );
    let expected = "before 1. Line1 2. Line2 3. Line3 4. Line4 after";
    assert_text(&html, expected, expected)?;

    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let first = by_id(&dom, "idLi1")?;
    let second = by_id(&dom, "idLi2")?;
    assert_eq!(index.as_text(first).as_deref(), Some("1. Line1"));
    assert_eq!(index.text_before(first).as_deref(), Some("before"));
    assert_eq!(index.as_text(second).as_deref(), Some("2. Line2"));
    assert_eq!(index.text_before(second).as_deref(), Some("before 1. Line1"));
    Ok(())
}

#[test]
fn unordered_and_definition_lists_are_blocks() -> Result<()> {
    let html = body("before<ul>  <li>Line1  <li>Line2  <li> Line3  <li>Line4 </ul>after");
    let expected = "before Line1 Line2 Line3 Line4 after";
    assert_text(&html, expected, expected)?;

    let html = body(
        "before<dl>  <dt>Term 1</dt>  <dd>Definition 1</dd>  <dt>Term 2.1</dt>  <dt> Term 2.2</dt>\
         </dl>after",
    );
    let expected = "before Term 1 Definition 1 Term 2.1 Term 2.2 after";
    assert_text(&html, expected, expected)
}

#[test]
fn images_contribute_their_alt_text() -> Result<()> {
    let html = body(
        "before<img src='src.img'>between<img src='src.img' alt='test image1'>between\
         <img src='src.img' title='test image2'>after",
    );
    let expected = "before between test image1 between after";
    assert_text(&html, expected, expected)
}

#[test]
fn select_options_only_in_full_text() -> Result<()> {
    assert_text(&body("before<select></select>after"), "before after", "before after")?;

    let html = body(
        "before<select><option value='o_1'>color 1</option><option value='o_2'>color 2</option>\
         <option value='o_3' selected>color 3</option><option value='o_4'> color 4</option>\
         <option value='o_5'>color 5 </option></select>after",
    );
    assert_text(
        &html,
        "before color 1 color 2 color 3 color 4 color 5 after",
        "before after",
    )?;

    let html = body(
        "before<select><option value='o_1'>color 1</option><optgroup label='group 1'>\
         <option value='o_2'>color 2</option></optgroup><optgroup label=' group 2'>\
         <option value='o_3'>color 3</option></optgroup><option value='o_5'>color 5</option>\
         </select>after",
    );
    assert_text(
        &html,
        "before color 1 group 1 color 2 group 2 color 3 color 5 after",
        "before after",
    )
}

#[test]
fn text_inputs_show_value_or_placeholder() -> Result<()> {
    for kind in ["text", "password"] {
        let html = body(&format!(
            "before<input type='{kind}' value=''>between<input type='{kind}' value='v 2'>between\
             <input type='{kind}' value='v 3' placeholder='p 3'>between\
             <input type='{kind}' value='' placeholder='p 4'>after"
        ));
        assert_text(
            &html,
            "beforebetweenv 2betweenv 3betweenp 4after",
            "beforebetweenbetweenbetweenafter",
        )?;
    }

    let html = body("before<input type='file' value=''>between<input type='file' value='v 2'>after");
    assert_text(&html, "beforebetweenafter", "beforebetweenafter")
}

#[test]
fn textarea_shows_content_or_placeholder() -> Result<()> {
    let html = body(
        "before<textarea></textarea>between<textarea>v 2</textarea>between\
         <textarea placeholder='p 3'>v 3</textarea>between<textarea placeholder='p 4'></textarea>after",
    );
    assert_text(
        &html,
        "beforebetweenv 2betweenv 3betweenp 4after",
        "beforebetweenbetweenbetweenafter",
    )
}

#[test]
fn buttons_are_framed_and_stripped_from_reduced_text() -> Result<()> {
    for kind in ["submit", "reset", "button"] {
        let html = body(&format!(
            "before<input type='{kind}'><input type='{kind}' value='Click Me'>after"
        ));
        assert_text(&html, "before Click Me after", "before after")?;
    }
    assert_text(
        &body("before<button></button><button>Click Me</button>after"),
        "before Click Me after",
        "before after",
    )?;
    assert_text(
        &body(
            "before<input type='image' src='src.img'>between\
             <input type='image' src='src.img' alt='test image1'>after",
        ),
        "before between test image1 after",
        "before between after",
    )
}

#[test]
fn checkboxes_and_radios_only_add_blanks() -> Result<()> {
    for kind in ["radio", "checkbox"] {
        let html = body(&format!(
            "before<input type='{kind}'><input type='{kind}' value='value'><input type='{kind}' checked>after"
        ));
        assert_text(&html, "before after", "before after")?;
    }
    Ok(())
}

#[test]
fn labels_frame_their_content() -> Result<()> {
    assert_text(
        &body("before<label>LabelBefore<input type='radio'>LabelAfter</label>after"),
        "before LabelBefore LabelAfter after",
        "before LabelBefore LabelAfter after",
    )?;
    assert_text(
        &body(
            "before<label>LabelBefore<select><option>Option1Value<option>Option2Value</select>\
             LabelAfter</label>after",
        ),
        "before LabelBefore Option1Value Option2Value LabelAfter after",
        "before LabelBefore LabelAfter after",
    )
}

#[test]
fn scripts_and_styles_are_silent() -> Result<()> {
    assert_text(
        &body("before<script language='JavaScript' type='text/javascript'>function foo() {}</script>after"),
        "beforeafter",
        "beforeafter",
    )?;
    assert_text(
        &body("before<style type='text/css'>.line {}</style>after"),
        "beforeafter",
        "beforeafter",
    )
}

#[test]
fn css_display_changes_framing() -> Result<()> {
    let html = body(
        "<style type='text/css'> .line { display: block; } </style>before<span class='line'>Span 1</span>\
         between<span class='line'>Span 2</span><span class='line'> Span 3</span>after",
    );
    let expected = "before Span 1 between Span 2 Span 3 after";
    assert_text(&html, expected, expected)?;

    let html = body(
        "<style type='text/css'> .line { display: inline; } </style>before<div class='line'>Division 1</div>\
         between<div class='line'>Division 2</div><div class='line'>Division 3</div>after",
    );
    let expected = "beforeDivision 1betweenDivision 2Division 3after";
    assert_text(&html, expected, expected)?;

    let html = body(
        "<style type='text/css'> .line { display: none; } </style>before<div class='line'>Division 1</div>\
         between<span class='line'>Span 1</span>after",
    );
    assert_text(&html, "beforebetweenafter", "beforebetweenafter")
}

#[test]
fn visibility_hidden_can_be_overridden_by_children() -> Result<()> {
    let html = body(
        "<style type='text/css'> .line { visibility: hidden; } </style>before\
         <div class='line'>Division 1</div>between<div class='line'>D<span>Span 1</span>d</div>between\
         <div class='line'><span style='visibility: visible;'>DSpan 2</span></div>between\
         <span class='line'>Span 1</span>between<span class='line'><div>SDivision 1</div></span>between\
         <span class='line'>S<div style='visibility: visible;'>Division 2</div>s</span>after",
    );
    let expected = "beforebetweenbetweenDSpan 2betweenbetweenbetween Division 2 after";
    assert_text(&html, expected, expected)
}

#[test]
fn opacity_does_not_hide_text() -> Result<()> {
    let html = body(
        "<style type='text/css'> .line { opacity: 0; } </style>before<div class='line'>Division 1</div>\
         between<span class='line'>Span 1</span>after",
    );
    let expected = "before Division 1 betweenSpan 1after";
    assert_text(&html, expected, expected)
}

#[test]
fn screen_reader_only_clip_hides_text() -> Result<()> {
    let html = body(
        "before<span style='position: absolute; clip: rect(0px, 0px, 1px, 1px)'>hidden</span>after",
    );
    assert_text(&html, "beforeafter", "beforeafter")
}

#[test]
fn screen_reader_only_clip_hides_nested_elements() -> Result<()> {
    let html = body(
        "before<span style='position:absolute;clip:rect(0px,0px,1px,1px)'><b id='hidden'>hidden</b></span>after",
    );
    assert_text(&html, "beforeafter", "beforeafter")?;

    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let hidden = by_id(&dom, "hidden")?;
    assert!(!index.is_visible(hidden));
    assert!(!index.visible_elements().contains(&hidden));
    Ok(())
}

#[test]
fn deeply_nested_page_indexes() -> Result<()> {
    let depth = 1500;
    let html = body(&format!(
        "{}<b id='leaf'>deep</b>{}",
        "<span>".repeat(depth),
        "</span>".repeat(depth)
    ));
    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    assert_eq!(index.text(), "deep");
    assert!(index.is_visible(by_id(&dom, "leaf")?));
    Ok(())
}

#[test]
fn text_transform_is_applied_and_inherited() -> Result<()> {
    let html = body(
        "<p style='text-transform: lowercase;'>LoWerCase</p><p style='text-transform: uppercase;'>uppErCase</p>\
         <p style='text-transform: capitalize;'>capiTalize</p><p style='text-transform: none;'>nOne</p>\
         <div style='text-transform: uppercase'><p>insideDiv</p></div>",
    );
    let expected = "lowercase UPPERCASE CapiTalize nOne INSIDEDIV";
    assert_text(&html, expected, expected)
}

#[test]
fn head_content_is_not_rendered() -> Result<()> {
    let html = "<html><head><META http-equiv='Content-Type' content='text/html; charset=UTF-8'>\
                <title>Page Title</title></head><body><p>Paragraph 1</p><p>Paragraph 2</p></body></html>";
    assert_text(html, "Paragraph 1 Paragraph 2", "Paragraph 1 Paragraph 2")
}

#[test]
fn mixed_inline_markup() -> Result<()> {
    assert_text(
        &body("<p>This t<font color='red'>ext</font> is <b>styled</b>.</p>"),
        "This text is styled.",
        "This text is styled.",
    )?;
    assert_text(
        "<html><body><table><tr><td style='color:#222288'>Table C<font color='red'>lickable</font> \
         <b>forma<i>ted</i> t</b>ext</td></tr></table></body></html>",
        "Table Clickable formated text",
        "Table Clickable formated text",
    )?;
    assert_text(
        &body("<p>Fi<font color='red'>eld</font>4</p></p>"),
        "Field4",
        "Field4",
    )
}

#[test]
fn all_controls_in_one_form() -> Result<()> {
    let html = body(
        "<p>PageStart</p><form action='test'><p> </p><fieldset><legend id='idLegend'>LegendLabel</legend>\
         </fieldset><p> </p><label id='idLabel' for='TextInput'>LabelLabel</label><p> </p>\
         <input id='idTextInput' name='TextInput' type='text' value='inputValue'><p> </p>\
         <input name='PasswordInput' type='password' value='' placeholder='my pwd placeholder'><p> </p>\
         <input name='HiddenInput' type='hidden' value='hiddenInputValue'><p> </p>\
         <textarea name='TextArea'>textAreaValue</textarea><p> </p><input name='FileInput' type='file'>\
         <p> </p><select id='idSingleSelect' name='SingleSelect'><option selected>Option1Value\
         <option>Option2Value</select><p> </p>\
         <input name='RadioInput' type='radio' value='radioInputValue1'>radioInputLabel1\
         <input name='RadioInput' type='radio' value='radioInputValue2' checked>radioInputLabel2<p> </p>\
         <button name='ButtonButton' type='button' value='buttonButtonValue'>buttonButtonLabel</button>\
         <p> </p><input name='SubmitInput' type='submit' value='submitInputValue'></form>",
    );
    assert_text(
        &html,
        "PageStart LegendLabel LabelLabel inputValue my pwd placeholder textAreaValue Option1Value \
         Option2Value radioInputLabel1 radioInputLabel2 buttonButtonLabel submitInputValue",
        "PageStart LegendLabel LabelLabel radioInputLabel1 radioInputLabel2",
    )?;

    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    assert_eq!(
        index.text_before(by_id(&dom, "idLegend")?).as_deref(),
        Some("PageStart")
    );
    assert_eq!(
        index.text_before(by_id(&dom, "idLabel")?).as_deref(),
        Some("PageStart LegendLabel")
    );
    assert_eq!(
        index.as_text(by_id(&dom, "idTextInput")?).as_deref(),
        Some("inputValue")
    );
    assert_eq!(
        index.as_text(by_id(&dom, "idSingleSelect")?).as_deref(),
        Some("Option1Value Option2Value")
    );
    Ok(())
}

fn index_hierarchy_position(html: &str) -> Result<(usize, String, FindSpot)> {
    let dom = Dom::parse(html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let node = by_id(&dom, "myID")?;
    let position = index
        .position(node)
        .ok_or_else(|| Error::NodeNotFound("myID".into()))?;
    let hierarchy = index.hierarchy(node).unwrap_or_default().to_string();
    let visit = index
        .index_of(node)
        .ok_or_else(|| Error::NodeNotFound("myID".into()))?;
    Ok((visit, hierarchy, position))
}

#[test]
fn document_skeleton_indices() -> Result<()> {
    for html in [
        "<html><head></head><body></body></html>",
        "<html><body></body></html>",
    ] {
        let dom = Dom::parse(html)?;
        let index = PageIndex::build(&dom, &LocatorConfig::default())?;
        let document = dom.root();
        let root = dom
            .document_element(document)
            .ok_or_else(|| Error::NodeNotFound("html".into()))?;
        let head = dom
            .head(document)
            .ok_or_else(|| Error::NodeNotFound("head".into()))?;
        let body = dom
            .body(document)
            .ok_or_else(|| Error::NodeNotFound("body".into()))?;
        assert_eq!(index.index_of(root), Some(1));
        assert_eq!(index.index_of(head), Some(2));
        assert_eq!(index.index_of(body), Some(3));
        assert_eq!(index.hierarchy(root), Some("0>1"));
        assert_eq!(index.hierarchy(head), Some("0>1>2"));
        assert_eq!(index.hierarchy(body), Some("0>1>3"));
        for node in [root, head, body] {
            assert_eq!(index.position(node), Some(FindSpot::new(0, 0)));
        }
    }
    Ok(())
}

#[test]
fn index_hierarchy_and_position_goldens() -> Result<()> {
    let cases = [
        ("<div id='myID'></div>", 4, "0>1>3>4", (0, 0)),
        ("<div id='myID'>text</div>", 4, "0>1>3>4", (0, 4)),
        ("before<div id='myID'></div>", 5, "0>1>3>5", (6, 6)),
        ("<div></div><div id='myID'></div>", 5, "0>1>3>5", (0, 0)),
        ("<div>text</div><div id='myID'></div>", 6, "0>1>3>6", (4, 4)),
        ("<!-- comment --><div id='myID'></div>", 5, "0>1>3>5", (0, 0)),
        ("<div><div id='myID'></div></div>", 5, "0>1>3>4>5", (0, 0)),
        ("<div>before<div id='myID'></div></div>", 6, "0>1>3>4>6", (6, 6)),
        ("<div><div></div><div id='myID'></div></div>", 6, "0>1>3>4>6", (0, 0)),
        ("<div id='myID' style='display: none;'>text</div>", 4, "0>1>3>4", (0, 0)),
        ("<div style='display: none;'>text</div><div id='myID'></div>", 6, "0>1>3>6", (0, 0)),
        ("<div style='display: none;'><div id='myID'></div></div>", 5, "0>1>3>4>5", (0, 0)),
        ("<div id='myID' style='visibility: hidden;'>text</div>", 4, "0>1>3>4", (0, 0)),
        ("<div style='visibility: hidden;'>text</div><div id='myID'></div>", 6, "0>1>3>6", (0, 0)),
        (
            "<div style='visibility: hidden;'><div id='myID'>text</div></div>",
            5,
            "0>1>3>4>5",
            (0, 0),
        ),
        (
            "<div style='visibility: hidden;'><div id='myID' style='visibility: visible;'>text</div></div>",
            5,
            "0>1>3>4>5",
            (0, 4),
        ),
    ];

    for (inner, visit, hierarchy, (start, end)) in cases {
        let (actual_visit, actual_hierarchy, position) = index_hierarchy_position(&body(inner))?;
        assert_eq!(actual_visit, visit, "index of {inner}");
        assert_eq!(actual_hierarchy, hierarchy, "hierarchy of {inner}");
        assert_eq!(position, FindSpot::new(start, end), "position of {inner}");
    }
    Ok(())
}

#[test]
fn table_parts_as_text_and_text_before() -> Result<()> {
    let html = body(
        "<table id='idTable'><tr id='idTr1'>  <th id='idTh1'>header1</th><th id='idTh2'>header2</th></tr>\
         <tr id='idTr2'>  <td id='idTd1'>data1</td><td id='idTd2'>data2</td></tr>\
         <tr id='idTr4'>  <td colspan='2' id='idTd5'>data5</td></tr></table>",
    );
    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;

    let expectations = [
        ("idTable", "header1 header2 data1 data2 data5", ""),
        ("idTr1", "header1 header2", ""),
        ("idTh1", "header1", ""),
        ("idTh2", "header2", "header1"),
        ("idTr2", "data1 data2", "header1 header2"),
        ("idTd2", "data2", "header1 header2 data1"),
        ("idTd5", "data5", "header1 header2 data1 data2"),
    ];
    for (id, as_text, before) in expectations {
        let node = by_id(&dom, id)?;
        assert_eq!(index.as_text(node).as_deref(), Some(as_text), "as text of {id}");
        assert_eq!(index.text_before(node).as_deref(), Some(before), "text before {id}");
    }
    Ok(())
}

fn labeling_before(html: &str, id: &str) -> Result<Option<String>> {
    let dom = Dom::parse(html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    index.labeling_text_before(by_id(&dom, id)?, 0)
}

fn labeling_after(html: &str, id: &str) -> Result<Option<String>> {
    let dom = Dom::parse(html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    index.labeling_text_after(by_id(&dom, id)?)
}

#[test]
fn labeling_text_before_stops_at_controls_and_forms() -> Result<()> {
    let input = "<input id='MyInputId' name='MyInputName' value='value1' type='text'>";
    let cases = [
        (format!("<form action='test'>{input}</form>"), ""),
        (format!("<form action='test'>MyLabel{input}</form>"), "MyLabel"),
        (
            format!("<form action='test'>MyLabel<input value='hiddenValue' type='hidden'>{input}</form>"),
            "MyLabel",
        ),
        (
            format!("<p>MoreText</p><form action='test'>MyLabel{input}</form>"),
            "MoreText MyLabel",
        ),
        (
            format!(
                "<form action='test2'><p>MoreText</p></form><form action='test'>MyLabel{input}</form>"
            ),
            "MyLabel",
        ),
        (
            format!(
                "<form action='test'>Other<input id='MyOtherInputId' value='value2' type='text'>\
                 MyLabel{input}</form>"
            ),
            "MyLabel",
        ),
        (
            format!(
                "<form action='test'>MyLabel <input id='MyOtherInputId' value='value2' type='text'> \
                 {input}</form>"
            ),
            "MyLabel value2",
        ),
    ];
    for (inner, expected) in cases {
        assert_eq!(
            labeling_before(&body(&inner), "MyInputId")?.as_deref(),
            Some(expected),
            "{inner}"
        );
    }

    let inside = body(
        "<form action='test'>before<button id='MyButton' type='button'>some button text\
         <img id='myImg'>after</button></form>",
    );
    assert_eq!(
        labeling_before(&inside, "myImg")?.as_deref(),
        Some("before some button text")
    );
    let direct = body(
        "<form action='test'>before<button id='MyButton' type='button'>some button text</button>\
         <img id='myImg'>after</form>",
    );
    assert_eq!(
        labeling_before(&direct, "myImg")?.as_deref(),
        Some("before some button text")
    );
    Ok(())
}

#[test]
fn labeling_text_after_stops_at_controls_and_form_end() -> Result<()> {
    let checkbox = "<input id='MyCheckboxId' name='MyCheckboxName' value='value1' type='checkbox'>";
    let cases = [
        (format!("<form action='test'>{checkbox}</form>"), ""),
        (format!("<form action='test'>{checkbox}CheckBox</form>"), "CheckBox"),
        (
            format!(
                "<form action='test'>{checkbox}CheckBox<input value='hiddenValue' type='hidden'>part2</form>"
            ),
            "CheckBoxpart2",
        ),
        (
            format!("<form action='test'>{checkbox}CheckBox</form><p>MoreText</p>"),
            "CheckBox",
        ),
        (
            format!(
                "<form action='test'>{checkbox}CheckBox<input name='MyOtherCheckboxName' value='value2' \
                 type='checkbox'>CheckBox2</form><p>MoreText</p>"
            ),
            "CheckBox",
        ),
    ];
    for (inner, expected) in cases {
        assert_eq!(
            labeling_after(&body(&inner), "MyCheckboxId")?.as_deref(),
            Some(expected),
            "{inner}"
        );
    }

    let inside = body(
        "<form action='test'><button id='MyButton' type='button'>before<img id='myImg'>some button text\
         </button>after</form>",
    );
    assert_eq!(
        labeling_after(&inside, "myImg")?.as_deref(),
        Some("some button text after")
    );
    let direct = body(
        "<form action='test'><img id='myImg'><button id='MyButton' type='button'>some button text</button>\
         after</form>",
    );
    assert_eq!(labeling_after(&direct, "myImg")?.as_deref(), Some(""));
    Ok(())
}

fn actions_of(html: &str) -> Result<MouseActions> {
    let dom = Dom::parse(html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    Ok(index.mouse_actions(by_id(&dom, "myId")?))
}

#[test]
fn mouse_actions_from_handlers_and_scripts() -> Result<()> {
    assert!(actions_of(&body("<span id='myId'>some text</span>"))?.is_empty());
    assert!(
        actions_of(&body("<span id='myId' onclick='alert(1);'>some text</span>"))?
            .contains(MouseAction::Click)
    );
    assert!(
        actions_of(&body(
            "<span id='myId'>some text</span><script>document.getElementById('myId')\
             .addEventListener('click', function() { alert('clicked'); });</script>"
        ))?
        .contains(MouseAction::Click)
    );
    assert!(
        actions_of(&body(
            "<span id='myId'>some text</span><script>document.getElementById('myId').onclick = \
             function() { alert('clicked'); };</script>"
        ))?
        .contains(MouseAction::Click)
    );
    Ok(())
}

#[test]
fn mouse_actions_are_inherited() -> Result<()> {
    let nested = actions_of(&body(
        "<div onclick='go()'><p><em><span id='myId'>some text</span></em></p></div>",
    ))?;
    assert!(nested.contains(MouseAction::Click));

    let combined = actions_of(&body(
        "<span onclick='go()'><span onmouseover='go()'><span id='myId'>some text</span></span></span>",
    ))?;
    assert!(combined.contains(MouseAction::Click));
    assert!(combined.contains(MouseAction::MouseOver));

    assert!(
        !actions_of("<html onclick='go()'><body><span id='myId'>some text</span></body></html>")?
            .contains(MouseAction::Click)
    );
    assert!(
        !actions_of("<html><body onclick='go()'><span id='myId'>some text</span></body></html>")?
            .contains(MouseAction::Click)
    );
    Ok(())
}

#[test]
fn buttons_and_links_make_content_clickable() -> Result<()> {
    assert!(!actions_of(&body("<button id='myId'>some text</button>"))?.contains(MouseAction::Click));
    assert!(
        actions_of(&body("<button><span id='myId'>some text</span></button>"))?
            .contains(MouseAction::Click)
    );
    assert!(!actions_of(&body("<a id='myId'>some text</a>"))?.contains(MouseAction::Click));
    assert!(
        !actions_of(&body("<a><span id='myId'>some text</span></a>"))?.contains(MouseAction::Click)
    );
    assert!(!actions_of(&body("<a id='myId' href='#'>some text</a>"))?.contains(MouseAction::Click));
    assert!(
        actions_of(&body("<a href='#'><span id='myId'>some text</span></a>"))?
            .contains(MouseAction::Click)
    );
    Ok(())
}

#[test]
fn event_to_action_mapping() -> Result<()> {
    let cases = [
        ("onclick", [true, true, false, false]),
        ("onmousedown", [true, true, true, false]),
        ("onmouseup", [true, true, true, false]),
        ("ondblclick", [false, true, false, false]),
        ("oncontextmenu", [false, false, true, false]),
        ("onmouseover", [false, false, false, true]),
        ("onmousemove", [false, false, false, true]),
        ("onmouseout", [false, false, false, true]),
    ];
    for (handler, expected) in cases {
        let actions = actions_of(&body(&format!(
            "<span id='myId' {handler}='alert(1);'>some text</span>"
        )))?;
        for (action, present) in MouseAction::ALL.into_iter().zip(expected) {
            assert_eq!(actions.contains(action), present, "{handler} {action:?}");
        }
    }
    Ok(())
}

#[test]
fn frames_are_indexed_in_place_with_fresh_actions() -> Result<()> {
    let html = body(
        "<div onclick='go()'>before<iframe id='frame' srcdoc=\"<p id='inner'>framed</p>\"></iframe>after</div>",
    );
    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    assert_eq!(index.text(), "before framed after");

    let frame = by_id(&dom, "frame")?;
    let document = dom
        .frame_document(frame)
        .ok_or_else(|| Error::NodeNotFound("frame document".into()))?;
    let inner = dom
        .by_id_in(document, "inner")
        .ok_or_else(|| Error::NodeNotFound("inner".into()))?;
    assert_eq!(index.as_text(inner).as_deref(), Some("framed"));
    assert!(!index.has_click_listener(inner));
    let frame_hierarchy = index.hierarchy(frame).unwrap_or_default();
    assert!(
        index
            .hierarchy(inner)
            .is_some_and(|path| path.starts_with(frame_hierarchy))
    );
    Ok(())
}

#[test]
fn visible_lists_have_both_orders() -> Result<()> {
    let html = body("<div id='outer'><span id='inner'>x</span></div><p id='hidden' hidden>y</p>");
    let dom = Dom::parse(&html)?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let outer = by_id(&dom, "outer")?;
    let inner = by_id(&dom, "inner")?;
    let hidden = by_id(&dom, "hidden")?;

    let position = |list: &[NodeId], node| list.iter().position(|candidate| *candidate == node);
    assert!(position(index.visible_elements(), outer) < position(index.visible_elements(), inner));
    assert!(
        position(index.visible_elements_bottom_up(), inner)
            < position(index.visible_elements_bottom_up(), outer)
    );
    assert!(index.is_visible(inner));
    assert!(!index.is_visible(hidden));
    Ok(())
}

#[test]
fn dump_lists_every_visited_node() -> Result<()> {
    let dom = Dom::parse(&body("<p>x</p>"))?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let dump = index.dump();
    assert_eq!(dump.lines().count(), index.nodes().len());
    assert!(dump.starts_with("0 | 0 | #document | 0..1 | 0..1"));
    assert!(dump.contains("| p |"));
    assert!(dump.contains("| #text |"));
    Ok(())
}

#[test]
fn first_occurrence_searches_the_full_text() -> Result<()> {
    let dom = Dom::parse(&body("<p>foo</p><p>bar foo</p>"))?;
    let index = PageIndex::build(&dom, &LocatorConfig::default())?;
    let pattern = SearchPattern::compile("foo")?;
    assert_eq!(index.first_occurrence(&pattern), Some(FindSpot::new(0, 3)));
    assert_eq!(
        index.first_occurrence_from(&pattern, 1),
        Some(FindSpot::new(8, 11))
    );
    Ok(())
}
