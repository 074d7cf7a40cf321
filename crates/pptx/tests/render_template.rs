use deck_core::{parse, ChartType, Rgb, SlideType};
use deck_pptx::{
    DeckRenderer, EmuRect, LayoutMapping, LayoutRef, PlanOp, RenderPlan, ShapeKind, StyleConfig,
    TemplateCatalog,
};
use std::io::{Cursor, Write};

const LAYOUTS: [(&str, &str); 5] = [
    (
        "表紙",
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
           <p:sp><p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:cNvSpPr/><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    ),
    (
        "目次",
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
           <p:sp><p:nvSpPr><p:cNvPr id="3" name="Text 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    ),
    (
        "中見出し",
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
           <p:sp><p:nvSpPr><p:cNvPr id="3" name="Text 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    ),
    (
        "コンテンツ",
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
           <p:sp><p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
             <p:spPr><a:xfrm><a:off x="838200" y="1825625"/><a:ext cx="10515600" cy="4351338"/></a:xfrm></p:spPr></p:sp>
           <p:sp><p:nvSpPr><p:cNvPr id="4" name="Text 3"/><p:cNvSpPr/><p:nvPr><p:ph type="body" sz="quarter" idx="13"/></p:nvPr></p:nvSpPr>
             <p:spPr><a:xfrm><a:off x="838200" y="1200000"/><a:ext cx="10515600" cy="500000"/></a:xfrm></p:spPr></p:sp>"#,
    ),
    ("裏表紙", ""),
];

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

fn template_bytes() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    let mut add = |name: &str, content: String| {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    };

    add(
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
        ),
    );
    add(
        "ppt/_rels/presentation.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/></Relationships>"#
            .to_string(),
    );

    // Layout ids listed in reverse relationship order.
    let ids: String = (1..=LAYOUTS.len())
        .map(|i| {
            format!(
                r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#,
                2147483648 + i,
                LAYOUTS.len() + 1 - i
            )
        })
        .collect();
    add(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            r#"<p:sldMaster {NS}><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
<p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm></p:spPr></p:sp>
</p:spTree></p:cSld><p:sldLayoutIdLst>{ids}</p:sldLayoutIdLst></p:sldMaster>"#
        ),
    );

    let rels: String = (1..=LAYOUTS.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout{}.xml"/>"#,
                LAYOUTS.len() + 1 - i,
                i
            )
        })
        .collect();
    add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#),
    );

    for (i, (name, shapes)) in LAYOUTS.iter().enumerate() {
        add(
            &format!("ppt/slideLayouts/slideLayout{}.xml", i + 1),
            format!(r#"<p:sldLayout {NS}><p:cSld name="{name}"><p:spTree>{shapes}</p:spTree></p:cSld></p:sldLayout>"#),
        );
    }

    zip.finish().unwrap().into_inner()
}

fn catalog() -> TemplateCatalog {
    TemplateCatalog::from_reader(Cursor::new(template_bytes())).unwrap()
}

#[test]
fn test_catalog_reads_layouts_in_master_order() {
    let catalog = catalog();

    assert_eq!((catalog.slide_width, catalog.slide_height), (12192000, 6858000));
    let names: Vec<_> = catalog.layouts.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["表紙", "目次", "中見出し", "コンテンツ", "裏表紙"]);
    assert_eq!(catalog.layouts[3].path, "ppt/slideLayouts/slideLayout4.xml");

    let content = catalog.find_layout("コンテンツ").unwrap();
    assert_eq!(content.index, 3);
    assert_eq!(
        content.placeholder(1).unwrap().rect,
        Some(EmuRect::new(838200, 1825625, 10515600, 4351338))
    );
    assert_eq!(content.placeholder(13).unwrap().kind.as_deref(), Some("body"));

    // Title position comes from the master.
    let title = content.title_placeholder().unwrap();
    assert_eq!(title.rect, Some(EmuRect::new(838200, 365125, 10515600, 1325563)));

    assert!(catalog.layouts[4].placeholders.is_empty());
}

#[test]
fn test_open_file_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.pptx");
    std::fs::write(&path, template_bytes()).unwrap();

    assert_eq!(TemplateCatalog::open(&path).unwrap(), catalog());
    assert!(matches!(
        TemplateCatalog::open(&dir.path().join("missing.pptx")),
        Err(deck_core::Error::NotFound(_))
    ));
}

fn ops_of(plan: &RenderPlan, slide: usize) -> &[PlanOp] {
    &plan.slides()[slide].ops
}

#[test]
fn test_render_deck_into_plan() {
    let dir = tempfile::tempdir().unwrap();
    let picture = dir.path().join("photo.png");
    std::fs::write(&picture, b"png").unwrap();

    let markdown = format!(
        "<!-- layout: 表紙 -->
# Cover Title
## Sub

---
<!-- layout: コンテンツ -->
# Results
## FY2025
Line one
Line two
```chart:bar
Region, Sales
East, 10
```
```diagram:process
A
B
```
<!-- element: type=text, rect=[0.1, 0.8, 0.5, 0.1], size=9 -->
Note
![Photo]({})
![Missing](does/not/exist.png)

---
<!-- layout: 裏表紙 -->
# Thanks
",
        picture.display()
    );
    let deck = parse(&markdown);

    let mut plan = RenderPlan::new(catalog());
    let output = dir.path().join("plan.json");
    let summary = DeckRenderer::new().render(&deck, &mut plan, &output).unwrap();

    assert_eq!(summary.slides_rendered, 3);
    assert_eq!(summary.slides_skipped, 0);
    // Back cover title has no placeholder; one image is missing.
    assert_eq!(summary.units_skipped, 2);

    let cover = ops_of(&plan, 0);
    assert_eq!(cover.len(), 2);
    match &cover[0] {
        PlanOp::PlaceholderText { idx, paragraphs, style } => {
            assert_eq!(*idx, 0);
            assert_eq!(paragraphs, &vec!["Cover Title".to_string()]);
            assert_eq!(style.size, 32.0);
        }
        other => panic!("unexpected op {:?}", other),
    }
    assert!(matches!(&cover[1], PlanOp::PlaceholderText { idx: 1, .. }));

    let content = ops_of(&plan, 1);
    match &content[1] {
        PlanOp::PlaceholderText { idx, paragraphs, style } => {
            assert_eq!(*idx, 1);
            assert_eq!(paragraphs, &vec!["Line one".to_string(), "Line two".to_string()]);
            assert_eq!(style.size, 14.0);
        }
        other => panic!("unexpected op {:?}", other),
    }
    assert!(matches!(&content[2], PlanOp::PlaceholderText { idx: 13, .. }));
    match &content[3] {
        PlanOp::Chart { chart, rect } => {
            assert_eq!(chart.chart_type, ChartType::BarClustered);
            assert_eq!(*rect, EmuRect::new(838200, 1825625, 10515600, 4351338));
        }
        other => panic!("unexpected op {:?}", other),
    }
    let shapes: Vec<_> = content
        .iter()
        .filter_map(|op| match op {
            PlanOp::Shape { shape } => Some(shape.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        shapes,
        vec![ShapeKind::RoundedRectangle, ShapeKind::RightArrow, ShapeKind::RoundedRectangle]
    );
    match &content[7] {
        PlanOp::TextBox { text, rect, style } => {
            assert_eq!(text, "Note");
            assert_eq!(style.size, 9.0);
            assert_eq!(*rect, EmuRect::new(1219200, 5486400, 6096000, 685800));
        }
        other => panic!("unexpected op {:?}", other),
    }
    assert!(matches!(&content[8], PlanOp::Picture { .. }));
    assert_eq!(content.len(), 9);

    assert!(ops_of(&plan, 2).is_empty());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved["slides"].as_array().unwrap().len(), 3);
    assert_eq!(saved["slides"][1]["layout_name"], "コンテンツ");
    assert_eq!(saved["slides"][1]["ops"][0]["op"], "placeholder_text");
}

#[test]
fn test_unresolved_layout_skips_slide() {
    let deck = parse("# Only content\n\n---\n<!-- layout: 目次 -->\n# Agenda\n1. One");
    assert_eq!(deck.slides[0].slide_type, SlideType::Content);

    let mapping = LayoutMapping::default()
        .with_layout(SlideType::Content, LayoutRef::Name("Nonexistent".to_string()));
    let mut plan = RenderPlan::new(catalog());
    let dir = tempfile::tempdir().unwrap();

    let summary = DeckRenderer::new()
        .with_mapping(mapping)
        .render(&deck, &mut plan, &dir.path().join("plan.json"))
        .unwrap();

    assert_eq!(summary.slides_rendered, 1);
    assert_eq!(summary.slides_skipped, 1);
    assert_eq!(plan.slides()[0].layout_name, "目次");
}

#[test]
fn test_save_failure_propagates() {
    let deck = parse("# Title");
    let mut plan = RenderPlan::new(catalog());
    let dir = tempfile::tempdir().unwrap();

    let result = DeckRenderer::new().render(&deck, &mut plan, &dir.path().join("no/such/dir/plan.json"));
    assert!(result.is_err());
}

#[test]
fn test_custom_styles_reach_drawing_calls() {
    let deck = parse(
        "<!-- layout: コンテンツ -->\n# Styled\n<!-- element: type=text, rect=[0.1, 0.1, 0.2, 0.1] -->\nBox",
    );
    let styles = StyleConfig::from_json(
        r#"{"regular_font": "Arial", "primary": {"r": 200, "g": 0, "b": 0}, "main_text": {"r": 10, "g": 10, "b": 10}}"#,
    )
    .unwrap();
    let mut plan = RenderPlan::new(catalog());
    let dir = tempfile::tempdir().unwrap();

    DeckRenderer::new()
        .with_styles(styles)
        .render(&deck, &mut plan, &dir.path().join("plan.json"))
        .unwrap();

    let ops = ops_of(&plan, 0);
    match &ops[0] {
        PlanOp::PlaceholderText { style, .. } => {
            assert_eq!(style.font, "Arial");
            assert_eq!(style.color, Rgb::new(200, 0, 0));
        }
        other => panic!("unexpected op {:?}", other),
    }
    match &ops[1] {
        PlanOp::TextBox { text, style, .. } => {
            assert_eq!(text, "Box");
            assert_eq!(style.font, "Arial");
            assert_eq!(style.size, 12.0);
            assert_eq!(style.color, Rgb::new(10, 10, 10));
        }
        other => panic!("unexpected op {:?}", other),
    }
}
