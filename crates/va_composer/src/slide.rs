//! Reading and rewriting one slide's XML.
//!
//! Shapes are addressed by the `name` attribute of their `cNvPr` element.
//! The rewrite streams the document through quick-xml and only buffers one
//! shape at a time, so everything outside the targeted shapes is copied
//! byte for byte.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use va_core::{Error, Result};

use crate::package::local_name;

const BULLET_INDENT_EMU: i64 = 285_750;

/// Position and size of a shape in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// A named shape found on the slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub id: u32,
    pub name: String,
    pub frame: Option<Frame>,
    pub is_picture: bool,
}

/// Replacement text for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub paragraphs: Vec<String>,
    pub size_pt: u32,
    pub bullets: bool,
}

impl TextBlock {
    /// One paragraph per line of `text`.
    pub fn plain(text: &str, size_pt: u32) -> Self {
        Self {
            paragraphs: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            size_pt,
            bullets: false,
        }
    }

    pub fn bulleted(items: &[String], size_pt: u32) -> Self {
        Self {
            paragraphs: items
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            size_pt,
            bullets: true,
        }
    }

    /// Empties the region.
    pub fn cleared() -> Self {
        Self {
            paragraphs: Vec::new(),
            size_pt: 0,
            bullets: false,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.paragraphs.is_empty()
    }

    fn to_xml(&self) -> String {
        if self.paragraphs.is_empty() {
            return r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#.to_string();
        }

        let size = self.size_pt * 100;
        let ppr = if self.bullets {
            format!(
                r#"<a:pPr marL="{indent}" indent="-{indent}"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#,
                indent = BULLET_INDENT_EMU
            )
        } else {
            r#"<a:pPr marL="0" indent="0"><a:buNone/></a:pPr>"#.to_string()
        };

        self.paragraphs
            .iter()
            .map(|text| {
                format!(
                    concat!(
                        "<a:p>{}<a:r>",
                        r#"<a:rPr lang="en-US" sz="{}" dirty="0"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:rPr>"#,
                        "<a:t>{}</a:t></a:r></a:p>"
                    ),
                    ppr,
                    size,
                    escape(&xml_safe(text))
                )
            })
            .collect()
    }
}

/// A picture to put in place of a region shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureFill {
    pub region: String,
    pub rel_id: String,
    pub frame: Frame,
}

/// Everything to change on the slide.
#[derive(Debug, Clone, Default)]
pub struct SlideFill {
    pub texts: BTreeMap<String, TextBlock>,
    pub picture: Option<PictureFill>,
}

/// Lists the named shapes (`sp` and `pic`) on a slide, in document order.
pub fn index_shapes(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut shapes = Vec::new();
    let mut current: Option<Shape> = None;
    let mut seen_name = false;
    let mut in_xfrm = false;
    let mut off: Option<(i64, i64)> = None;
    let mut ext: Option<(i64, i64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"pic" => {
                    current = Some(Shape {
                        id: 0,
                        name: String::new(),
                        frame: None,
                        is_picture: local_name(e.name().as_ref()) == b"pic",
                    });
                    seen_name = false;
                    off = None;
                    ext = None;
                }
                b"cNvPr" if !seen_name => {
                    if let Some(shape) = current.as_mut() {
                        read_cnvpr(e, shape);
                        seen_name = true;
                    }
                }
                b"xfrm" => in_xfrm = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"cNvPr" if !seen_name => {
                    if let Some(shape) = current.as_mut() {
                        read_cnvpr(e, shape);
                        seen_name = true;
                    }
                }
                b"off" if in_xfrm && off.is_none() => off = Some(read_pair(e, b"x", b"y")),
                b"ext" if in_xfrm && ext.is_none() => ext = Some(read_pair(e, b"cx", b"cy")),
                _ => {}
            },
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"xfrm" => in_xfrm = false,
                b"sp" | b"pic" => {
                    if let Some(mut shape) = current.take() {
                        if let (Some((x, y)), Some((cx, cy))) = (off, ext) {
                            shape.frame = Some(Frame { x, y, cx, cy });
                        }
                        if !shape.name.is_empty() {
                            shapes.push(shape);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Template(format!(
                    "Error parsing slide XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Applies `fill` to the slide and returns the new XML.
pub fn fill_slide(xml: &str, fill: &SlideFill) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut shape: Option<Vec<Event<'static>>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Template(format!("Error parsing slide XML: {}", e)))?;

        if matches!(event, Event::Eof) {
            break;
        }
        let opens_shape = matches!(&event, Event::Start(e) if is_shape(e));
        let closes_shape = matches!(&event, Event::End(e) if is_shape_name(e.name().as_ref()));

        match shape.take() {
            None if opens_shape => shape = Some(vec![event.into_owned()]),
            None => write_event(&mut writer, event)?,
            Some(mut events) => {
                events.push(event.into_owned());
                if closes_shape {
                    write_shape(&mut writer, events, fill)?;
                } else {
                    shape = Some(events);
                }
            }
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Render(format!("Slide XML is not UTF-8: {}", e)))
}

fn write_shape(writer: &mut Writer<Vec<u8>>, events: Vec<Event<'static>>, fill: &SlideFill) -> Result<()> {
    let (id, name) = shape_identity(&events);
    let prefix = element_prefix(&events);

    if let Some(picture) = fill.picture.as_ref().filter(|p| p.region == name) {
        writer
            .get_mut()
            .extend_from_slice(picture_xml(&prefix, id, &name, picture).as_bytes());
        return Ok(());
    }

    match fill.texts.get(&name) {
        Some(block) if !is_picture(&events) => write_text_shape(writer, events, &prefix, block),
        _ => {
            for event in events {
                write_event(writer, event)?;
            }
            Ok(())
        }
    }
}

/// Copies a shape, dropping every paragraph of its text body and writing `block` instead.
fn write_text_shape(
    writer: &mut Writer<Vec<u8>>,
    events: Vec<Event<'static>>,
    prefix: &str,
    block: &TextBlock,
) -> Result<()> {
    let paragraphs = block.to_xml();
    let mut saw_body = false;
    let mut in_body = false;
    let mut skip_depth = 0usize;

    for event in events {
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Start(e) if in_body && local_name(e.name().as_ref()) == b"p" => {
                skip_depth = 1;
                continue;
            }
            Event::Empty(e) if in_body && local_name(e.name().as_ref()) == b"p" => continue,
            Event::Start(e) if local_name(e.name().as_ref()) == b"txBody" => {
                saw_body = true;
                in_body = true;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"txBody" => {
                saw_body = true;
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let body = format!("<{tag}><a:bodyPr/><a:lstStyle/>{paragraphs}</{tag}>");
                writer.get_mut().extend_from_slice(body.as_bytes());
                continue;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"txBody" => {
                writer.get_mut().extend_from_slice(paragraphs.as_bytes());
                in_body = false;
            }
            Event::End(e) if is_shape_name(e.name().as_ref()) && !saw_body => {
                let body = format!(
                    r#"<{p}txBody><a:bodyPr wrap="square"/><a:lstStyle/>{paragraphs}</{p}txBody>"#,
                    p = prefix
                );
                writer.get_mut().extend_from_slice(body.as_bytes());
            }
            _ => {}
        }
        write_event(writer, event)?;
    }
    Ok(())
}

fn picture_xml(prefix: &str, id: u32, name: &str, picture: &PictureFill) -> String {
    let Frame { x, y, cx, cy } = picture.frame;
    format!(
        concat!(
            "<{p}pic><{p}nvPicPr>",
            r#"<{p}cNvPr id="{id}" name="{name}"/>"#,
            r#"<{p}cNvPicPr><a:picLocks noChangeAspect="1"/></{p}cNvPicPr><{p}nvPr/>"#,
            "</{p}nvPicPr>",
            r#"<{p}blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></{p}blipFill>"#,
            r#"<{p}spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></{p}spPr>"#,
            "</{p}pic>"
        ),
        p = prefix,
        id = id,
        name = escape(name),
        rel = picture.rel_id,
        x = x,
        y = y,
        cx = cx,
        cy = cy,
    )
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Render(format!("Failed to write slide XML: {}", e)))
}

fn is_shape(e: &BytesStart<'_>) -> bool {
    is_shape_name(e.name().as_ref())
}

fn is_shape_name(name: &[u8]) -> bool {
    matches!(local_name(name), b"sp" | b"pic")
}

fn is_picture(events: &[Event<'static>]) -> bool {
    matches!(events.first(), Some(Event::Start(e)) if local_name(e.name().as_ref()) == b"pic")
}

/// Namespace prefix of the shape element, including the colon (`"p:"`).
fn element_prefix(events: &[Event<'static>]) -> String {
    match events.first() {
        Some(Event::Start(e)) => {
            let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
            match name.rsplit_once(':') {
                Some((prefix, _)) => format!("{}:", prefix),
                None => String::new(),
            }
        }
        _ => "p:".to_string(),
    }
}

fn shape_identity(events: &[Event<'static>]) -> (u32, String) {
    let mut shape = Shape {
        id: 0,
        name: String::new(),
        frame: None,
        is_picture: false,
    };
    let cnvpr = events.iter().find_map(|event| match event {
        Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"cNvPr" => Some(e),
        _ => None,
    });
    if let Some(e) = cnvpr {
        read_cnvpr(e, &mut shape);
    }
    (shape.id, shape.name)
}

fn read_cnvpr(e: &BytesStart<'_>, shape: &mut Shape) {
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => shape.id = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0),
            b"name" => shape.name = String::from_utf8_lossy(&attr.value).to_string(),
            _ => {}
        }
    }
}

fn read_pair(e: &BytesStart<'_>, first: &[u8], second: &[u8]) -> (i64, i64) {
    let mut pair = (0, 0);
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).parse::<i64>().unwrap_or(0);
        if attr.key.as_ref() == first {
            pair.0 = value;
        } else if attr.key.as_ref() == second {
            pair.1 = value;
        }
    }
    pair
}

/// Drops characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\t' || c == '\n' || c == '\r' || c >= ' ')
        .filter(|&c| !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
        "<p:cSld><p:spTree>",
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
        r#"<p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="3000" cy="400"/></a:xfrm></p:spPr>"#,
        r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>Placeholder</a:t></a:r></a:p><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="figure"><a:extLst><a:ext uri="{X}"/></a:extLst></p:cNvPr><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
        r#"<p:spPr><a:xfrm><a:off x="1000" y="1000"/><a:ext cx="4000" cy="2000"/></a:xfrm></p:spPr></p:sp>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="key_points"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#,
        "</p:spTree></p:cSld></p:sld>"
    );

    #[test]
    fn test_index_shapes() {
        let shapes = index_shapes(SLIDE).unwrap();
        let names: Vec<_> = shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["title", "figure", "key_points"]);
        assert_eq!(
            shapes[1].frame,
            Some(Frame { x: 1000, y: 1000, cx: 4000, cy: 2000 })
        );
        assert_eq!(shapes[2].frame, None);
        assert_eq!(shapes[0].id, 2);
    }

    #[test]
    fn test_fill_replaces_paragraphs() {
        let mut fill = SlideFill::default();
        fill.texts
            .insert("title".into(), TextBlock::plain("Effect of A & B <on> C", 22));
        let out = fill_slide(SLIDE, &fill).unwrap();

        assert!(!out.contains("Placeholder"));
        assert!(!out.contains("second"));
        assert!(out.contains("<a:t>Effect of A &amp; B &lt;on&gt; C</a:t>"));
        assert!(out.contains(r#"sz="2200""#));
        // untouched shapes are copied as they were
        assert!(out.contains(r#"<a:ext uri="{X}"/>"#));
    }

    #[test]
    fn test_fill_adds_missing_text_body() {
        let mut fill = SlideFill::default();
        fill.texts.insert(
            "key_points".into(),
            TextBlock::bulleted(&["One".to_string(), " ".to_string(), "Two".to_string()], 14),
        );
        let out = fill_slide(SLIDE, &fill).unwrap();
        assert!(out.contains("<p:txBody>"));
        assert_eq!(out.matches("<a:buChar").count(), 2);
        assert!(out.contains("<a:t>Two</a:t>"));
    }

    #[test]
    fn test_cleared_region_keeps_one_empty_paragraph() {
        let mut fill = SlideFill::default();
        fill.texts.insert("title".into(), TextBlock::cleared());
        let out = fill_slide(SLIDE, &fill).unwrap();
        assert!(!out.contains("Placeholder"));
        assert!(out.contains("<a:endParaRPr"));
    }

    #[test]
    fn test_picture_replaces_region() {
        let fill = SlideFill {
            texts: BTreeMap::new(),
            picture: Some(PictureFill {
                region: "figure".into(),
                rel_id: "rId7".into(),
                frame: Frame { x: 1500, y: 1000, cx: 3000, cy: 2000 },
            }),
        };
        let out = fill_slide(SLIDE, &fill).unwrap();
        assert!(out.contains(r#"<a:blip r:embed="rId7"/>"#));
        assert!(out.contains(r#"<p:cNvPr id="3" name="figure"/>"#));
        assert!(!out.contains(r#"<a:ext uri="{X}"/>"#));

        let shapes = index_shapes(&out).unwrap();
        let figure = shapes.iter().find(|s| s.name == "figure").unwrap();
        assert!(figure.is_picture);
        assert_eq!(figure.frame, Some(Frame { x: 1500, y: 1000, cx: 3000, cy: 2000 }));
    }

    #[test]
    fn test_fill_is_deterministic() {
        let mut fill = SlideFill::default();
        fill.texts.insert("title".into(), TextBlock::plain("Same", 22));
        assert_eq!(fill_slide(SLIDE, &fill).unwrap(), fill_slide(SLIDE, &fill).unwrap());
    }

    #[test]
    fn test_xml_safe_strips_control_chars() {
        assert_eq!(xml_safe("a\u{0B}b\tc"), "ab\tc");
    }
}
