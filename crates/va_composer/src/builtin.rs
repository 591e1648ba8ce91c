//! A minimal 16:9 template with every region the composer knows about,
//! used when no template file has been provided.

use va_core::Result;

use crate::package::Package;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);
const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;
const MARGIN: i64 = 457_200;
const GUTTER: i64 = 228_600;
const SECTION_COUNT: i64 = 3;

/// Serialized `.pptx` bytes of the built-in template.
pub fn template_bytes() -> Result<Vec<u8>> {
    let mut package = Package::default();
    package.put("[Content_Types].xml", content_types().into_bytes());
    package.put(
        "_rels/.rels",
        relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")]).into_bytes(),
    );
    package.put("ppt/presentation.xml", presentation().into_bytes());
    package.put(
        "ppt/_rels/presentation.xml.rels",
        relationships(&[
            ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            ("rId2", "slide", "slides/slide1.xml"),
            ("rId3", "theme", "theme/theme1.xml"),
        ])
        .into_bytes(),
    );
    package.put("ppt/slideMasters/slideMaster1.xml", slide_master().into_bytes());
    package.put(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])
        .into_bytes(),
    );
    package.put("ppt/slideLayouts/slideLayout1.xml", slide_layout().into_bytes());
    package.put(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).into_bytes(),
    );
    package.put("ppt/theme/theme1.xml", theme().into_bytes());
    package.put("ppt/slides/slide1.xml", slide().into_bytes());
    package.put(
        "ppt/slides/_rels/slide1.xml.rels",
        relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]).into_bytes(),
    );
    package.to_bytes()
}

fn content_types() -> String {
    let overrides = [
        ("/ppt/presentation.xml", "presentationml.presentation.main+xml"),
        ("/ppt/slides/slide1.xml", "presentationml.slide+xml"),
        ("/ppt/slideLayouts/slideLayout1.xml", "presentationml.slideLayout+xml"),
        ("/ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml"),
        ("/ppt/theme/theme1.xml", "theme+xml"),
    ]
    .iter()
    .map(|(part, kind)| {
        format!(
            r#"<Override PartName="{}" ContentType="application/vnd.openxmlformats-officedocument.{}"/>"#,
            part, kind
        )
    })
    .collect::<String>();

    format!(
        concat!(
            "{}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="png" ContentType="image/png"/>"#,
            "{}</Types>"
        ),
        DECL, overrides
    )
}

fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
                id, REL, kind, target
            )
        })
        .collect();
    format!(r#"{}<Relationships xmlns="{}">{}</Relationships>"#, DECL, RELS_NS, body)
}

fn presentation() -> String {
    format!(
        concat!(
            "{decl}<p:presentation {ns} saveSubsetFonts=\"1\">",
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#,
            r#"<p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/>"#,
            "</p:presentation>"
        ),
        decl = DECL,
        ns = NS,
        cx = SLIDE_CX,
        cy = SLIDE_CY
    )
}

fn empty_tree() -> &'static str {
    concat!(
        "<p:spTree><p:nvGrpSpPr>",
        r#"<p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/>"#,
        "</p:nvGrpSpPr><p:grpSpPr/></p:spTree>"
    )
}

fn slide_master() -> String {
    format!(
        concat!(
            "{decl}<p:sldMaster {ns}><p:cSld>{tree}</p:cSld>",
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
            r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            "</p:sldMaster>"
        ),
        decl = DECL,
        ns = NS,
        tree = empty_tree()
    )
}

fn slide_layout() -> String {
    format!(
        concat!(
            r#"{decl}<p:sldLayout {ns} type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank">{tree}</p:cSld>"#,
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
        decl = DECL,
        ns = NS,
        tree = empty_tree()
    )
}

fn theme() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "1F2937"),
        ("lt2", "F3F4F6"),
        ("accent1", "B91C1C"),
        ("accent2", "1D4ED8"),
        ("accent3", "047857"),
        ("accent4", "B45309"),
        ("accent5", "6D28D9"),
        ("accent6", "0E7490"),
        ("hlink", "1D4ED8"),
        ("folHlink", "6D28D9"),
    ]
    .iter()
    .map(|(name, hex)| format!(r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, name, hex))
    .collect::<String>();

    let fonts = r#"<a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/>"#;
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";

    format!(
        concat!(
            r#"{decl}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Visual Abstract">"#,
            "<a:themeElements>",
            r#"<a:clrScheme name="Visual Abstract">{colors}</a:clrScheme>"#,
            r#"<a:fontScheme name="Visual Abstract"><a:majorFont>{fonts}</a:majorFont><a:minorFont>{fonts}</a:minorFont></a:fontScheme>"#,
            r#"<a:fmtScheme name="Visual Abstract">"#,
            "<a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst>",
            "<a:lnStyleLst>{line}{line}{line}</a:lnStyleLst>",
            "<a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst>",
            "<a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst>",
            "</a:fmtScheme></a:themeElements></a:theme>"
        ),
        decl = DECL,
        colors = colors,
        fonts = fonts,
        fill = fill,
        line = line,
        effect = effect
    )
}

struct Region {
    name: String,
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
    prompt: &'static str,
    size_pt: u32,
    outlined: bool,
}

fn regions() -> Vec<Region> {
    let content_cx = SLIDE_CX - 2 * MARGIN;
    let column_cx = (content_cx - (SECTION_COUNT - 1) * GUTTER) / SECTION_COUNT;
    let lower_y = 3_886_200;
    let lower_cy = 2_057_400;
    let key_points_cx = (content_cx - GUTTER) * 3 / 5;

    let mut regions = vec![Region {
        name: "title".to_string(),
        x: MARGIN,
        y: 228_600,
        cx: content_cx,
        cy: 838_200,
        prompt: "Article title",
        size_pt: 22,
        outlined: false,
    }];

    for i in 0..SECTION_COUNT {
        let x = MARGIN + i * (column_cx + GUTTER);
        regions.push(Region {
            name: format!("section_{}_heading", i + 1),
            x,
            y: 1_143_000,
            cx: column_cx,
            cy: 381_000,
            prompt: "Section heading",
            size_pt: 16,
            outlined: false,
        });
        regions.push(Region {
            name: format!("section_{}_body", i + 1),
            x,
            y: 1_524_000,
            cx: column_cx,
            cy: 2_209_800,
            prompt: "Section text",
            size_pt: 14,
            outlined: false,
        });
    }

    regions.push(Region {
        name: "key_points".to_string(),
        x: MARGIN,
        y: lower_y,
        cx: key_points_cx,
        cy: lower_cy,
        prompt: "Key points",
        size_pt: 14,
        outlined: false,
    });
    regions.push(Region {
        name: "figure".to_string(),
        x: MARGIN + key_points_cx + GUTTER,
        y: lower_y,
        cx: content_cx - key_points_cx - GUTTER,
        cy: lower_cy,
        prompt: "",
        size_pt: 14,
        outlined: true,
    });
    regions.push(Region {
        name: "footer_citation".to_string(),
        x: MARGIN,
        y: 6_096_000,
        cx: content_cx,
        cy: 533_400,
        prompt: "Citation",
        size_pt: 10,
        outlined: false,
    });
    regions
}

fn shape_xml(id: usize, region: &Region) -> String {
    let outline = if region.outlined {
        r#"<a:ln w="12700"><a:solidFill><a:srgbClr val="9CA3AF"/></a:solidFill><a:prstDash val="dash"/></a:ln>"#
    } else {
        "<a:ln><a:noFill/></a:ln>"
    };
    let paragraph = if region.prompt.is_empty() {
        r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#.to_string()
    } else {
        format!(
            r#"<a:p><a:r><a:rPr lang="en-US" sz="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
            region.size_pt * 100,
            region.prompt
        )
    };

    format!(
        concat!(
            "<p:sp><p:nvSpPr>",
            r#"<p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/>"#,
            "</p:nvSpPr><p:spPr>",
            r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/>{outline}"#,
            "</p:spPr><p:txBody>",
            r#"<a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraph}"#,
            "</p:txBody></p:sp>"
        ),
        id = id,
        name = region.name,
        x = region.x,
        y = region.y,
        cx = region.cx,
        cy = region.cy,
        outline = outline,
        paragraph = paragraph
    )
}

fn slide() -> String {
    let shapes: String = regions()
        .iter()
        .enumerate()
        .map(|(i, region)| shape_xml(i + 2, region))
        .collect();

    format!(
        concat!(
            "{decl}<p:sld {ns}><p:cSld><p:spTree><p:nvGrpSpPr>",
            r#"<p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
            "{shapes}</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        decl = DECL,
        ns = NS,
        shapes = shapes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::index_shapes;

    #[test]
    fn test_builtin_parts_parse() {
        let package = Package::read(&template_bytes().unwrap()).unwrap();
        assert_eq!(package.first_slide_path().unwrap(), "ppt/slides/slide1.xml");

        let shapes = index_shapes(&package.get_str("ppt/slides/slide1.xml").unwrap()).unwrap();
        assert_eq!(shapes.len(), 10);
        assert!(shapes.iter().all(|s| s.frame.is_some()));
        // every shape id is unique
        let mut ids: Vec<_> = shapes.iter().map(|s| s.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_regions_stay_on_slide() {
        for region in regions() {
            assert!(region.x >= 0 && region.x + region.cx <= SLIDE_CX, "{}", region.name);
            assert!(region.y >= 0 && region.y + region.cy <= SLIDE_CY, "{}", region.name);
        }
    }
}
