//! In-memory view of an OOXML package (the ZIP container behind a `.pptx`).

use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::Reader;
use va_core::{Error, Result};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
pub const PRESENTATION: &str = "ppt/presentation.xml";

pub const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Package parts in their original archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Package {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Template(format!("Failed to open template archive: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::Template(format!("Failed to read archive entry: {}", e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push((name, data));
        }

        Ok(Self { parts })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn get_str(&self, name: &str) -> Result<String> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::Template(format!("Missing package part: {}", name)))?;
        String::from_utf8(data.to_vec())
            .map_err(|_| Error::Template(format!("Package part is not UTF-8: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces a part in place, or appends it when new.
    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(part) => part.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Writes the archive with fixed timestamps so identical parts give identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for (name, data) in &self.parts {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::Render(format!("Failed to write {}: {}", name, e)))?;
            writer.write_all(data)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::Render(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Path of the first slide in presentation order.
    pub fn first_slide_path(&self) -> Result<String> {
        let rels = self.relationships(PRESENTATION_RELS)?;
        let slide_rels: Vec<&Relationship> =
            rels.iter().filter(|r| r.rel_type == REL_TYPE_SLIDE).collect();

        // sldIdLst order wins; the rels file itself is unordered
        let ordered_ids = self
            .get_str(PRESENTATION)
            .ok()
            .map(|xml| slide_id_order(&xml))
            .transpose()?
            .unwrap_or_default();

        let chosen = ordered_ids
            .iter()
            .find_map(|id| slide_rels.iter().find(|r| &r.id == id))
            .copied()
            .or_else(|| {
                slide_rels
                    .iter()
                    .min_by_key(|r| extract_slide_number(&r.target).unwrap_or(usize::MAX))
                    .copied()
            })
            .ok_or_else(|| Error::Template("Template has no slides".to_string()))?;

        let path = resolve_target("ppt", &chosen.target);
        if !self.contains(&path) {
            return Err(Error::Template(format!("Slide part not found: {}", path)));
        }
        Ok(path)
    }

    /// Parses a `.rels` part. A missing part yields an empty list.
    pub fn relationships(&self, rels_path: &str) -> Result<Vec<Relationship>> {
        let Some(data) = self.get(rels_path) else {
            return Ok(Vec::new());
        };
        let content = String::from_utf8_lossy(data);
        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        let mut rels = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                    };
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            _ => {}
                        }
                    }
                    rels.push(rel);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Template(format!(
                        "Error parsing relationships in {}: {}",
                        rels_path, e
                    )))
                }
                _ => {}
            }
        }
        Ok(rels)
    }

    /// Adds a relationship to `rels_path`, creating the part if needed, and returns its id.
    pub fn add_relationship(&mut self, rels_path: &str, rel_type: &str, target: &str) -> Result<String> {
        let existing = self.relationships(rels_path)?;
        let next = existing
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{}", next);
        let entry = format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            rel_type,
            quick_xml::escape::escape(target)
        );

        let xml = match self.get(rels_path) {
            Some(data) => {
                let content = String::from_utf8_lossy(data).to_string();
                insert_before_close(&content, "</Relationships>", &entry).ok_or_else(|| {
                    Error::Template(format!("Malformed relationships part: {}", rels_path))
                })?
            }
            None => format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#
                ),
                entry
            ),
        };
        self.put(rels_path, xml.into_bytes());
        Ok(id)
    }

    /// Registers a default content type for `extension` unless one is present.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<()> {
        let xml = self.get_str(CONTENT_TYPES)?;
        let needle = format!(r#"Extension="{}""#, extension);
        if xml.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()) {
            return Ok(());
        }
        let entry = format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            extension, content_type
        );
        let updated = insert_before_close(&xml, "</Types>", &entry)
            .ok_or_else(|| Error::Template("Malformed [Content_Types].xml".to_string()))?;
        self.put(CONTENT_TYPES, updated.into_bytes());
        Ok(())
    }

    /// First free name of the form `{stem}{n}.{ext}` under `dir`.
    pub fn unused_part_name(&self, dir: &str, stem: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{}/{}{}.{}", dir, stem, n, ext))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| format!("{}/{}.{}", dir, stem, ext))
    }
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolves a relationship target relative to the directory of its source part.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Strips the namespace prefix from an XML name.
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn slide_id_order(presentation_xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    if local_name(attr.key.as_ref()) == b"id" && attr.key.as_ref() != b"id" {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Template(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )))
            }
            _ => {}
        }
    }
    Ok(ids)
}

/// Extracts the trailing number from names like `rId3` or `slides/slide12.xml`.
fn extract_slide_number(s: &str) -> Option<usize> {
    let stem = s.rsplit('/').next()?.trim_end_matches(".xml");
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

fn insert_before_close(xml: &str, closing_tag: &str, entry: &str) -> Option<String> {
    let pos = xml.rfind(closing_tag)?;
    let mut out = String::with_capacity(xml.len() + entry.len());
    out.push_str(&xml[..pos]);
    out.push_str(entry);
    out.push_str(&xml[pos..]);
    Some(out)
}
