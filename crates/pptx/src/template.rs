//! Template catalog: slide size, layouts and placeholders of a `.pptx`.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// English Metric Units per point.
pub const EMU_PER_POINT: i64 = 12_700;

/// Default 4:3 slide size used when `p:sldSz` is absent.
const DEFAULT_SLIDE_SIZE: (i64, i64) = (9_144_000, 6_858_000);

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Convert inches to EMU.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Rectangle in EMU, origin at the slide's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl EmuRect {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    /// Rectangle given in inches.
    pub fn from_inches(x: f64, y: f64, cx: f64, cy: f64) -> Self {
        Self::new(inches(x), inches(y), inches(cx), inches(cy))
    }
}

/// A placeholder shape on a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    /// `p:ph@idx`; absent means 0.
    pub idx: u32,

    /// `p:ph@type`, e.g. `title`, `ctrTitle`, `body`.
    pub kind: Option<String>,

    /// Shape name from `p:cNvPr@name`.
    pub name: String,

    /// Position, inherited from the master when the layout omits it.
    pub rect: Option<EmuRect>,
}

impl Placeholder {
    pub fn is_title(&self) -> bool {
        matches!(self.kind.as_deref(), Some("title") | Some("ctrTitle"))
    }
}

/// One slide layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateLayout {
    /// Position in the catalog, counting across masters.
    pub index: usize,
    pub name: String,
    /// Archive path of the layout part.
    pub path: String,
    /// Index of the owning slide master.
    pub master: usize,
    pub placeholders: Vec<Placeholder>,
}

impl TemplateLayout {
    pub fn placeholder(&self, idx: u32) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.idx == idx)
    }

    /// The title placeholder: a `title`/`ctrTitle` shape, else idx 0.
    pub fn title_placeholder(&self) -> Option<&Placeholder> {
        self.placeholders
            .iter()
            .find(|p| p.is_title())
            .or_else(|| self.placeholder(0))
    }
}

/// Layouts available in a presentation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateCatalog {
    pub slide_width: i64,
    pub slide_height: i64,
    /// Layouts of every master, masters in presentation order.
    pub layouts: Vec<TemplateLayout>,
}

impl TemplateCatalog {
    /// Read the catalog of a `.pptx` file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read the catalog from any seekable `.pptx` stream.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let presentation = read_file_from_archive(&mut archive, PRESENTATION_PART)?;
        let info = parse_presentation(&presentation)?;
        let rels = read_relationships(&mut archive, PRESENTATION_PART)?;

        let mut layouts = Vec::new();
        for (master_index, rel_id) in info.master_ids.iter().enumerate() {
            let Some(master_path) = rels.get(rel_id) else {
                log::warn!("Slide master relationship {} not found", rel_id);
                continue;
            };
            let master_xml = read_file_from_archive(&mut archive, master_path)?;
            let master = parse_part(&master_xml)?;
            let master_rels = read_relationships(&mut archive, master_path)?;

            for layout_id in &master.layout_ids {
                let Some(layout_path) = master_rels.get(layout_id) else {
                    log::warn!("Layout relationship {} of {} not found", layout_id, master_path);
                    continue;
                };
                let layout_xml = read_file_from_archive(&mut archive, layout_path)?;
                let mut layout = parse_part(&layout_xml)?;
                inherit_positions(&mut layout.placeholders, &master.placeholders);

                layouts.push(TemplateLayout {
                    index: layouts.len(),
                    name: layout.name.unwrap_or_default(),
                    path: layout_path.clone(),
                    master: master_index,
                    placeholders: layout.placeholders,
                });
            }
        }

        log::debug!("Template has {} layouts", layouts.len());
        let (slide_width, slide_height) = info.slide_size.unwrap_or(DEFAULT_SLIDE_SIZE);
        Ok(Self {
            slide_width,
            slide_height,
            layouts,
        })
    }

    pub fn layout(&self, index: usize) -> Option<&TemplateLayout> {
        self.layouts.get(index)
    }

    /// First layout with the given name.
    pub fn find_layout(&self, name: &str) -> Option<&TemplateLayout> {
        self.layouts.iter().find(|l| l.name == name)
    }
}

/// Fill in missing placeholder positions from the master.
///
/// Placeholders match by type first, then by idx.
fn inherit_positions(layout: &mut [Placeholder], master: &[Placeholder]) {
    for placeholder in layout.iter_mut().filter(|p| p.rect.is_none()) {
        let by_kind = placeholder
            .kind
            .as_ref()
            .and_then(|kind| master.iter().find(|m| m.kind.as_ref() == Some(kind)));
        let source = by_kind.or_else(|| master.iter().find(|m| m.idx == placeholder.idx));
        placeholder.rect = source.and_then(|m| m.rect);
    }
}

#[derive(Debug, Default)]
struct PresentationInfo {
    slide_size: Option<(i64, i64)>,
    master_ids: Vec<String>,
}

fn parse_presentation(xml: &str) -> Result<PresentationInfo> {
    let mut info = PresentationInfo::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"sldSz" => {
                    let cx = attr_value(e, b"cx").and_then(|v| v.parse().ok());
                    let cy = attr_value(e, b"cy").and_then(|v| v.parse().ok());
                    if let (Some(cx), Some(cy)) = (cx, cy) {
                        info.slide_size = Some((cx, cy));
                    }
                }
                b"sldMasterId" => {
                    if let Some(id) = relationship_id(e) {
                        info.master_ids.push(id);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing presentation: {}", e))),
            _ => {}
        }
    }

    Ok(info)
}

/// What we read from a master or layout part.
#[derive(Debug, Default)]
struct PartInfo {
    /// `p:cSld@name`.
    name: Option<String>,
    /// Relationship ids from `p:sldLayoutIdLst` (masters only).
    layout_ids: Vec<String>,
    placeholders: Vec<Placeholder>,
}

/// Shape being read; only placeholders are kept.
#[derive(Debug, Default)]
struct ShapeInfo {
    name: String,
    placeholder: Option<(Option<String>, u32)>,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,
}

fn parse_part(xml: &str) -> Result<PartInfo> {
    let mut part = PartInfo::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current_shape: Option<ShapeInfo> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"cSld" => part.name = attr_value(e, b"name"),
                    b"sldLayoutId" => {
                        if let Some(id) = relationship_id(e) {
                            part.layout_ids.push(id);
                        }
                    }
                    b"sp" | b"pic" | b"graphicFrame" => {
                        current_shape = Some(ShapeInfo::default());
                    }
                    b"cNvPr" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.name = attr_value(e, b"name").unwrap_or_default();
                        }
                    }
                    b"ph" => {
                        if let Some(ref mut shape) = current_shape {
                            let idx = attr_value(e, b"idx").and_then(|v| v.parse().ok()).unwrap_or(0);
                            shape.placeholder = Some((attr_value(e, b"type"), idx));
                        }
                    }
                    b"off" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.offset = shape.offset.or_else(|| attr_pair(e, b"x", b"y"));
                        }
                    }
                    b"ext" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.extent = shape.extent.or_else(|| attr_pair(e, b"cx", b"cy"));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if matches!(local_name(e.name().as_ref()), b"sp" | b"pic" | b"graphicFrame") {
                    if let Some(shape) = current_shape.take() {
                        if let Some((kind, idx)) = shape.placeholder {
                            let rect = match (shape.offset, shape.extent) {
                                (Some((x, y)), Some((cx, cy))) => Some(EmuRect::new(x, y, cx, cy)),
                                _ => None,
                            };
                            part.placeholders.push(Placeholder {
                                idx,
                                kind,
                                name: shape.name,
                                rect,
                            });
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing slide part: {}", e))),
            _ => {}
        }
    }

    Ok(part)
}

/// Relationship targets of `part`, keyed by id, as archive paths.
fn read_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> Result<HashMap<String, String>> {
    let content = read_file_from_archive(archive, &relationships_path(part))?;
    let mut targets = HashMap::new();

    let mut reader = Reader::from_str(&content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
                    targets.insert(id, resolve_target(part, &target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(targets)
}

/// `ppt/slideMasters/slideMaster1.xml` -> `ppt/slideMasters/_rels/slideMaster1.xml.rels`.
fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of `part`.
fn resolve_target(part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Read a file from the ZIP archive.
fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::Template(format!("Part not found in template '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Value of the attribute whose local name is `key`.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        })
}

fn attr_pair(e: &BytesStart, a: &[u8], b: &[u8]) -> Option<(i64, i64)> {
    let a = attr_value(e, a)?.parse().ok()?;
    let b = attr_value(e, b)?.parse().ok()?;
    Some((a, b))
}

/// The namespaced `r:id` of an element, skipping its numeric `id`.
fn relationship_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| {
            let key = attr.key.as_ref();
            key.contains(&b':') && local_name(key) == b"id"
        })
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
