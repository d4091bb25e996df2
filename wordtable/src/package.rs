//! Word document packages (zip containers of named XML and media parts)
//!
//! A .docx file is a ZIP archive. [`DocumentPackage::open`] reads every entry
//! into memory and tags it with the role it plays for the importer: the
//! document body, the style sheet, the body's relationships, embedded media,
//! package metadata, or anything else. Nothing is kept on disk.
//!
//! Media parts are filtered at open time: only GIF, PNG and JPEG images are
//! kept. Older documents frequently embed WMF/EMF drawings, which have no
//! XHTML rendering; those are skipped with a warning rather than failing the
//! whole import.

use crate::error::PackageFormatError;
use std::io::{Cursor, Read, Write};
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Default location of the main document part
pub const BODY_PART: &str = "word/document.xml";
/// Location of the style definitions part
pub const STYLES_PART: &str = "word/styles.xml";
/// Relationships of the main document part
pub const BODY_RELS_PART: &str = "word/_rels/document.xml.rels";
/// Package content type registry
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const MAIN_DOCUMENT_CONTENT_TYPE: &str = "document.main+xml";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_SIZE_HINT: u64 = 1 << 20;

/// What a part is used for during conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartRole {
    Body,
    Styles,
    Relationships,
    Media,
    Metadata,
    Other,
}

/// Image types that survive into the XHTML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Gif,
    Png,
    Jpeg,
}

impl MediaType {
    /// Classify a part path by extension; `None` for anything unsupported
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Some(MediaType::Gif),
            "png" => Some(MediaType::Png),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }

    /// Short type name (`jpg` is normalised to `jpeg`)
    pub fn name(self) -> &'static str {
        match self {
            MediaType::Gif => "gif",
            MediaType::Png => "png",
            MediaType::Jpeg => "jpeg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Gif => "image/gif",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }
}

/// One named part of a package
#[derive(Debug, Clone)]
pub struct Part {
    /// Path inside the archive (e.g., "word/media/image1.png")
    pub path: String,
    pub role: PartRole,
    /// Set for media parts only
    pub media_type: Option<MediaType>,
    /// Pixel size of media parts, when the image header could be read
    pub dimensions: Option<(usize, usize)>,
    pub data: Vec<u8>,
}

impl Part {
    /// File name without the directory
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn text(&self) -> String {
        decode_text(&self.data)
    }
}

/// Summary of a part without its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    pub path: String,
    pub size: usize,
    pub role: PartRole,
    pub media_type: Option<MediaType>,
}

/// An opened Word package
#[derive(Debug, Clone)]
pub struct DocumentPackage {
    parts: Vec<Part>,
    body_index: usize,
}

impl DocumentPackage {
    /// Open a package from its bytes
    ///
    /// # Parameters
    /// * `bytes` - The complete zip archive
    ///
    /// # Returns
    /// * `Ok(DocumentPackage)` - All parts read, exactly one body part present
    /// * `Err(PackageFormatError)` - Not a zip file, a corrupt entry, or no body part
    pub fn open(bytes: &[u8]) -> Result<Self, PackageFormatError> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(PackageFormatError::NotZip)?;

        let mut raw: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| PackageFormatError::CorruptEntry {
                    name: format!("#{i}"),
                    reason: e.to_string(),
                })?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            // The declared size comes from the archive; only trust it as a hint
            let mut data = Vec::with_capacity(file.size().min(MAX_SIZE_HINT) as usize);
            file.read_to_end(&mut data)
                .map_err(|e| PackageFormatError::CorruptEntry {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            raw.push((name, data));
        }

        let body_path = find_body_path(&raw).ok_or(PackageFormatError::MissingBody)?;

        let mut parts = Vec::with_capacity(raw.len());
        for (path, data) in raw {
            let role = classify(&path, &body_path);
            let mut media_type = None;
            let mut dimensions = None;
            if role == PartRole::Media {
                match MediaType::from_path(&path) {
                    Some(t) => {
                        media_type = Some(t);
                        dimensions = imagesize::blob_size(&data)
                            .map(|size| Some((size.width, size.height)))
                            .unwrap_or_else(|e| {
                                log::debug!("Could not read dimensions of {}: {}", path, e);
                                None
                            });
                    }
                    None => {
                        log::warn!("Skipping unsupported embedded media: {}", path);
                        continue;
                    }
                }
            }
            parts.push(Part {
                path,
                role,
                media_type,
                dimensions,
                data,
            });
        }

        let body_index = parts
            .iter()
            .position(|p| p.role == PartRole::Body)
            .ok_or(PackageFormatError::MissingBody)?;

        log::debug!(
            "Opened package: {} parts, body at {}",
            parts.len(),
            body_path
        );
        Ok(Self { parts, body_index })
    }

    /// Check for the zip local file header signature
    pub fn is_zip(bytes: &[u8]) -> bool {
        bytes.starts_with(b"PK\x03\x04")
    }

    /// Path, size and role of every part, in archive order
    pub fn list_parts(&self) -> Vec<PartDescriptor> {
        self.parts
            .iter()
            .map(|p| PartDescriptor {
                path: p.path.clone(),
                size: p.data.len(),
                role: p.role,
                media_type: p.media_type,
            })
            .collect()
    }

    pub fn read_part(&self, path: &str) -> Result<&[u8], PackageFormatError> {
        self.parts
            .iter()
            .find(|p| p.path == path)
            .map(|p| p.data.as_slice())
            .ok_or_else(|| PackageFormatError::MissingPart(path.to_string()))
    }

    /// The document body part
    pub fn body(&self) -> &Part {
        &self.parts[self.body_index]
    }

    pub fn styles(&self) -> Option<&Part> {
        self.part_with_role(PartRole::Styles)
    }

    /// Relationships of the body part (image and hyperlink targets)
    pub fn relationships(&self) -> Option<&Part> {
        self.part_with_role(PartRole::Relationships)
    }

    pub fn part_with_role(&self, role: PartRole) -> Option<&Part> {
        self.parts.iter().find(|p| p.role == role)
    }

    pub fn media(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.role == PartRole::Media)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Rebuild this package as zip bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageFormatError> {
        let entries: Vec<(&str, &[u8])> = self
            .parts
            .iter()
            .map(|p| (p.path.as_str(), p.data.as_slice()))
            .collect();
        Self::write(&entries)
    }

    /// Write named parts into a new zip archive
    ///
    /// # Parameters
    /// * `parts` - `(path, content)` pairs, written in the given order
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - The archive bytes
    /// * `Err(PackageFormatError)` - The zip writer failed
    pub fn write(parts: &[(&str, &[u8])]) -> Result<Vec<u8>, PackageFormatError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (path, data) in parts {
            writer
                .start_file(*path, options)
                .map_err(PackageFormatError::Write)?;
            writer
                .write_all(data)
                .map_err(|e| PackageFormatError::Write(e.into()))?;
        }
        let cursor = writer.finish().map_err(PackageFormatError::Write)?;
        Ok(cursor.into_inner())
    }

    /// Package a Question XML payload as the body of a minimal Word package
    ///
    /// The result keeps the original document name and its .docx container
    /// shape, so storage code that keys on either handles it unchanged.
    ///
    /// # Parameters
    /// * `original_name` - Name of the document the payload replaces
    /// * `payload` - Question XML text stored as the body part
    pub fn smuggle(original_name: &str, payload: &str) -> Result<NamedPackage, PackageFormatError> {
        let content_types = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"</Types>"#
        );
        let bytes = Self::write(&[
            (CONTENT_TYPES_PART, content_types.as_bytes()),
            (BODY_PART, payload.as_bytes()),
        ])?;
        Ok(NamedPackage {
            file_name: original_name.to_string(),
            bytes,
        })
    }
}

/// Package bytes paired with the file name they are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPackage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Main document part named in `[Content_Types].xml`, else the default path
fn find_body_path(raw: &[(String, Vec<u8>)]) -> Option<String> {
    let from_content_types = raw
        .iter()
        .find(|(name, _)| name == CONTENT_TYPES_PART)
        .and_then(|(_, data)| main_part_from_content_types(&decode_text(data)));

    if let Some(path) = from_content_types {
        if raw.iter().any(|(name, _)| *name == path) {
            return Some(path);
        }
    }
    raw.iter()
        .find(|(name, _)| name == BODY_PART)
        .map(|(name, _)| name.clone())
}

fn main_part_from_content_types(xml: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    doc.root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Override")
        .find(|n| {
            n.attribute("ContentType")
                .is_some_and(|ct| ct.ends_with(MAIN_DOCUMENT_CONTENT_TYPE))
        })
        .and_then(|n| n.attribute("PartName"))
        .map(|p| p.trim_start_matches('/').to_string())
}

fn classify(path: &str, body_path: &str) -> PartRole {
    if path == body_path {
        return PartRole::Body;
    }
    if path == STYLES_PART {
        return PartRole::Styles;
    }
    if path == rels_path_for(body_path) {
        return PartRole::Relationships;
    }
    if path == CONTENT_TYPES_PART || path.starts_with("docProps/") || path.ends_with(".rels") {
        return PartRole::Metadata;
    }
    if path.contains("/media/") || is_image_extension(path) {
        return PartRole::Media;
    }
    PartRole::Other
}

/// `word/document.xml` → `word/_rels/document.xml.rels`
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

fn is_image_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [
        ".gif", ".png", ".jpg", ".jpeg", ".bmp", ".tif", ".tiff", ".wmf", ".emf", ".svg",
    ]
    .iter()
    .any(|ext| lower.ends_with(ext))
}

/// Bytes to text, dropping a UTF-8 byte order mark
pub fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    String::from_utf8_lossy(data).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89,
    ];

    fn sample_package() -> Vec<u8> {
        DocumentPackage::write(&[
            (CONTENT_TYPES_PART, b"<Types/>".as_slice()),
            (BODY_PART, b"<w:document/>".as_slice()),
            (STYLES_PART, b"<w:styles/>".as_slice()),
            (BODY_RELS_PART, b"<Relationships/>".as_slice()),
            ("word/media/image1.png", PNG_1X1),
            ("word/media/image2.JPG", b"jpeg".as_slice()),
            ("word/media/image3.wmf", b"wmf".as_slice()),
            ("word/theme/theme1.xml", b"<theme/>".as_slice()),
        ])
        .unwrap()
    }

    #[test]
    fn test_open_classifies_parts() {
        let package = DocumentPackage::open(&sample_package()).unwrap();
        let parts = package.list_parts();

        let role_of = |path: &str| parts.iter().find(|p| p.path == path).map(|p| p.role);
        assert_eq!(role_of(BODY_PART), Some(PartRole::Body));
        assert_eq!(role_of(STYLES_PART), Some(PartRole::Styles));
        assert_eq!(role_of(BODY_RELS_PART), Some(PartRole::Relationships));
        assert_eq!(role_of(CONTENT_TYPES_PART), Some(PartRole::Metadata));
        assert_eq!(role_of("word/theme/theme1.xml"), Some(PartRole::Other));
        assert_eq!(role_of("word/media/image1.png"), Some(PartRole::Media));
    }

    #[test]
    fn test_large_part_read_past_size_hint() {
        let large = vec![b'x'; MAX_SIZE_HINT as usize + 17];
        let bytes = DocumentPackage::write(&[
            (CONTENT_TYPES_PART, b"<Types/>".as_slice()),
            (BODY_PART, large.as_slice()),
        ])
        .unwrap();
        let package = DocumentPackage::open(&bytes).unwrap();
        assert_eq!(package.read_part(BODY_PART).unwrap(), large.as_slice());
    }

    #[test]
    fn test_unsupported_media_silently_dropped() {
        let package = DocumentPackage::open(&sample_package()).unwrap();
        let media: Vec<&Part> = package.media().collect();
        assert_eq!(media.len(), 2);
        assert!(package.read_part("word/media/image3.wmf").is_err());
        assert_eq!(media[1].media_type, Some(MediaType::Jpeg));
        assert_eq!(media[1].media_type.unwrap().name(), "jpeg");
    }

    #[test]
    fn test_media_dimensions() {
        let package = DocumentPackage::open(&sample_package()).unwrap();
        let png = package.media().next().unwrap();
        assert_eq!(png.dimensions, Some((1, 1)));
        assert_eq!(png.file_name(), "image1.png");
    }

    #[test]
    fn test_not_a_zip() {
        let err = DocumentPackage::open(b"plain text, not a package").unwrap_err();
        assert!(matches!(err, PackageFormatError::NotZip(_)));
    }

    #[test]
    fn test_missing_body() {
        let bytes = DocumentPackage::write(&[(STYLES_PART, b"<w:styles/>".as_slice())]).unwrap();
        let err = DocumentPackage::open(&bytes).unwrap_err();
        assert!(matches!(err, PackageFormatError::MissingBody));
    }

    #[test]
    fn test_body_from_content_types() {
        let types = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document2.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
        let bytes = DocumentPackage::write(&[
            (CONTENT_TYPES_PART, types.as_bytes()),
            ("word/document2.xml", b"<w:document/>".as_slice()),
        ])
        .unwrap();
        let package = DocumentPackage::open(&bytes).unwrap();
        assert_eq!(package.body().path, "word/document2.xml");
    }

    #[test]
    fn test_smuggled_payload_round_trip() {
        let smuggled = DocumentPackage::smuggle("quiz.docx", "<quiz></quiz>").unwrap();
        assert_eq!(smuggled.file_name, "quiz.docx");
        assert!(DocumentPackage::is_zip(&smuggled.bytes));
        let package = DocumentPackage::open(&smuggled.bytes).unwrap();
        assert_eq!(package.body().text(), "<quiz></quiz>");
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path_for("word/document.xml"), BODY_RELS_PART);
        assert_eq!(rels_path_for("doc.xml"), "_rels/doc.xml.rels");
    }
}
