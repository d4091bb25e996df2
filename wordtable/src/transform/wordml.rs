//! Import pass 1: WordML document parts to XHTML
//!
//! Input is the assembled container holding the `<document>` body, the
//! `<styles>` part, the body `<relationships>` and the extracted `<images>`.
//! Output is an `<html>` document whose body mirrors the Word body:
//! paragraphs carry their style id as `class`, heading styles become
//! `<h1>`..`<h6>`, runs become `b`/`i`/`u`/`sub`/`sup`, tables keep their
//! column spans and drawings become `<img>` elements.

use super::support::{container_child, require_child};
use super::{Stylesheet, StylesheetError};
use crate::params::{self, ConversionParameters, ImageHandling};
use crate::sanitize::PLUGINFILE_PREFIX;
use crate::xml::{Element, Node};
use std::collections::HashMap;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const SOFT_HYPHEN: char = '\u{ad}';

/// DrawingML extents are in EMU; 9525 EMU per CSS pixel at 96 dpi
const EMU_PER_PIXEL: u64 = 9525;

/// The import pass 1 stylesheet
pub struct WordMlToXhtml;

impl Stylesheet for WordMlToXhtml {
    fn apply(
        &self,
        input: &roxmltree::Document,
        params: &ConversionParameters,
    ) -> Result<String, StylesheetError> {
        let document = require_child(input, "document")?;
        let body = document
            .descendants()
            .find(|n| is_wml(*n, "body"))
            .ok_or_else(|| StylesheetError::new("document has no w:body element"))?;

        let ctx = Context {
            styles: container_child(input, "styles")
                .map(StyleMap::from_node)
                .unwrap_or_default(),
            relationships: container_child(input, "relationships")
                .map(relationship_targets)
                .unwrap_or_default(),
            images: container_child(input, "images")
                .map(image_table)
                .unwrap_or_default(),
            image_handling: params.image_handling(),
            heading_base: params.heading_level(),
        };

        let mut html_body = Element::new("body");
        for child in body.children() {
            ctx.block(child, &mut html_body.children);
        }

        let head = Element::new("head").child(
            Element::new("title").text(params.get_or(params::COURSE_NAME, "")),
        );
        let html = Element::new("html")
            .attr("lang", params.get_or(params::LANGUAGE, "en"))
            .attr("dir", params.text_direction().as_str())
            .child(head)
            .child(html_body);
        Ok(html.to_xml())
    }
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, '_>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// A toggle property (w:b, w:i): present without `w:val="0"`/`"false"` means on
fn wml_bool(parent: roxmltree::Node, name: &str) -> bool {
    wml(parent, name).is_some_and(|n| {
        n.attribute((WML_NS, "val"))
            .map_or(true, |v| v != "0" && v != "false")
    })
}

/// Paragraph style ids and the heading level each one stands for
#[derive(Debug, Default)]
struct StyleMap {
    headings: HashMap<String, u8>,
}

impl StyleMap {
    fn from_node(styles: roxmltree::Node) -> Self {
        let mut headings = HashMap::new();
        for style in styles.descendants().filter(|n| is_wml(*n, "style")) {
            let Some(id) = style.attribute((WML_NS, "styleId")) else {
                continue;
            };
            let level = wml_attr(style, "name")
                .and_then(heading_level_of_name)
                .or_else(|| {
                    wml(style, "pPr")
                        .and_then(|ppr| wml_attr(ppr, "outlineLvl"))
                        .and_then(|v| v.parse::<u8>().ok())
                        .map(|v| v + 1)
                });
            if let Some(level) = level {
                headings.insert(id.to_string(), level);
            }
        }
        Self { headings }
    }

    fn heading_level(&self, style_id: &str) -> Option<u8> {
        self.headings
            .get(style_id)
            .copied()
            .or_else(|| heading_level_of_name(style_id))
    }
}

/// "heading 2" or "Heading2" → 2
fn heading_level_of_name(name: &str) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    let rest = lower.strip_prefix("heading")?.trim_start();
    rest.parse::<u8>().ok().filter(|l| (1..=9).contains(l))
}

fn relationship_targets(rels: roxmltree::Node) -> HashMap<String, String> {
    rels.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| Some((n.attribute("Id")?.to_string(), n.attribute("Target")?.to_string())))
        .collect()
}

/// One image from the `<images>` element
#[derive(Debug)]
struct ImageData {
    name: String,
    mime: String,
    data: String,
    width: Option<String>,
    height: Option<String>,
}

fn image_table(images: roxmltree::Node) -> HashMap<String, ImageData> {
    images
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "file")
        .filter_map(|n| {
            let path = n.attribute("path")?.to_string();
            let image = ImageData {
                name: n.attribute("name").unwrap_or_default().to_string(),
                mime: n.attribute("mime").unwrap_or("image/png").to_string(),
                data: n.text().unwrap_or_default().trim().to_string(),
                width: n.attribute("width").map(str::to_string),
                height: n.attribute("height").map(str::to_string),
            };
            Some((path, image))
        })
        .collect()
}

/// Relationship targets are relative to the `word/` directory
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target.trim_start_matches("./")),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunFormat {
    bold: bool,
    italic: bool,
    underline: bool,
    superscript: bool,
    subscript: bool,
}

impl RunFormat {
    fn from_run(run: roxmltree::Node) -> Self {
        let Some(rpr) = wml(run, "rPr") else {
            return Self::default();
        };
        let vert = wml_attr(rpr, "vertAlign");
        Self {
            bold: wml_bool(rpr, "b"),
            italic: wml_bool(rpr, "i"),
            underline: wml_attr(rpr, "u").is_some_and(|v| v != "none"),
            superscript: vert == Some("superscript"),
            subscript: vert == Some("subscript"),
        }
    }

    /// Wrap text in the formatting elements, innermost first
    fn wrap(self, text: String) -> Node {
        let mut node = Node::Text(text);
        for (on, name) in [
            (self.subscript, "sub"),
            (self.superscript, "sup"),
            (self.underline, "u"),
            (self.italic, "i"),
            (self.bold, "b"),
        ] {
            if on {
                node = Element::new(name).child(node).into();
            }
        }
        node
    }
}

struct Context {
    styles: StyleMap,
    relationships: HashMap<String, String>,
    images: HashMap<String, ImageData>,
    image_handling: ImageHandling,
    heading_base: u8,
}

impl Context {
    fn block(&self, node: roxmltree::Node, out: &mut Vec<Node>) {
        if !node.is_element() || node.tag_name().namespace() != Some(WML_NS) {
            return;
        }
        match node.tag_name().name() {
            "p" => out.push(self.paragraph(node).into()),
            "tbl" => out.push(self.table(node).into()),
            "sdt" => {
                if let Some(content) = wml(node, "sdtContent") {
                    for child in content.children() {
                        self.block(child, out);
                    }
                }
            }
            "customXml" | "ins" => {
                for child in node.children() {
                    self.block(child, out);
                }
            }
            _ => {}
        }
    }

    fn paragraph(&self, p: roxmltree::Node) -> Element {
        let ppr = wml(p, "pPr");
        let style = ppr.and_then(|ppr| wml_attr(ppr, "pStyle"));

        let heading = style
            .and_then(|s| self.styles.heading_level(s))
            .or_else(|| {
                ppr.and_then(|ppr| wml_attr(ppr, "outlineLvl"))
                    .and_then(|v| v.parse::<u8>().ok())
                    .map(|v| v + 1)
            })
            .and_then(|level| self.shift_heading(level));

        let mut element = match heading {
            Some(level) => Element::new(format!("h{level}")),
            None => {
                let mut el = Element::new("p");
                if let Some(style) = style {
                    el.set_attr("class", style);
                }
                el
            }
        };
        for child in p.children() {
            self.inline(child, &mut element.children);
        }
        element
    }

    /// Map a Word heading level onto the question bank levels
    fn shift_heading(&self, level: u8) -> Option<u8> {
        let shifted = i16::from(level) - i16::from(self.heading_base) + 1;
        (1..=6).contains(&shifted).then_some(shifted as u8)
    }

    fn inline(&self, node: roxmltree::Node, out: &mut Vec<Node>) {
        if !node.is_element() || node.tag_name().namespace() != Some(WML_NS) {
            return;
        }
        match node.tag_name().name() {
            "r" => self.run(node, out),
            "hyperlink" | "ins" | "smartTag" | "customXml" | "fldSimple" => {
                for child in node.children() {
                    self.inline(child, out);
                }
            }
            "sdt" => {
                if let Some(content) = wml(node, "sdtContent") {
                    for child in content.children() {
                        self.inline(child, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn run(&self, run: roxmltree::Node, out: &mut Vec<Node>) {
        let format = RunFormat::from_run(run);
        let mut text = String::new();

        for child in run.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "t" => text.extend(
                    child
                        .text()
                        .unwrap_or_default()
                        .chars()
                        .filter(|c| *c != SOFT_HYPHEN),
                ),
                // Optional hyphens from Word's hyphenation never reach the text
                "softHyphen" => {}
                "tab" => text.push(' '),
                "noBreakHyphen" => text.push('-'),
                "br" | "cr" => {
                    flush(&mut text, format, out);
                    out.push(Element::new("br").into());
                }
                "drawing" | "pict" => {
                    flush(&mut text, format, out);
                    if let Some(img) = self.image(child) {
                        out.push(img.into());
                    }
                }
                _ => {}
            }
        }
        flush(&mut text, format, out);
    }

    fn image(&self, drawing: roxmltree::Node) -> Option<Element> {
        let (rel_id, size) = match drawing.tag_name().name() {
            "drawing" => {
                let blip = drawing
                    .descendants()
                    .find(|n| n.is_element() && n.tag_name().name() == "blip")?;
                let extent = drawing
                    .descendants()
                    .find(|n| n.is_element() && n.tag_name().name() == "extent")
                    .and_then(|e| {
                        let cx = e.attribute("cx")?.parse::<u64>().ok()?;
                        let cy = e.attribute("cy")?.parse::<u64>().ok()?;
                        Some((cx / EMU_PER_PIXEL, cy / EMU_PER_PIXEL))
                    });
                (blip.attribute((REL_NS, "embed"))?, extent)
            }
            _ => {
                let data = drawing
                    .descendants()
                    .find(|n| n.is_element() && n.tag_name().name() == "imagedata")?;
                (data.attribute((REL_NS, "id"))?, None)
            }
        };

        let target = self.relationships.get(rel_id)?;
        let Some(image) = self.images.get(&resolve_target(target)) else {
            log::debug!("Image {} is not available, dropping it", target);
            return None;
        };

        let src = match self.image_handling {
            ImageHandling::Embedded => format!("data:{};base64,{}", image.mime, image.data),
            ImageHandling::Referenced => format!("{PLUGINFILE_PREFIX}{}", image.name),
        };
        let alt = drawing
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "docPr")
            .and_then(|d| d.attribute("descr").or(d.attribute("name")))
            .unwrap_or(&image.name);

        let mut img = Element::new("img").attr("src", src).attr("alt", alt);
        match size {
            Some((w, h)) => {
                img.set_attr("width", w.to_string());
                img.set_attr("height", h.to_string());
            }
            None => {
                if let (Some(w), Some(h)) = (&image.width, &image.height) {
                    img.set_attr("width", w.as_str());
                    img.set_attr("height", h.as_str());
                }
            }
        }
        Some(img)
    }

    fn table(&self, tbl: roxmltree::Node) -> Element {
        let mut thead = Element::new("thead");
        let mut tbody = Element::new("tbody");

        for tr in tbl.children().filter(|n| is_wml(*n, "tr")) {
            let header = wml(tr, "trPr").is_some_and(|pr| wml_bool(pr, "tblHeader"));
            let mut row = Element::new("tr");
            for tc in tr.children().filter(|n| is_wml(*n, "tc")) {
                let mut cell = Element::new("td");
                if let Some(span) = wml(tc, "tcPr").and_then(|pr| wml_attr(pr, "gridSpan")) {
                    if span != "1" {
                        cell.set_attr("colspan", span);
                    }
                }
                for child in tc.children() {
                    self.block(child, &mut cell.children);
                }
                row.push(cell);
            }
            // Header rows only count while no body row has been seen
            if header && tbody.children.is_empty() {
                thead.push(row);
            } else {
                tbody.push(row);
            }
        }

        let mut table = Element::new("table").attr("border", "1");
        if !thead.children.is_empty() {
            table.push(thead);
        }
        table.push(tbody);
        table
    }
}

fn flush(text: &mut String, format: RunFormat, out: &mut Vec<Node>) {
    if !text.is_empty() {
        out.push(format.wrap(std::mem::take(text)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{StyleSheetRef, TransformEngine};

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn run(body: &str, extra: &str, params: &ConversionParameters) -> String {
        let input = format!(
            r#"<container><document><w:document {W}><w:body>{body}</w:body></w:document></document>{extra}</container>"#
        );
        TransformEngine::builtin()
            .run(&input, StyleSheetRef::ImportPass1, params)
            .unwrap()
    }

    #[test]
    fn test_headings_and_runs() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Week 1</w:t></w:r></w:p>
            <w:p><w:pPr><w:pStyle w:val="Cell"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:rPr><w:i w:val="0"/></w:rPr><w:t xml:space="preserve"> plain</w:t></w:r><w:r><w:rPr><w:vertAlign w:val="superscript"/></w:rPr><w:t>2</w:t></w:r></w:p>"#;
        let html = run(body, "", &ConversionParameters::default());
        assert!(html.contains("<h1>Week 1</h1>"));
        assert!(html.contains(r#"<p class="Cell"><b>Bold</b> plain<sup>2</sup></p>"#));
    }

    #[test]
    fn test_heading_level_offset() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Cat</w:t></w:r></w:p>
            <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>"#;
        let params = ConversionParameters::builder()
            .set(params::HEADING_LEVEL, "2")
            .build();
        let html = run(body, "", &params);
        assert!(html.contains("<h1>Cat</h1>"));
        assert!(html.contains(r#"<p class="Heading1">Title</p>"#));
    }

    #[test]
    fn test_styles_part_names_headings() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Kop2"/></w:pPr><w:r><w:t>Vraag</w:t></w:r></w:p>"#;
        let styles = format!(
            r#"<styles><w:styles {W}><w:style w:type="paragraph" w:styleId="Kop2"><w:name w:val="heading 2"/></w:style></w:styles></styles>"#
        );
        let html = run(body, &styles, &ConversionParameters::default());
        assert!(html.contains("<h2>Vraag</h2>"));
    }

    #[test]
    fn test_soft_hyphens_dropped() {
        let body = "<w:p><w:pPr><w:pStyle w:val=\"Heading2\"/></w:pPr><w:r><w:t>Auto\u{ad}matic</w:t></w:r></w:p>\
            <w:p><w:r><w:t>Hy&#173;phen</w:t><w:softHyphen/><w:t>ated</w:t></w:r></w:p>";
        let html = run(body, "", &ConversionParameters::default());
        assert!(html.contains("<h2>Automatic</h2>"));
        assert!(html.contains("<p>Hyphenated</p>"));
        assert!(!html.contains('\u{ad}'));
    }

    #[test]
    fn test_table_spans_and_breaks() {
        let body = r#"<w:tbl><w:tr><w:trPr><w:tblHeader/></w:trPr><w:tc><w:tcPr><w:gridSpan w:val="3"/></w:tcPr><w:p><w:r><w:t>Text</w:t><w:br/><w:t>more</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>MC</w:t></w:r></w:p></w:tc></w:tr>
            <w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>"#;
        let html = run(body, "", &ConversionParameters::default());
        assert!(html.contains(r#"<thead><tr><td colspan="3"><p>Text<br/>more</p></td><td><p>MC</p></td></tr></thead>"#));
        assert!(html.contains("<tbody><tr><td><p/></td></tr></tbody>"));
    }

    #[test]
    fn test_images_embedded_and_referenced() {
        let body = r#"<w:p><w:r><w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><wp:extent cx="952500" cy="476250"/><wp:docPr id="1" name="Picture 1" descr="A chart"/><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData><a:blip r:embed="rId5"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;
        let extra = r#"<relationships><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId5" Type="image" Target="media/image1.png"/></Relationships></relationships><images><file path="word/media/image1.png" name="image1.png" mime="image/png">QUJD</file></images>"#;

        let html = run(body, extra, &ConversionParameters::default());
        assert!(html.contains(
            r#"<img src="data:image/png;base64,QUJD" alt="A chart" width="100" height="50"/>"#
        ));

        let params = ConversionParameters::builder()
            .set(params::IMAGE_HANDLING, "referenced")
            .build();
        let html = run(body, extra, &params);
        assert!(html.contains(r#"src="@@PLUGINFILE@@/image1.png""#));
    }

    #[test]
    fn test_missing_image_dropped() {
        let body = r#"<w:p><w:r><w:t>x</w:t><w:drawing><a:blip xmlns:a="urn:a" r:embed="rId9"/></w:drawing></w:r></w:p>"#;
        let html = run(body, "", &ConversionParameters::default());
        assert!(html.contains("<p>x</p>"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let err = TransformEngine::builtin()
            .run(
                "<container><document><x/></document></container>",
                StyleSheetRef::ImportPass1,
                &ConversionParameters::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("w:body"));
    }
}
