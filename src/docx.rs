//! Minimal WordprocessingML writer.
//!
//! The converter only ever produces two kinds of block: a plain-text
//! paragraph and a page break. [`DocxDocument`] accumulates them and
//! [`DocxDocument::to_bytes`] writes the smallest OPC package Word and
//! LibreOffice open without complaint:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml
//! docProps/app.xml
//! word/document.xml
//! ```
//!
//! Output is deterministic: parts are written in a fixed order with a fixed
//! timestamp, so the same blocks always serialise to the same bytes.

use crate::error::Scan2DocxError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>scan2docx</Application></Properties>"#;

/// One top-level element of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Plain text; `\n` and `\t` become line breaks and tabs.
    Paragraph(String),
    /// Forces following content onto a new page.
    PageBreak,
}

/// An in-memory document made of paragraphs and page breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    blocks: Vec<Block>,
    title: Option<String>,
    creator: Option<String>,
}

impl DocxDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title shown in the document properties.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Set the author shown in the document properties.
    pub fn set_creator(&mut self, creator: impl Into<String>) {
        self.creator = Some(creator.into());
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    pub fn add_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Paragraph texts in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(text) => Some(text.as_str()),
            Block::PageBreak => None,
        })
    }

    pub fn page_breaks(&self) -> usize {
        self.blocks.iter().filter(|b| **b == Block::PageBreak).count()
    }

    /// Serialise the document as a `.docx` package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Scan2DocxError> {
        let document_xml = self.document_xml()?;
        let core_xml = self.core_xml()?;

        let options = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let parts: [(&str, &[u8]); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
            ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
            ("docProps/core.xml", &core_xml),
            ("docProps/app.xml", APP_XML.as_bytes()),
            ("word/document.xml", &document_xml),
        ];
        for (name, data) in parts {
            zip.start_file(name, options).map_err(write_err)?;
            zip.write_all(data).map_err(write_err)?;
        }
        let cursor = zip.finish().map_err(write_err)?;
        Ok(cursor.into_inner())
    }

    fn document_xml(&self) -> Result<Vec<u8>, Scan2DocxError> {
        let mut w = Writer::new(Vec::new());
        emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        emit(
            &mut w,
            Event::Start(BytesStart::new("w:document").with_attributes([("xmlns:w", W_NS)])),
        )?;
        emit(&mut w, Event::Start(BytesStart::new("w:body")))?;

        for block in &self.blocks {
            match block {
                Block::Paragraph(text) => write_paragraph(&mut w, text)?,
                Block::PageBreak => write_page_break(&mut w)?,
            }
        }

        // A4 portrait with one-inch margins.
        emit(&mut w, Event::Start(BytesStart::new("w:sectPr")))?;
        emit(
            &mut w,
            Event::Empty(BytesStart::new("w:pgSz").with_attributes([("w:w", "11906"), ("w:h", "16838")])),
        )?;
        emit(
            &mut w,
            Event::Empty(BytesStart::new("w:pgMar").with_attributes([
                ("w:top", "1440"),
                ("w:right", "1440"),
                ("w:bottom", "1440"),
                ("w:left", "1440"),
                ("w:header", "720"),
                ("w:footer", "720"),
                ("w:gutter", "0"),
            ])),
        )?;
        emit(&mut w, Event::End(BytesEnd::new("w:sectPr")))?;

        emit(&mut w, Event::End(BytesEnd::new("w:body")))?;
        emit(&mut w, Event::End(BytesEnd::new("w:document")))?;
        Ok(w.into_inner())
    }

    fn core_xml(&self) -> Result<Vec<u8>, Scan2DocxError> {
        let mut w = Writer::new(Vec::new());
        emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        emit(
            &mut w,
            Event::Start(BytesStart::new("cp:coreProperties").with_attributes([
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ])),
        )?;
        for (tag, value) in [("dc:title", &self.title), ("dc:creator", &self.creator)] {
            if let Some(value) = value {
                emit(&mut w, Event::Start(BytesStart::new(tag)))?;
                emit(&mut w, Event::Text(BytesText::new(&xml_safe(value))))?;
                emit(&mut w, Event::End(BytesEnd::new(tag)))?;
            }
        }
        emit(&mut w, Event::End(BytesEnd::new("cp:coreProperties")))?;
        Ok(w.into_inner())
    }
}

fn write_paragraph(w: &mut Writer<Vec<u8>>, text: &str) -> Result<(), Scan2DocxError> {
    emit(w, Event::Start(BytesStart::new("w:p")))?;
    emit(w, Event::Start(BytesStart::new("w:r")))?;

    let mut run = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                flush_text(w, &mut run)?;
                emit(w, Event::Empty(BytesStart::new("w:br")))?;
            }
            '\t' => {
                flush_text(w, &mut run)?;
                emit(w, Event::Empty(BytesStart::new("w:tab")))?;
            }
            c if is_xml_char(c) => run.push(c),
            _ => {}
        }
    }
    flush_text(w, &mut run)?;

    emit(w, Event::End(BytesEnd::new("w:r")))?;
    emit(w, Event::End(BytesEnd::new("w:p")))
}

fn write_page_break(w: &mut Writer<Vec<u8>>) -> Result<(), Scan2DocxError> {
    emit(w, Event::Start(BytesStart::new("w:p")))?;
    emit(w, Event::Start(BytesStart::new("w:r")))?;
    emit(
        w,
        Event::Empty(BytesStart::new("w:br").with_attributes([("w:type", "page")])),
    )?;
    emit(w, Event::End(BytesEnd::new("w:r")))?;
    emit(w, Event::End(BytesEnd::new("w:p")))
}

fn flush_text(w: &mut Writer<Vec<u8>>, run: &mut String) -> Result<(), Scan2DocxError> {
    if run.is_empty() {
        return Ok(());
    }
    emit(
        w,
        Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
    )?;
    emit(w, Event::Text(BytesText::new(run.as_str())))?;
    emit(w, Event::End(BytesEnd::new("w:t")))?;
    run.clear();
    Ok(())
}

/// Characters allowed by XML 1.0. Tesseract ends each page with a form feed.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn xml_safe(s: &str) -> String {
    s.chars().filter(|c| is_xml_char(*c)).collect()
}

fn emit(w: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), Scan2DocxError> {
    w.write_event(event).map_err(write_err)
}

fn write_err(e: impl std::fmt::Display) -> Scan2DocxError {
    Scan2DocxError::DocumentWriteFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("valid zip");
        let mut part = archive.by_name(name).expect("part present");
        let mut s = String::new();
        part.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn package_contains_required_parts() {
        let bytes = DocxDocument::new().to_bytes().unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "word/document.xml",
        ] {
            assert!(names.contains(&part), "missing {part}: {names:?}");
        }
    }

    #[test]
    fn empty_document_has_no_paragraphs() {
        let bytes = DocxDocument::new().to_bytes().unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(!xml.contains("<w:p>"));
        assert!(xml.contains("<w:sectPr>"));
    }

    #[test]
    fn paragraph_then_page_break() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("Hello");
        doc.add_page_break();
        let xml = read_part(&doc.to_bytes().unwrap(), "word/document.xml");

        assert_eq!(xml.matches("<w:p>").count(), 2);
        assert_eq!(xml.matches(r#"<w:br w:type="page"/>"#).count(), 1);
        let text_at = xml.find("Hello").unwrap();
        let break_at = xml.find(r#"w:type="page""#).unwrap();
        assert!(text_at < break_at);
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("a < b & c > d");
        let xml = read_part(&doc.to_bytes().unwrap(), "word/document.xml");
        assert!(xml.contains("a &lt; b &amp; c &gt; d"), "{xml}");
    }

    #[test]
    fn newlines_and_tabs_become_elements() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("one\ntwo\r\nthree\tfour");
        let xml = read_part(&doc.to_bytes().unwrap(), "word/document.xml");
        assert_eq!(xml.matches("<w:br/>").count(), 2);
        assert_eq!(xml.matches("<w:tab/>").count(), 1);
        assert!(xml.contains(r#"<w:t xml:space="preserve">three</w:t>"#));
    }

    #[test]
    fn control_characters_are_dropped() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("Trang một\u{000C}\u{0000}");
        let xml = read_part(&doc.to_bytes().unwrap(), "word/document.xml");
        assert!(xml.contains("Trang một"));
        assert!(!xml.contains('\u{000C}'));
        assert!(!xml.contains('\u{0000}'));
    }

    #[test]
    fn core_properties_carry_title_and_creator() {
        let mut doc = DocxDocument::new();
        doc.set_title("Hợp đồng & phụ lục");
        doc.set_creator("Phòng hành chính");
        let xml = read_part(&doc.to_bytes().unwrap(), "docProps/core.xml");
        assert!(xml.contains("<dc:title>Hợp đồng &amp; phụ lục</dc:title>"), "{xml}");
        assert!(xml.contains("<dc:creator>Phòng hành chính</dc:creator>"));
    }

    #[test]
    fn serialisation_is_deterministic() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("Hello");
        doc.add_page_break();
        doc.add_paragraph("World");
        doc.add_page_break();
        assert_eq!(doc.to_bytes().unwrap(), doc.to_bytes().unwrap());
    }

    #[test]
    fn paragraphs_iterates_in_order() {
        let mut doc = DocxDocument::new();
        doc.add_paragraph("first");
        doc.add_page_break();
        doc.add_paragraph("second");
        doc.add_page_break();
        assert_eq!(doc.paragraphs().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(doc.page_breaks(), 2);
    }
}
