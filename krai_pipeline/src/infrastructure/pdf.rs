// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `lopdf`-backed PDF Sources
//!
//! Text extraction (`PageTextSource`) walks `lopdf`'s page tree and calls
//! its built-in per-page `extract_text`. Image extraction (`PdfImageSource`)
//! walks each page's `/Resources/XObject` dictionary for image streams and
//! decodes them with the `image` crate, re-encoding to PNG so callers only
//! ever see PNG bytes regardless of the PDF's internal filter (`DCTDecode`/
//! JPEG is the common case for scanned service manuals). `lopdf` has no
//! vector rasterizer, so `render_pages` is a documented no-op.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::{ImageFormat, ImageReader};
use lopdf::{Dictionary, Document, Object};

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::services::chunker::{PageText, PageTextSource};
use krai_pipeline_domain::services::image_source::{PageImage, PdfImageSource};

async fn load(file_path: &Path) -> Result<Document, PipelineError> {
    let bytes = tokio::fs::read(file_path).await.map_err(|e| PipelineError::input(format!("failed to read {}: {e}", file_path.display())))?;
    Document::load_mem(&bytes).map_err(|e| PipelineError::input(format!("failed to parse PDF: {e}")))
}

fn page_numbers(doc: &Document) -> Vec<u32> {
    doc.get_pages().keys().copied().collect()
}

fn resources_dict<'a>(doc: &'a Document, page_id: (u32, u16)) -> Option<&'a Dictionary> {
    let resources_id = doc.get_page_resources(page_id).0?;
    doc.get_dictionary(resources_id).ok()
}

fn xobject_streams<'a>(doc: &'a Document, resources: &'a Dictionary) -> Vec<(&'a [u8], &'a lopdf::Stream)> {
    let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, reference)| {
            let object_id = reference.as_reference().ok()?;
            let stream = doc.get_object(object_id).ok()?.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok()?;
            (subtype == b"Image").then_some((name.as_slice(), stream))
        })
        .collect()
}

pub struct LopdfPdfSource;

#[async_trait]
impl PageTextSource for LopdfPdfSource {
    async fn extract_pages(&self, file_path: &Path) -> Result<Vec<PageText>, PipelineError> {
        let doc = load(file_path).await?;
        let mut pages = Vec::new();
        for page_number in page_numbers(&doc) {
            let text = doc
                .extract_text(&[page_number])
                .map_err(|e| PipelineError::transient("pdf", format!("page {page_number}: {e}")))?;
            pages.push(PageText { page_number, text });
        }
        pages.sort_by_key(|p| p.page_number);
        Ok(pages)
    }
}

#[async_trait]
impl PdfImageSource for LopdfPdfSource {
    async fn extract_images(&self, file_path: &Path) -> Result<Vec<PageImage>, PipelineError> {
        let doc = load(file_path).await?;
        let mut images = Vec::new();

        for page_number in page_numbers(&doc) {
            let Some(page_id) = doc.get_pages().get(&page_number).copied() else { continue };
            let Some(resources) = resources_dict(&doc, page_id) else { continue };

            for (image_index, (_name, stream)) in xobject_streams(&doc, resources).into_iter().enumerate() {
                let Ok(raw) = stream.decompressed_content() else {
                    tracing::warn!(page_number, "skipping image XObject with undecodable filter");
                    continue;
                };

                match ImageReader::new(Cursor::new(raw)).with_guessed_format().ok().and_then(|r| r.decode().ok()) {
                    Some(decoded) => {
                        let mut png_bytes = Vec::new();
                        if decoded.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png).is_ok() {
                            images.push(PageImage {
                                page_number,
                                image_index: image_index as u32,
                                width_px: decoded.width(),
                                height_px: decoded.height(),
                                png_bytes,
                            });
                        }
                    }
                    None => {
                        tracing::warn!(page_number, image_index, "skipping image XObject with unrecognized encoding");
                    }
                }
            }
        }

        Ok(images)
    }

    async fn render_pages(&self, _file_path: &Path, _dpi: u32) -> Result<Vec<PageImage>, PipelineError> {
        // lopdf has no vector rasterizer; vector-graphics page rendering is
        // unsupported until a rasterizing backend is added.
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(lopdf::dictionary! {
            "Font" => lopdf::dictionary! { "F1" => font_id },
        });
        let content = lopdf::content::Content {
            operations: vec![
                lopdf::content::Operation::new("BT", vec![]),
                lopdf::content::Operation::new("Tf", vec!["F1".into(), 12.into()]),
                lopdf::content::Operation::new("Td", vec![72.into(), 720.into()]),
                lopdf::content::Operation::new("Tj", vec![Object::string_literal("hello")]),
                lopdf::content::Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(lopdf::Stream::new(lopdf::dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    async fn write_temp_pdf() -> tempfile::TempPath {
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), minimal_pdf()).await.unwrap();
        file.into_temp_path()
    }

    #[tokio::test]
    async fn test_extract_pages_finds_the_page_content() {
        let path = write_temp_pdf().await;
        let pages = LopdfPdfSource.extract_pages(&path).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("hello"));
    }

    #[tokio::test]
    async fn test_extract_images_of_text_only_page_is_empty() {
        let path = write_temp_pdf().await;
        assert!(LopdfPdfSource.extract_images(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_render_pages_is_unsupported_but_not_an_error() {
        let path = write_temp_pdf().await;
        assert!(LopdfPdfSource.render_pages(&path, 150).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_bytes_are_an_input_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), b"not a pdf").await.unwrap();
        let error = LopdfPdfSource.extract_pages(file.path()).await.unwrap_err();
        assert_eq!(error.category(), "input");
    }
}
