/*!
 * Builds small PDFs in memory for extraction tests
 */

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// One page of a test PDF
#[derive(Debug, Clone)]
pub enum TestPage {
    /// A line of text in Courier
    Text(String),
    /// An unfiltered 8-bit gray image of the given size and no text
    GrayImage { width: u32, height: u32 },
    /// A DCTDecode image holding the given JPEG bytes
    Jpeg { bytes: Vec<u8>, width: u32, height: u32 },
    /// Nothing at all
    Blank,
}

impl TestPage {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Serialize a PDF with the given pages.
///
/// Text pages inherit their font from the page tree root; image pages carry
/// their own resources.
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let shared_resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };

        match page {
            TestPage::Text(text) => {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                page_dict.set("Contents", content_id);
            }
            TestPage::GrayImage { width, height } => {
                let pixels = vec![128u8; (*width * *height) as usize];
                let image_id = doc.add_object(Stream::new(image_dict(*width, *height, "DeviceGray", None), pixels));
                add_image(&mut doc, &mut page_dict, image_id);
            }
            TestPage::Jpeg { bytes, width, height } => {
                let image_id = doc.add_object(Stream::new(
                    image_dict(*width, *height, "DeviceGray", Some("DCTDecode")),
                    bytes.clone(),
                ));
                add_image(&mut doc, &mut page_dict, image_id);
            }
            TestPage::Blank => {}
        }

        kids.push(doc.add_object(page_dict).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => shared_resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: Option<&str>) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(filter) = filter {
        dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    }
    dict
}

fn add_image(doc: &mut Document, page_dict: &mut Dictionary, image_id: lopdf::ObjectId) {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()]),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    page_dict.set("Contents", content_id);
    page_dict.set(
        "Resources",
        dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        },
    );
}
