//! Tagged, self-describing JSON serialization of the content model.
//!
//! Every record is emitted as an object carrying `"_type"` next to its
//! fields; binary payloads become `{"_bytes": "<base64>"}`. With
//! `include_binary` off, payload fields are nulled but keep their key.
//! [`deserialize`] inverts [`serialize`] through a registry of type tags,
//! so `deserialize(serialize(x, true)) == x` for every content type.

use crate::error::{DocsiftError, Result};
use crate::types::*;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Options threaded through the encoding walk.
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub include_binary: bool,
}

/// Serialize a content object into a JSON value tree.
pub fn serialize(content: &ExtractedContent, include_binary: bool) -> Value {
    let opts = SerializeOptions { include_binary };
    match content {
        ExtractedContent::Doc(c) => c.to_tagged(&opts),
        ExtractedContent::Docx(c) => c.to_tagged(&opts),
        ExtractedContent::Xls(c) => c.to_tagged(&opts),
        ExtractedContent::Xlsx(c) => c.to_tagged(&opts),
        ExtractedContent::Ppt(c) => c.to_tagged(&opts),
        ExtractedContent::Pptx(c) => c.to_tagged(&opts),
        ExtractedContent::Rtf(c) => c.to_tagged(&opts),
        ExtractedContent::Odt(c) => c.to_tagged(&opts),
        ExtractedContent::Odp(c) => c.to_tagged(&opts),
        ExtractedContent::Ods(c) => c.to_tagged(&opts),
        ExtractedContent::Pdf(c) => c.to_tagged(&opts),
        ExtractedContent::PlainText(c) => c.to_tagged(&opts),
        ExtractedContent::Html(c) => c.to_tagged(&opts),
        ExtractedContent::Epub(c) => c.to_tagged(&opts),
        ExtractedContent::Email(c) => c.to_tagged(&opts),
    }
}

/// Serialize the logical units of a content object as a JSON array.
pub fn serialize_units(content: &ExtractedContent) -> Value {
    Value::Array(
        content
            .units()
            .into_iter()
            .map(|unit| {
                let mut map = Map::new();
                map.insert("_type".to_string(), Value::String("Unit".to_string()));
                map.insert("number".to_string(), Value::from(unit.number));
                map.insert("kind".to_string(), Value::String(unit.kind.as_str().to_string()));
                map.insert("text".to_string(), Value::String(unit.text));
                Value::Object(map)
            })
            .collect(),
    )
}

type ContentDecoder = fn(&Value) -> Result<ExtractedContent>;

/// Type-tag registry, built lazily on first deserialization and
/// read-only afterwards.
static CONTENT_REGISTRY: Lazy<HashMap<&'static str, ContentDecoder>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, ContentDecoder> = HashMap::new();
    m.insert("DocContent", |v| Ok(ExtractedContent::Doc(DocContent::from_tagged(v)?)));
    m.insert("DocxContent", |v| Ok(ExtractedContent::Docx(DocxContent::from_tagged(v)?)));
    m.insert("XlsContent", |v| Ok(ExtractedContent::Xls(XlsContent::from_tagged(v)?)));
    m.insert("XlsxContent", |v| Ok(ExtractedContent::Xlsx(XlsxContent::from_tagged(v)?)));
    m.insert("PptContent", |v| Ok(ExtractedContent::Ppt(PptContent::from_tagged(v)?)));
    m.insert("PptxContent", |v| Ok(ExtractedContent::Pptx(PptxContent::from_tagged(v)?)));
    m.insert("RtfContent", |v| Ok(ExtractedContent::Rtf(RtfContent::from_tagged(v)?)));
    m.insert("OdtContent", |v| Ok(ExtractedContent::Odt(OdtContent::from_tagged(v)?)));
    m.insert("OdpContent", |v| Ok(ExtractedContent::Odp(OdpContent::from_tagged(v)?)));
    m.insert("OdsContent", |v| Ok(ExtractedContent::Ods(OdsContent::from_tagged(v)?)));
    m.insert("PdfContent", |v| Ok(ExtractedContent::Pdf(PdfContent::from_tagged(v)?)));
    m.insert("PlainTextContent", |v| {
        Ok(ExtractedContent::PlainText(PlainTextContent::from_tagged(v)?))
    });
    m.insert("HtmlContent", |v| Ok(ExtractedContent::Html(HtmlContent::from_tagged(v)?)));
    m.insert("EpubContent", |v| Ok(ExtractedContent::Epub(EpubContent::from_tagged(v)?)));
    m.insert("EmailContent", |v| {
        Ok(ExtractedContent::Email(EmailContent::from_tagged(v)?))
    });
    m
});

/// Deserialize a JSON value tree produced by [`serialize`].
pub fn deserialize(value: &Value) -> Result<ExtractedContent> {
    let tag = value
        .get("_type")
        .and_then(Value::as_str)
        .ok_or_else(|| DocsiftError::Serialization("missing _type tag".to_string()))?;
    let decoder = CONTENT_REGISTRY
        .get(tag)
        .ok_or_else(|| DocsiftError::Serialization(format!("unknown content type tag '{tag}'")))?;
    decoder(value)
}

// --- field codecs -----------------------------------------------------------

/// Per-field encoding/decoding. Implemented for scalars, options, lists,
/// and (via the `tagged!` macro) every record of the content model.
pub(crate) trait FieldCodec: Sized {
    fn encode(&self, opts: &SerializeOptions) -> Value;
    fn decode(value: &Value) -> Result<Self>;
}

fn type_error(expected: &str, got: &Value) -> DocsiftError {
    DocsiftError::Serialization(format!("expected {expected}, got {got}"))
}

impl FieldCodec for String {
    fn encode(&self, _opts: &SerializeOptions) -> Value {
        Value::String(self.clone())
    }
    fn decode(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_error("string", value))
    }
}

impl FieldCodec for bool {
    fn encode(&self, _opts: &SerializeOptions) -> Value {
        Value::Bool(*self)
    }
    fn decode(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| type_error("bool", value))
    }
}

macro_rules! numeric_codec {
    ($ty:ty, $as:ident, $expected:literal) => {
        impl FieldCodec for $ty {
            fn encode(&self, _opts: &SerializeOptions) -> Value {
                Value::from(*self)
            }
            fn decode(value: &Value) -> Result<Self> {
                value
                    .$as()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .ok_or_else(|| type_error($expected, value))
            }
        }
    };
}

numeric_codec!(u8, as_u64, "u8");
numeric_codec!(u16, as_u64, "u16");
numeric_codec!(u32, as_u64, "u32");
numeric_codec!(u64, as_u64, "u64");
numeric_codec!(i64, as_i64, "i64");

impl FieldCodec for f64 {
    fn encode(&self, _opts: &SerializeOptions) -> Value {
        Value::from(*self)
    }
    fn decode(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| type_error("f64", value))
    }
}

impl<T: FieldCodec> FieldCodec for Option<T> {
    fn encode(&self, opts: &SerializeOptions) -> Value {
        match self {
            Some(inner) => inner.encode(opts),
            None => Value::Null,
        }
    }
    fn decode(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(T::decode(value)?))
        }
    }
}

impl<T: FieldCodec> FieldCodec for Vec<T> {
    fn encode(&self, opts: &SerializeOptions) -> Value {
        Value::Array(self.iter().map(|item| item.encode(opts)).collect())
    }
    fn decode(value: &Value) -> Result<Self> {
        value
            .as_array()
            .ok_or_else(|| type_error("array", value))?
            .iter()
            .map(T::decode)
            .collect()
    }
}

impl FieldCodec for CellValue {
    fn encode(&self, _opts: &SerializeOptions) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Str(s) => Value::String(s.clone()),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => Value::from(*f),
            CellValue::Bool(b) => Value::Bool(*b),
        }
    }
    fn decode(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(CellValue::Empty),
            Value::String(s) => Ok(CellValue::Str(s.clone())),
            Value::Bool(b) => Ok(CellValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(CellValue::Int(i))
                } else {
                    n.as_f64()
                        .map(CellValue::Float)
                        .ok_or_else(|| type_error("number", value))
                }
            }
            _ => Err(type_error("cell value", value)),
        }
    }
}

// --- tagged records ---------------------------------------------------------

/// Trait implemented by every record that serializes as a tagged object.
pub(crate) trait TaggedValue: Sized {
    const TAG: &'static str;
    fn to_tagged(&self, opts: &SerializeOptions) -> Value;
    fn from_tagged(value: &Value) -> Result<Self>;
}

fn tagged_object<'v>(value: &'v Value, tag: &str) -> Result<&'v Map<String, Value>> {
    let obj = value
        .as_object()
        .ok_or_else(|| DocsiftError::Serialization(format!("expected object for '{tag}'")))?;
    match obj.get("_type").and_then(Value::as_str) {
        Some(found) if found == tag => Ok(obj),
        Some(found) => Err(DocsiftError::Serialization(format!(
            "type tag mismatch: expected '{tag}', found '{found}'"
        ))),
        None => Err(DocsiftError::Serialization(format!("missing _type tag for '{tag}'"))),
    }
}

fn decode_field<T: FieldCodec>(obj: &Map<String, Value>, tag: &str, field: &str) -> Result<T> {
    let value = obj
        .get(field)
        .ok_or_else(|| DocsiftError::Serialization(format!("missing field '{field}' in '{tag}'")))?;
    T::decode(value).map_err(|e| DocsiftError::Serialization(format!("field '{tag}.{field}': {e}")))
}

macro_rules! tagged {
    ($ty:ident, [$($field:ident),* $(,)?]) => {
        impl TaggedValue for $ty {
            const TAG: &'static str = stringify!($ty);

            fn to_tagged(&self, opts: &SerializeOptions) -> Value {
                let mut map = Map::new();
                map.insert("_type".to_string(), Value::String(Self::TAG.to_string()));
                $(
                    map.insert(stringify!($field).to_string(), FieldCodec::encode(&self.$field, opts));
                )*
                Value::Object(map)
            }

            fn from_tagged(value: &Value) -> Result<Self> {
                let obj = tagged_object(value, Self::TAG)?;
                Ok(Self {
                    $(
                        $field: decode_field(obj, Self::TAG, stringify!($field))?,
                    )*
                })
            }
        }

        impl FieldCodec for $ty {
            fn encode(&self, opts: &SerializeOptions) -> Value {
                self.to_tagged(opts)
            }
            fn decode(value: &Value) -> Result<Self> {
                Self::from_tagged(value)
            }
        }
    };
}

// Image records carry the only binary payload and honor `include_binary`
// by hand.
impl TaggedValue for ImageRecord {
    const TAG: &'static str = "ImageRecord";

    fn to_tagged(&self, opts: &SerializeOptions) -> Value {
        let mut map = Map::new();
        map.insert("_type".to_string(), Value::String(Self::TAG.to_string()));
        map.insert("image_index".to_string(), self.image_index.encode(opts));
        map.insert("unit_index".to_string(), self.unit_index.encode(opts));
        map.insert("name".to_string(), self.name.encode(opts));
        map.insert("content_type".to_string(), self.content_type.encode(opts));
        map.insert("size_bytes".to_string(), self.size_bytes.encode(opts));
        map.insert("width".to_string(), self.width.encode(opts));
        map.insert("height".to_string(), self.height.encode(opts));
        map.insert("caption".to_string(), self.caption.encode(opts));
        map.insert("description".to_string(), self.description.encode(opts));
        let data = match (&self.data, opts.include_binary) {
            (Some(bytes), true) => {
                let mut wrapper = Map::new();
                wrapper.insert("_bytes".to_string(), Value::String(BASE64.encode(bytes)));
                Value::Object(wrapper)
            }
            _ => Value::Null,
        };
        map.insert("data".to_string(), data);
        map.insert("error".to_string(), self.error.encode(opts));
        map.insert("color_space".to_string(), self.color_space.encode(opts));
        map.insert("bits_per_component".to_string(), self.bits_per_component.encode(opts));
        map.insert("filter".to_string(), self.filter.encode(opts));
        Value::Object(map)
    }

    fn from_tagged(value: &Value) -> Result<Self> {
        let obj = tagged_object(value, Self::TAG)?;
        let data = match obj.get("data") {
            None | Some(Value::Null) => None,
            Some(wrapper) => {
                let encoded = wrapper
                    .get("_bytes")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DocsiftError::Serialization("image data must be a _bytes object".to_string()))?;
                Some(
                    BASE64
                        .decode(encoded)
                        .map_err(|e| DocsiftError::Serialization(format!("invalid base64 payload: {e}")))?,
                )
            }
        };
        Ok(ImageRecord {
            image_index: decode_field(obj, Self::TAG, "image_index")?,
            unit_index: decode_field(obj, Self::TAG, "unit_index")?,
            name: decode_field(obj, Self::TAG, "name")?,
            content_type: decode_field(obj, Self::TAG, "content_type")?,
            size_bytes: decode_field(obj, Self::TAG, "size_bytes")?,
            width: decode_field(obj, Self::TAG, "width")?,
            height: decode_field(obj, Self::TAG, "height")?,
            caption: decode_field(obj, Self::TAG, "caption")?,
            description: decode_field(obj, Self::TAG, "description")?,
            data,
            error: decode_field(obj, Self::TAG, "error")?,
            color_space: decode_field(obj, Self::TAG, "color_space")?,
            bits_per_component: decode_field(obj, Self::TAG, "bits_per_component")?,
            filter: decode_field(obj, Self::TAG, "filter")?,
        })
    }
}

impl FieldCodec for ImageRecord {
    fn encode(&self, opts: &SerializeOptions) -> Value {
        self.to_tagged(opts)
    }
    fn decode(value: &Value) -> Result<Self> {
        Self::from_tagged(value)
    }
}

tagged!(FileMetadata, [filename, file_extension, file_path, folder_path, detected_encoding]);
tagged!(Table, [rows]);
tagged!(HeaderFooter, [kind, text]);
tagged!(Hyperlink, [text, url]);
tagged!(Bookmark, [name, text]);
tagged!(Note, [id, text]);
tagged!(Comment, [id, author, date, text]);
tagged!(Formula, [latex, is_display]);
tagged!(Section, [
    page_width_inches,
    page_height_inches,
    left_margin_inches,
    right_margin_inches,
    top_margin_inches,
    bottom_margin_inches,
    orientation,
]);

tagged!(DocMetadata, [
    file, title, author, subject, keywords, last_saved_by, create_time, last_saved_time, num_pages, num_words,
    num_chars,
]);
tagged!(DocContent, [metadata, main_text, footnotes, headers_footers, annotations]);

tagged!(DocxMetadata, [
    file, title, author, subject, keywords, category, comments, created, modified, last_modified_by, revision,
]);
tagged!(DocxRun, [text, bold, italic, underline, font_name, font_size, font_color]);
tagged!(DocxParagraph, [text, style, alignment, runs]);
tagged!(DocxContent, [
    metadata,
    paragraphs,
    tables,
    headers,
    footers,
    images,
    hyperlinks,
    footnotes,
    endnotes,
    comments,
    sections,
    styles,
    formulas,
    full_text,
    base_full_text,
]);

tagged!(Sheet, [name, headers, rows, text]);
tagged!(XlsMetadata, [file, title, author, subject, company, last_saved_by, created, modified]);
tagged!(XlsContent, [metadata, sheets, images, full_text]);
tagged!(XlsxMetadata, [
    file, title, description, creator, last_modified_by, created, modified, keywords, language, revision,
]);
tagged!(XlsxContent, [metadata, sheets, images]);

tagged!(PptMetadata, [
    file,
    title,
    subject,
    author,
    keywords,
    comments,
    last_saved_by,
    created,
    modified,
    revision_number,
    category,
    company,
    manager,
    creating_application,
    num_slides,
    num_notes,
    num_hidden_slides,
]);
tagged!(PptTextBlock, [text, text_type]);
tagged!(PptSlide, [slide_number, title, body_text, other_text, notes, all_text]);
tagged!(PptContent, [metadata, slides, master_text, all_text]);

tagged!(PptxMetadata, [
    file, title, subject, author, last_modified_by, created, modified, keywords, comments, category, revision,
]);
tagged!(PptxSlide, [
    slide_number,
    title,
    footer,
    content_placeholders,
    other_textboxes,
    formulas,
    comments,
    text,
    base_text,
]);
tagged!(PptxContent, [metadata, slides, images]);

tagged!(RtfFont, [font_id, font_family, font_name, charset, pitch]);
tagged!(RtfColor, [index, red, green, blue]);
tagged!(RtfStyle, [style_id, style_type, style_name, based_on, next_style]);
tagged!(RtfMetadata, [
    file,
    title,
    subject,
    author,
    keywords,
    comments,
    operator,
    category,
    manager,
    company,
    doc_comment,
    version,
    revision,
    created,
    modified,
    num_pages,
    num_words,
    num_chars,
    num_chars_with_spaces,
]);
tagged!(RtfParagraph, [text]);
tagged!(RtfField, [field_type, field_instruction, field_result]);
tagged!(RtfPage, [number, text]);
tagged!(RtfContent, [
    metadata,
    fonts,
    colors,
    styles,
    paragraphs,
    headers,
    footers,
    hyperlinks,
    bookmarks,
    fields,
    images,
    footnotes,
    annotations,
    pages,
    full_text,
]);

tagged!(OdfMetadata, [
    file,
    title,
    creator,
    subject,
    description,
    date,
    language,
    keywords,
    initial_creator,
    creation_date,
    editing_cycles,
    editing_duration,
    generator,
]);
tagged!(OdtParagraph, [text, style, outline_level]);
tagged!(OdtContent, [
    metadata, paragraphs, tables, hyperlinks, footnotes, endnotes, comments, bookmarks, headers, footers, styles,
    images, text,
]);
tagged!(OdpSlide, [slide_number, name, title, content, notes, tables, text]);
tagged!(OdpContent, [metadata, slides, images]);
tagged!(OdsContent, [metadata, sheets, images]);

tagged!(PdfMetadata, [file, total_pages]);
tagged!(PdfPage, [number, text]);
tagged!(PdfContent, [metadata, pages, images]);

tagged!(PlainTextContent, [content, metadata]);

tagged!(HtmlMetadata, [file, title, language, charset, description, keywords, author]);
tagged!(HtmlHeading, [level, text]);
tagged!(HtmlLink, [text, href]);
tagged!(HtmlContent, [metadata, text, headings, links, tables]);

tagged!(EpubMetadata, [
    file, title, creator, subject, description, publisher, date, language, identifier, rights,
]);
tagged!(EpubChapter, [number, title, text]);
tagged!(EpubContent, [metadata, chapters, images]);

tagged!(EmailAddress, [name, address]);
tagged!(EmailMetadata, [file, date, message_id]);
tagged!(EmailContent, [
    from_email, subject, in_reply_to, reply_to, to_emails, to_cc, to_bcc, body_plain, body_html, metadata,
]);
