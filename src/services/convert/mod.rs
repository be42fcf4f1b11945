//! Conversion executors.
//!
//! Every operation takes the received files as bytes plus the optional
//! `password`/`pages` form fields and produces exactly one output document.
//! Executors are synchronous and CPU bound; callers run them on the blocking
//! pool.

mod image_pdf;
mod ooxml;
pub mod page_range;
mod pdf_tools;
mod pptx;
mod sheet_pdf;
mod text;

use thiserror::Error;

pub use ooxml::write_xlsx;

/// The twelve operations exposed under `/api/pdf/{operation}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Merge,
    Split,
    Compress,
    ImageToPdf,
    Protect,
    Unlock,
    PdfToWord,
    PdfToExcel,
    ExcelToPdf,
    PdfToPpt,
    PdfToJpg,
    EditPdf,
}

/// How many files an operation accepts under its field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Merge,
        Operation::Split,
        Operation::Compress,
        Operation::ImageToPdf,
        Operation::Protect,
        Operation::Unlock,
        Operation::PdfToWord,
        Operation::PdfToExcel,
        Operation::ExcelToPdf,
        Operation::PdfToPpt,
        Operation::PdfToJpg,
        Operation::EditPdf,
    ];

    /// Resolve the URL path segment.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.slug() == slug)
    }

    pub fn slug(self) -> &'static str {
        match self {
            Operation::Merge => "merge",
            Operation::Split => "split",
            Operation::Compress => "compress",
            Operation::ImageToPdf => "image-to-pdf",
            Operation::Protect => "protect",
            Operation::Unlock => "unlock",
            Operation::PdfToWord => "pdf-to-word",
            Operation::PdfToExcel => "pdf-to-excel",
            Operation::ExcelToPdf => "excel-to-pdf",
            Operation::PdfToPpt => "pdf-to-ppt",
            Operation::PdfToJpg => "pdf-to-jpg",
            Operation::EditPdf => "edit-pdf",
        }
    }

    /// Multipart field the files must arrive under.
    pub fn field_name(self) -> &'static str {
        match self {
            Operation::Merge => "pdfs",
            Operation::ImageToPdf => "images",
            Operation::ExcelToPdf => "file",
            _ => "pdf",
        }
    }

    pub fn cardinality(self) -> Cardinality {
        match self {
            Operation::Merge | Operation::ImageToPdf => Cardinality::Multiple,
            _ => Cardinality::Single,
        }
    }

    /// Name recorded in the usage log.
    pub fn tool_name(self) -> &'static str {
        match self {
            Operation::Merge => "Merge PDF",
            Operation::Split => "Split PDF",
            Operation::Compress => "Compress PDF",
            Operation::ImageToPdf => "Image to PDF",
            Operation::Protect => "Protect PDF",
            Operation::Unlock => "Unlock PDF",
            Operation::PdfToWord => "PDF to Word",
            Operation::PdfToExcel => "PDF to Excel",
            Operation::ExcelToPdf => "Excel to PDF",
            Operation::PdfToPpt => "PDF to PowerPoint",
            Operation::PdfToJpg => "PDF to JPG",
            Operation::EditPdf => "Edit PDF",
        }
    }

    /// Leading part of the artifact file name.
    pub fn artifact_prefix(self) -> &'static str {
        match self {
            Operation::Merge => "merged",
            Operation::Split => "split",
            Operation::Compress => "compressed",
            Operation::ImageToPdf => "images-to-pdf",
            Operation::Protect => "protected",
            Operation::Unlock => "unlocked",
            _ => "converted",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Operation::PdfToWord => "docx",
            Operation::PdfToExcel => "xlsx",
            Operation::PdfToPpt => "pptx",
            Operation::PdfToJpg => "zip",
            _ => "pdf",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Operation::Merge => "PDFs merged successfully",
            Operation::Split => "PDF split successfully",
            Operation::Compress => "PDF compressed successfully",
            Operation::ImageToPdf => "Images converted to PDF successfully",
            Operation::Protect => "PDF protected successfully",
            Operation::Unlock => "PDF unlocked successfully",
            Operation::PdfToWord => "PDF converted to Word successfully",
            Operation::PdfToExcel => "PDF converted to Excel successfully",
            Operation::ExcelToPdf => "Excel converted to PDF successfully",
            Operation::PdfToPpt => "PDF converted to PowerPoint successfully (Text Only)",
            Operation::PdfToJpg => "PDF to JPG successful (Simulation)",
            Operation::EditPdf => "Edit PDF successful (Simulation)",
        }
    }

    /// Message when no file arrived at all.
    fn missing_file_message(self) -> &'static str {
        match self {
            Operation::Merge => "At least 2 PDF files are required",
            Operation::ImageToPdf => "At least 1 image file is required",
            Operation::Protect | Operation::Unlock => "PDF file and password are required",
            Operation::Split | Operation::Compress => "PDF file is required",
            _ => "File is required",
        }
    }
}

/// One received file, read into memory for the executor.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Optional non-file form fields.
#[derive(Clone, Debug, Default)]
pub struct OperationParams {
    pub password: Option<String>,
    pub pages: Option<String>,
}

/// What an executor hands back: the artifact bytes and, occasionally, a
/// message replacing the operation's default one.
#[derive(Debug)]
pub struct ExecutorOutput {
    pub bytes: Vec<u8>,
    pub message: Option<String>,
}

impl ExecutorOutput {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            message: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Caller-side problem, reported verbatim with a 400.
    #[error("{0}")]
    InvalidInput(String),
    #[error("incorrect password or failed to unlock: {0}")]
    IncorrectPassword(String),
    #[error("invalid or corrupted PDF structure: {0}")]
    CorruptPdf(String),
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Validate the inputs required by `op` and run its executor.
pub fn execute(
    op: Operation,
    inputs: &[InputFile],
    params: &OperationParams,
) -> ConvertResult<ExecutorOutput> {
    if inputs.is_empty() {
        return Err(ConvertError::InvalidInput(
            op.missing_file_message().into(),
        ));
    }
    let first = &inputs[0];

    match op {
        Operation::Merge => {
            if inputs.len() < 2 {
                return Err(ConvertError::InvalidInput(
                    op.missing_file_message().into(),
                ));
            }
            let sources: Vec<&[u8]> = inputs.iter().map(|f| f.bytes.as_slice()).collect();
            pdf_tools::merge(&sources).map(ExecutorOutput::new)
        }
        Operation::Split => {
            pdf_tools::split(&first.bytes, params.pages.as_deref()).map(ExecutorOutput::new)
        }
        Operation::Compress => pdf_tools::resave(&first.bytes).map(ExecutorOutput::new),
        Operation::ImageToPdf => image_pdf::images_to_pdf(inputs).map(ExecutorOutput::new),
        Operation::Protect => {
            let password = required_password(op, params)?;
            pdf_tools::protect(&first.bytes, password).map(ExecutorOutput::new)
        }
        Operation::Unlock => {
            let password = required_password(op, params)?;
            pdf_tools::unlock(&first.bytes, password).map(ExecutorOutput::new)
        }
        Operation::PdfToWord => {
            let extracted = text::extract_text(&first.bytes)?;
            let lines = text::non_blank_lines(&extracted);
            ooxml::write_docx(&lines).map(ExecutorOutput::new)
        }
        Operation::PdfToExcel => pdf_to_excel(first),
        Operation::ExcelToPdf => sheet_pdf::first_sheet_to_pdf(&first.bytes).map(ExecutorOutput::new),
        Operation::PdfToPpt => {
            let extracted = text::extract_text(&first.bytes)?;
            let generated_on = chrono::Utc::now().format("%Y-%m-%d").to_string();
            pptx::write_text_deck(&extracted, &generated_on).map(ExecutorOutput::new)
        }
        // Simulated conversions: the artifact is the input, byte for byte.
        Operation::PdfToJpg | Operation::EditPdf => Ok(ExecutorOutput::new(first.bytes.clone())),
    }
}

fn required_password(op: Operation, params: &OperationParams) -> ConvertResult<&str> {
    params
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ConvertError::InvalidInput(op.missing_file_message().into()))
}

const NO_TEXT_NOTICE: &str =
    "No text could be extracted from this PDF. It might be scanned or image-based.";

fn pdf_to_excel(input: &InputFile) -> ConvertResult<ExecutorOutput> {
    if input.bytes.is_empty() {
        return Err(ConvertError::InvalidInput("File is empty".into()));
    }
    let extracted = text::extract_text(&input.bytes).map_err(|err| match err {
        ConvertError::Extraction(detail) => ConvertError::CorruptPdf(detail),
        other => other,
    })?;

    if extracted.trim().is_empty() {
        let rows = vec![vec!["Message".to_string()], vec![NO_TEXT_NOTICE.to_string()]];
        let bytes = ooxml::write_xlsx("Sheet1", &rows)?;
        return Ok(ExecutorOutput {
            bytes,
            message: Some("PDF processed (No text found - Scanned PDF?)".into()),
        });
    }

    let mut rows = vec![vec!["Content".to_string()]];
    rows.extend(
        text::non_blank_lines(&extracted)
            .into_iter()
            .map(|line| vec![line.to_string()]),
    );
    ooxml::write_xlsx("Sheet1", &rows).map(ExecutorOutput::new)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn slugs_round_trip_and_fields_match_routes() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_slug(op.slug()), Some(op));
        }
        assert_eq!(Operation::from_slug("rotate"), None);
        assert_eq!(Operation::Merge.field_name(), "pdfs");
        assert_eq!(Operation::ImageToPdf.field_name(), "images");
        assert_eq!(Operation::ExcelToPdf.field_name(), "file");
        assert_eq!(Operation::Unlock.field_name(), "pdf");
        assert_eq!(Operation::PdfToJpg.extension(), "zip");
    }

    #[test]
    fn merge_rejects_a_single_file() {
        let inputs = vec![input("a.pdf", "application/pdf", text_pdf(2))];
        let err = execute(Operation::Merge, &inputs, &OperationParams::default()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(msg) if msg.contains("At least 2")));
    }

    #[test]
    fn protect_requires_password() {
        let inputs = vec![input("a.pdf", "application/pdf", text_pdf(1))];
        let params = OperationParams {
            password: Some(String::new()),
            pages: None,
        };
        let err = execute(Operation::Protect, &inputs, &params).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));
    }

    #[test]
    fn simulated_conversions_copy_input() {
        let bytes = b"%PDF-1.4 not really".to_vec();
        let inputs = vec![input("a.pdf", "application/pdf", bytes.clone())];
        for op in [Operation::PdfToJpg, Operation::EditPdf] {
            let out = execute(op, &inputs, &OperationParams::default()).unwrap();
            assert_eq!(out.bytes, bytes);
            assert!(out.message.is_none());
        }
    }

    #[test]
    fn pdf_to_excel_rejects_empty_file() {
        let inputs = vec![input("a.pdf", "application/pdf", Vec::new())];
        let err = execute(Operation::PdfToExcel, &inputs, &OperationParams::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(msg) if msg == "File is empty"));
    }

    #[test]
    fn pdf_to_excel_flags_garbage_as_corrupt() {
        let inputs = vec![input("a.pdf", "application/pdf", b"definitely not a pdf".to_vec())];
        let err = execute(Operation::PdfToExcel, &inputs, &OperationParams::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::CorruptPdf(_)));
    }

    #[test]
    fn pdf_to_excel_writes_content_rows() {
        let inputs = vec![input("a.pdf", "application/pdf", text_pdf(2))];
        let out = execute(Operation::PdfToExcel, &inputs, &OperationParams::default()).unwrap();
        assert!(out.message.is_none());

        let rows = ooxml::tests::read_first_sheet(&out.bytes);
        assert_eq!(rows[0], vec!["Content".to_string()]);
        let body: Vec<String> = rows[1..].iter().map(|r| r[0].trim().to_string()).collect();
        assert!(body.contains(&"Page 1".to_string()));
        assert!(body.contains(&"Page 2".to_string()));
    }

    #[test]
    fn pdf_to_excel_without_text_writes_placeholder() {
        // A page with no content stream yields no text.
        let inputs = vec![input(
            "blank.pdf",
            "application/pdf",
            pdf_with_page_texts(&[String::new()]),
        )];
        let out = execute(Operation::PdfToExcel, &inputs, &OperationParams::default()).unwrap();
        assert_eq!(
            out.message.as_deref(),
            Some("PDF processed (No text found - Scanned PDF?)")
        );
        let rows = ooxml::tests::read_first_sheet(&out.bytes);
        assert_eq!(rows[0], vec!["Message".to_string()]);
        assert_eq!(rows[1], vec![NO_TEXT_NOTICE.to_string()]);
    }
}
