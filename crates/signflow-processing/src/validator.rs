use signflow_core::AppError;
use std::path::Path;

const PDF_EXTENSION: &str = "pdf";
const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Validation errors for uploaded PDF files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {0} (only PDF files are accepted)")]
    InvalidExtension(String),

    #[error("Invalid content type: {0} (only PDF files are accepted)")]
    InvalidContentType(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("File does not look like a PDF")]
    NotPdf,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

/// Upload validator for PDF documents
#[derive(Debug, Clone)]
pub struct PdfValidator {
    max_file_size: usize,
}

impl PdfValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if extension != PDF_EXTENSION {
            return Err(ValidationError::InvalidExtension(extension));
        }

        Ok(())
    }

    /// Parameters such as `; charset=binary` are ignored.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if essence != PDF_CONTENT_TYPE {
            return Err(ValidationError::InvalidContentType(content_type.to_string()));
        }

        Ok(())
    }

    /// Check the `%PDF-` header so renamed files are refused before reaching lopdf.
    pub fn validate_magic(&self, data: &[u8]) -> Result<(), ValidationError> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(ValidationError::NotPdf);
        }
        Ok(())
    }

    /// Validate all aspects of an uploaded file
    pub fn validate(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_magic(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> PdfValidator {
        PdfValidator::new(1024)
    }

    #[test]
    fn test_validate_file_size() {
        let validator = test_validator();
        assert!(validator.validate_file_size(512).is_ok());
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            validator.validate_file_size(2048),
            Err(ValidationError::FileTooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn test_validate_extension() {
        let validator = test_validator();
        assert!(validator.validate_extension("contract.pdf").is_ok());
        assert!(validator.validate_extension("CONTRACT.PDF").is_ok());
        assert!(matches!(
            validator.validate_extension("contract.docx"),
            Err(ValidationError::InvalidExtension(_))
        ));
        assert!(matches!(
            validator.validate_extension("contract"),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_validate_content_type() {
        let validator = test_validator();
        assert!(validator.validate_content_type("application/pdf").is_ok());
        assert!(validator
            .validate_content_type("Application/PDF; charset=binary")
            .is_ok());
        assert!(validator.validate_content_type("image/png").is_err());
    }

    #[test]
    fn test_validate_rejects_renamed_file() {
        let validator = test_validator();
        let result = validator.validate("photo.pdf", "application/pdf", b"\x89PNG\r\n");
        assert!(matches!(result, Err(ValidationError::NotPdf)));
    }

    #[test]
    fn test_validate_all_ok() {
        let validator = test_validator();
        assert!(validator
            .validate("contract.pdf", "application/pdf", b"%PDF-1.7\n...")
            .is_ok());
    }

    #[test]
    fn test_error_mapping() {
        let too_large: AppError = ValidationError::FileTooLarge { size: 2, max: 1 }.into();
        assert!(matches!(too_large, AppError::PayloadTooLarge(_)));

        let empty: AppError = ValidationError::EmptyFile.into();
        assert!(matches!(empty, AppError::InvalidInput(_)));
    }
}
