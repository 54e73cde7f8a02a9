use crate::domain::entities::batch::ExtractedBatch;

/// One uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub name: String,
    pub payload: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// The document-extraction service. `Err` carries the service's detail
/// message verbatim.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &SourceDocument) -> Result<ExtractedBatch, String>;
}

impl<F> Extractor for F
where
    F: Fn(&SourceDocument) -> Result<ExtractedBatch, String> + Send + Sync,
{
    fn extract(&self, document: &SourceDocument) -> Result<ExtractedBatch, String> {
        self(document)
    }
}
