use crate::types::SchemaType;

/// One named type pulled out of a monolithic schema by the splitter.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExtractedType {
    pub qualified_name: String,
    pub subject: String,
    pub body: String,
    pub schema_type: SchemaType,
    pub size: usize,
    pub references: Vec<String>,
    pub is_root: bool,
    pub order: usize,
}

/// Output of a split: extracted types already placed in registration order.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SplitResult {
    pub types: Vec<ExtractedType>,
}

impl SplitResult {
    pub fn root(&self) -> Option<&ExtractedType> {
        self.types.iter().find(|t| t.is_root)
    }
}
