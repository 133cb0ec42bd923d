//! Typed cell payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::correctness::Correctness;
use crate::field::FieldDataType;

/// One member of an enumerated domain (trading state, distribution method).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub id: u32,
    pub display: String,
}

impl EnumValue {
    pub fn new(id: u32, display: impl Into<String>) -> Self {
        Self {
            id,
            display: display.into(),
        }
    }
}

/// Cell content. `None` means the entity has no value for the field yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ValueContent {
    Number(Option<f64>),
    Integer(Option<i64>),
    Text(Option<String>),
    Enumeration(Option<EnumValue>),
    Date(Option<NaiveDate>),
    Boolean(Option<bool>),
}

impl ValueContent {
    /// Content with no value for the given type.
    pub fn empty(data_type: FieldDataType) -> Self {
        match data_type {
            FieldDataType::Number => ValueContent::Number(None),
            FieldDataType::Integer => ValueContent::Integer(None),
            FieldDataType::Text => ValueContent::Text(None),
            FieldDataType::Enumeration => ValueContent::Enumeration(None),
            FieldDataType::Date => ValueContent::Date(None),
            FieldDataType::Boolean => ValueContent::Boolean(None),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        ValueContent::Text(Some(value.into()))
    }

    pub fn data_type(&self) -> FieldDataType {
        match self {
            ValueContent::Number(_) => FieldDataType::Number,
            ValueContent::Integer(_) => FieldDataType::Integer,
            ValueContent::Text(_) => FieldDataType::Text,
            ValueContent::Enumeration(_) => FieldDataType::Enumeration,
            ValueContent::Date(_) => FieldDataType::Date,
            ValueContent::Boolean(_) => FieldDataType::Boolean,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ValueContent::Number(v) => v.is_none(),
            ValueContent::Integer(v) => v.is_none(),
            ValueContent::Text(v) => v.is_none(),
            ValueContent::Enumeration(v) => v.is_none(),
            ValueContent::Date(v) => v.is_none(),
            ValueContent::Boolean(v) => v.is_none(),
        }
    }

    /// Plain text rendering; empty content renders as an empty string.
    pub fn display(&self) -> String {
        match self {
            ValueContent::Number(Some(v)) => format!("{v}"),
            ValueContent::Integer(Some(v)) => v.to_string(),
            ValueContent::Text(Some(v)) => v.clone(),
            ValueContent::Enumeration(Some(v)) => v.display.clone(),
            ValueContent::Date(Some(v)) => v.format("%Y-%m-%d").to_string(),
            ValueContent::Boolean(Some(v)) => if *v { "Yes" } else { "No" }.to_string(),
            _ => String::new(),
        }
    }
}

/// Render hints attached to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RenderAttribute {
    /// The entity that produced the value was not fully correct.
    Correctness(Correctness),
}

/// A renderable cell: content plus render attributes.
///
/// Values are replaced wholesale whenever a field is recomputed, so holders
/// can compare old and new instances directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    content: ValueContent,
    attributes: Vec<RenderAttribute>,
}

impl Value {
    pub fn new(content: ValueContent) -> Self {
        Self {
            content,
            attributes: Vec::new(),
        }
    }

    /// Stamp the producing entity's correctness. Good correctness adds nothing.
    #[must_use]
    pub fn with_correctness(mut self, correctness: Correctness) -> Self {
        if !correctness.is_good() {
            self.attributes
                .push(RenderAttribute::Correctness(correctness));
        }
        self
    }

    pub fn content(&self) -> &ValueContent {
        &self.content
    }

    pub fn data_type(&self) -> FieldDataType {
        self.content.data_type()
    }

    pub fn attributes(&self) -> &[RenderAttribute] {
        &self.attributes
    }

    /// Correctness stamped on the value, `Good` when none was.
    pub fn correctness(&self) -> Correctness {
        self.attributes
            .iter()
            .map(|attribute| match attribute {
                RenderAttribute::Correctness(correctness) => *correctness,
            })
            .next()
            .unwrap_or(Correctness::Good)
    }

    pub fn display(&self) -> String {
        self.content.display()
    }
}
