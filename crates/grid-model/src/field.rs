//! Column schema: data types, alignment and the immutable [`Field`] descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::sources::FieldSourceTypeId;
use crate::value::{Value, ValueContent};

/// Data type carried by every value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldDataType {
    /// Decimal quantities (prices, scores).
    Number,
    /// Whole quantities (volumes, counts, ranks).
    Integer,
    Text,
    /// A value drawn from a closed set, rendered by its display text.
    Enumeration,
    Date,
    Boolean,
}

impl FieldDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldDataType::Number => "Number",
            FieldDataType::Integer => "Integer",
            FieldDataType::Text => "Text",
            FieldDataType::Enumeration => "Enumeration",
            FieldDataType::Date => "Date",
            FieldDataType::Boolean => "Boolean",
        }
    }

    /// Returns true for types whose cells are conventionally right aligned.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldDataType::Number | FieldDataType::Integer)
    }

    /// Default alignment for a column of this type.
    pub fn default_align(&self) -> TextAlign {
        if self.is_numeric() {
            TextAlign::Right
        } else {
            TextAlign::Left
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldDataType {
    type Err = ModelError;

    /// Parse a data type name (case-insensitive, short forms accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        match normalized.as_str() {
            "NUMBER" | "NUM" | "DECIMAL" => Ok(FieldDataType::Number),
            "INTEGER" | "INT" => Ok(FieldDataType::Integer),
            "TEXT" | "STRING" | "CHAR" => Ok(FieldDataType::Text),
            "ENUMERATION" | "ENUM" => Ok(FieldDataType::Enumeration),
            "DATE" => Ok(FieldDataType::Date),
            "BOOLEAN" | "BOOL" => Ok(FieldDataType::Boolean),
            _ => Err(ModelError::UnknownDataType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Right,
    Center,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Right => "right",
            TextAlign::Center => "center",
        }
    }
}

impl fmt::Display for TextAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column's schema within a field source definition.
///
/// Fields are created once when their definition is built and never change
/// afterwards. `name` is qualified by the source (`Security_Last`) so it is
/// unique across every field source and can be persisted in layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    heading: String,
    data_type: FieldDataType,
    align: TextAlign,
    source: FieldSourceTypeId,
    index: usize,
}

impl Field {
    pub(crate) fn new(
        name: String,
        heading: &str,
        data_type: FieldDataType,
        align: TextAlign,
        source: FieldSourceTypeId,
        index: usize,
    ) -> Self {
        Self {
            name,
            heading: heading.to_string(),
            data_type,
            align,
            source,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn data_type(&self) -> FieldDataType {
        self.data_type
    }

    pub fn align(&self) -> TextAlign {
        self.align
    }

    /// Field source type that declares this field.
    pub fn source(&self) -> FieldSourceTypeId {
        self.source
    }

    /// Dense index of the field within its definition.
    pub fn index(&self) -> usize {
        self.index
    }

    /// A value holder with no content yet.
    pub fn empty_value(&self) -> Value {
        Value::new(ValueContent::empty(self.data_type))
    }

    /// Wrap `content` as a value of this field.
    ///
    /// # Panics
    ///
    /// Panics if the content's type differs from the field's declared type.
    pub fn new_value(&self, content: ValueContent) -> Value {
        assert_eq!(
            content.data_type(),
            self.data_type,
            "field {} holds {} values",
            self.name,
            self.data_type
        );
        Value::new(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_str() {
        assert_eq!(
            "number".parse::<FieldDataType>().unwrap(),
            FieldDataType::Number
        );
        assert_eq!("ENUM".parse::<FieldDataType>().unwrap(), FieldDataType::Enumeration);
        assert_eq!(" bool ".parse::<FieldDataType>().unwrap(), FieldDataType::Boolean);
        assert!("colour".parse::<FieldDataType>().is_err());
    }

    #[test]
    fn test_default_align() {
        assert_eq!(FieldDataType::Integer.default_align(), TextAlign::Right);
        assert_eq!(FieldDataType::Date.default_align(), TextAlign::Left);
    }

    #[test]
    #[should_panic(expected = "holds Number values")]
    fn new_value_rejects_wrong_type() {
        let field = Field::new(
            "Security_Last".to_string(),
            "Last",
            FieldDataType::Number,
            TextAlign::Right,
            FieldSourceTypeId::Security,
            0,
        );
        field.new_value(ValueContent::Text(Some("1.0".to_string())));
    }
}
