//! Grid layout definitions: column order, width and visibility.
//!
//! A layout is a plain value, independent of any record source, so it can be
//! saved, restored and copied freely. Cloning is deep: an editor can work on
//! a copy while the live grid keeps the original until the edit is confirmed.
//!
//! Persisted as JSON:
//!
//! ```json
//! {"columns": [{"fieldName": "Symbol_Code", "width": 80, "visible": true}]}
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutColumn {
    pub field_name: String,
    /// Width in pixels; `None` lets the renderer size the column.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl LayoutColumn {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            width: None,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A layout column matched to a field of a live record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Logical field index within the record source's field array.
    pub field_index: usize,
    pub field_name: String,
    pub width: Option<u32>,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayoutDefinition {
    #[serde(default)]
    columns: Vec<LayoutColumn>,
}

impl GridLayoutDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<LayoutColumn>) -> Self {
        Self { columns }
    }

    pub fn from_field_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_columns(names.into_iter().map(LayoutColumn::new).collect())
    }

    pub fn columns(&self) -> &[LayoutColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|column| column.field_name.as_str())
            .collect()
    }

    pub fn column(&self, field_name: &str) -> Option<&LayoutColumn> {
        self.columns
            .iter()
            .find(|column| column.field_name == field_name)
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.column(field_name).is_some()
    }

    /// Append a visible column; returns false if the field is already listed.
    pub fn add_column(&mut self, column: LayoutColumn) -> bool {
        if self.contains(&column.field_name) {
            return false;
        }
        self.columns.push(column);
        true
    }

    pub fn remove_column(&mut self, field_name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|column| column.field_name != field_name);
        self.columns.len() != before
    }

    pub fn set_width(&mut self, field_name: &str, width: Option<u32>) -> bool {
        match self.column_mut(field_name) {
            Some(column) => {
                column.width = width;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, field_name: &str, visible: bool) -> bool {
        match self.column_mut(field_name) {
            Some(column) => {
                column.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Move the column at `from` so it ends up at position `to`.
    ///
    /// # Panics
    ///
    /// Panics if either position is out of range.
    pub fn move_column(&mut self, from: usize, to: usize) {
        assert!(
            from < self.columns.len() && to < self.columns.len(),
            "move {from} -> {to} out of range for {} columns",
            self.columns.len()
        );
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
    }

    /// Drop columns whose field is not known; returns the dropped names.
    pub fn retain_known<P>(&mut self, is_known: P) -> Vec<String>
    where
        P: Fn(&str) -> bool,
    {
        let mut dropped = Vec::new();
        self.columns.retain(|column| {
            let keep = is_known(&column.field_name);
            if !keep {
                warn!(field = %column.field_name, "dropping unknown layout column");
                dropped.push(column.field_name.clone());
            }
            keep
        });
        dropped
    }

    /// Match columns to a live field array given as ordered field names.
    /// Columns naming fields that are not present are skipped.
    pub fn resolve<S: AsRef<str>>(&self, field_names: &[S]) -> Vec<ResolvedColumn> {
        self.columns
            .iter()
            .filter_map(|column| {
                let field_index = field_names
                    .iter()
                    .position(|name| name.as_ref() == column.field_name)?;
                Some(ResolvedColumn {
                    field_index,
                    field_name: column.field_name.clone(),
                    width: column.width,
                    visible: column.visible,
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse `text`, falling back to `fallback()` when it is malformed.
    pub fn from_json_or<F>(text: &str, fallback: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match Self::from_json(text) {
            Ok(layout) => layout,
            Err(error) => {
                warn!(%error, "malformed layout definition, using default");
                fallback()
            }
        }
    }

    fn column_mut(&mut self, field_name: &str) -> Option<&mut LayoutColumn> {
        self.columns
            .iter_mut()
            .find(|column| column.field_name == field_name)
    }
}
