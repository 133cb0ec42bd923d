//! Table rendering for the `gridbind` commands.

use std::rc::Rc;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{ASCII_MARKDOWN, UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use grid_model::{
    Badness, Correctness, Field, FieldSourceDefinition, FieldSourceDefinitionCache,
    FieldSourceTypeId, ResolvedColumn, TextAlign, Value,
};

use crate::simulation::{EventCounts, GridRow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    #[default]
    Rounded,
    /// Plain markdown, no colours.
    Markdown,
}

impl TableStyle {
    fn new_table(self) -> Table {
        let mut table = Table::new();
        match self {
            TableStyle::Rounded => {
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .apply_modifier(UTF8_ROUND_CORNERS)
                    .set_content_arrangement(ContentArrangement::Dynamic);
            }
            TableStyle::Markdown => {
                table.load_preset(ASCII_MARKDOWN).force_no_tty();
            }
        }
        table
    }

    fn header(self, labels: &[&str]) -> Vec<Cell> {
        labels
            .iter()
            .map(|label| match self {
                TableStyle::Rounded => header_cell(label),
                TableStyle::Markdown => Cell::new(label),
            })
            .collect()
    }
}

pub fn sources_table(cache: &FieldSourceDefinitionCache, style: TableStyle) -> Table {
    let mut table = style.new_table();
    table.set_header(style.header(&["Source", "Description", "Fields", "Hidden", "Validity"]));
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for &type_id in FieldSourceTypeId::ALL {
        let definition = cache.get(type_id);
        table.add_row(vec![
            Cell::new(type_id.name()),
            Cell::new(type_id.display()),
            Cell::new(definition.field_count()),
            count_cell(definition.unsupported_field_count()),
            Cell::new(validity_label(&definition)),
        ]);
    }
    table
}

/// The validity field's name, or "hidden" when it is tracked but not shown.
fn validity_label(definition: &FieldSourceDefinition) -> String {
    match definition.validity_ordinal() {
        None => "-".to_string(),
        Some(ordinal) => match definition.index_of_ordinal(ordinal) {
            Some(index) => definition.field(index).name().to_string(),
            None => "hidden".to_string(),
        },
    }
}

pub fn fields_table(definitions: &[Rc<FieldSourceDefinition>], style: TableStyle) -> Table {
    let mut table = style.new_table();
    table.set_header(style.header(&["Field", "Heading", "Type", "Align"]));
    for definition in definitions {
        for field in definition.fields() {
            table.add_row(vec![
                Cell::new(field.name()),
                Cell::new(field.heading()),
                Cell::new(field.data_type().as_str()),
                Cell::new(field.align().as_str()),
            ]);
        }
    }
    table
}

/// Resolved layout columns with the field each one binds to.
pub fn layout_table(
    columns: &[ResolvedColumn],
    fields: &[Field],
    default_width: u32,
    style: TableStyle,
) -> Table {
    let mut table = style.new_table();
    table.set_header(style.header(&["#", "Field", "Heading", "Type", "Width", "Visible"]));
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    for column in columns {
        let field = &fields[column.field_index];
        let width = match column.width {
            Some(width) => Cell::new(width),
            None => dim_cell(format!("{default_width}*")),
        };
        table.add_row(vec![
            Cell::new(column.field_index),
            Cell::new(&column.field_name),
            Cell::new(field.heading()),
            Cell::new(field.data_type().as_str()),
            width,
            Cell::new(if column.visible { "yes" } else { "no" }),
        ]);
    }
    table
}

/// The simulated grid, one line per record, columns in layout order.
pub fn grid_table(
    rows: &[GridRow],
    fields: &[Field],
    columns: &[ResolvedColumn],
    max_rows: usize,
    default_width: u32,
    style: TableStyle,
) -> Table {
    let mut table = style.new_table();
    if style == TableStyle::Rounded {
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .apply_modifier(UTF8_SOLID_INNER_BORDERS);
    }
    let headings: Vec<&str> = columns
        .iter()
        .map(|column| fields[column.field_index].heading())
        .collect();
    table.set_header(style.header(&headings));

    let mut constraints = Vec::with_capacity(columns.len());
    for (position, column) in columns.iter().enumerate() {
        let field = &fields[column.field_index];
        align_column(&mut table, position, cell_alignment(field.align()));
        let width = column.width.unwrap_or(default_width);
        constraints.push(ColumnConstraint::UpperBoundary(Width::Fixed(
            u16::try_from(width).unwrap_or(u16::MAX),
        )));
    }
    if style == TableStyle::Rounded {
        table.set_constraints(constraints);
    }

    for row in rows.iter().take(max_rows) {
        table.add_row(
            columns
                .iter()
                .map(|column| value_cell(&row.values[column.field_index], style)),
        );
    }
    table
}

pub fn counts_table(counts: &EventCounts, badness: &Badness, style: TableStyle) -> Table {
    let mut table = style.new_table();
    table.set_header(style.header(&["Event", "Count"]));
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("records inserted", counts.inserted),
        ("records removed", counts.removed),
        ("records moved", counts.moved),
        ("records replaced", counts.replaced),
        ("all records changed", counts.all_records_changed),
        ("fields changed", counts.fields_changed),
        ("badness changed", counts.badness_changed),
        ("value batches", counts.value_batches),
        ("value updates", counts.value_updates),
        ("attribute updates", counts.attribute_updates),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), count_cell(count)]);
    }
    table.add_row(vec![
        Cell::new("final badness"),
        badness_cell(badness, style),
    ]);
    table
}

fn value_cell(value: &Value, style: TableStyle) -> Cell {
    let cell = Cell::new(value.display());
    if style == TableStyle::Markdown {
        return cell;
    }
    match value.correctness() {
        Correctness::Good => cell,
        Correctness::Suspect | Correctness::Incomplete => cell.fg(Color::Yellow),
        Correctness::Error => cell.fg(Color::Red).add_attribute(Attribute::Bold),
    }
}

fn badness_cell(badness: &Badness, style: TableStyle) -> Cell {
    let text = match badness.detail() {
        Some(detail) => format!("{} ({detail})", badness.as_str()),
        None => badness.as_str().to_string(),
    };
    let cell = Cell::new(text);
    match (style, badness.is_good()) {
        (TableStyle::Markdown, _) => cell,
        (TableStyle::Rounded, true) => cell.fg(Color::Green),
        (TableStyle::Rounded, false) => cell.fg(Color::Yellow),
    }
}

fn cell_alignment(align: TextAlign) -> CellAlignment {
    match align {
        TextAlign::Left => CellAlignment::Left,
        TextAlign::Right => CellAlignment::Right,
        TextAlign::Center => CellAlignment::Center,
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
