//! One section in, one self-contained HTML fragment out.

use serde::Serialize;

use crate::constants::{NO_DATA_BANNER, NO_INPUT_BANNER};
use crate::report::html;

/// Rendered state of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionState {
    /// Switched off by the configuration; nothing is written
    Disabled,
    EnabledNoData,
    EnabledWithData,
}

/// What the composer keeps about each section after writing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub anchor: String,
    pub state: SectionState,
    pub count: usize,
}

/// One table cell before escaping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// Value linked to the threat-intel lookup
    Lookup(String),
}

impl Cell {
    fn render(&self, hit: bool) -> String {
        match self {
            Cell::Text(value) => html::text(value, hit),
            Cell::Lookup(value) => html::lookup_link(value, hit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// The row matched at least one IOC pattern
    pub hit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub bold: bool,
    pub hit: bool,
}

impl Line {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            hit: false,
        }
    }
}

/// A piece of section content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Sub-heading inside a section; not a record
    Heading(String),
    /// Emphasized remark; not a record
    Note(String),
    Table(TableBlock),
    Lines(Vec<Line>),
}

impl Block {
    fn record_count(&self) -> usize {
        match self {
            Block::Heading(_) | Block::Note(_) => 0,
            Block::Table(table) => table.rows.len(),
            Block::Lines(lines) => lines.len(),
        }
    }
}

/// What a section collector produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// The section's input was missing or its producer failed
    Unavailable,
    Blocks(Vec<Block>),
}

impl SectionBody {
    pub fn empty() -> Self {
        SectionBody::Blocks(Vec::new())
    }

    pub fn record_count(&self) -> usize {
        match self {
            SectionBody::Unavailable => 0,
            SectionBody::Blocks(blocks) => blocks.iter().map(Block::record_count).sum(),
        }
    }

    pub fn state(&self) -> SectionState {
        if self.record_count() > 0 {
            SectionState::EnabledWithData
        } else {
            SectionState::EnabledNoData
        }
    }
}

/// Renders sections and numbers their collapse checkboxes
#[derive(Debug)]
pub struct SectionRenderer {
    next_checkbox: usize,
}

impl Default for SectionRenderer {
    fn default() -> Self {
        Self { next_checkbox: 1 }
    }
}

impl SectionRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor and heading with the next checkbox id
    pub fn open(&mut self, anchor: &str, title: &str, help: &str) -> String {
        let checkbox = self.next_checkbox;
        self.next_checkbox += 1;
        html::section_open(anchor, checkbox, title, help)
    }

    pub fn render(&mut self, anchor: &str, title: &str, help: &str, body: &SectionBody) -> (String, ReportSection) {
        let mut out = self.open(anchor, title, help);
        let count = body.record_count();

        match body {
            SectionBody::Unavailable => out.push_str(&html::banner(NO_INPUT_BANNER)),
            SectionBody::Blocks(_) if count == 0 => out.push_str(&html::banner(NO_DATA_BANNER)),
            SectionBody::Blocks(blocks) => {
                for block in blocks {
                    render_block(&mut out, block);
                }
                out.push_str(&html::records_found(count));
            }
        }
        out.push_str(html::section_close());

        let section = ReportSection {
            title: title.to_string(),
            anchor: anchor.to_string(),
            state: body.state(),
            count,
        };
        (out, section)
    }

    pub fn disabled(anchor: &str, title: &str) -> ReportSection {
        ReportSection {
            title: title.to_string(),
            anchor: anchor.to_string(),
            state: SectionState::Disabled,
            count: 0,
        }
    }
}

fn render_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading(title) => out.push_str(&html::subheading(title)),
        Block::Note(note) => {
            out.push_str("<p><i><b>");
            out.push_str(&html::escape(note));
            out.push_str("</b></i></p>\n");
        }
        // Empty tables inside a populated section are left out
        Block::Table(table) if table.rows.is_empty() => {}
        Block::Table(table) => {
            out.push_str(&html::table_open(&table.header));
            for row in &table.rows {
                let cells: Vec<String> = row.cells.iter().map(|cell| cell.render(row.hit)).collect();
                out.push_str(&html::table_row(&cells));
            }
            out.push_str(html::table_close());
        }
        Block::Lines(lines) => {
            out.push_str("<p>\n");
            for line in lines {
                let text = html::text(&line.text, line.hit);
                if line.bold {
                    out.push_str(&format!("<b>{}</b><br>\n", text));
                } else {
                    out.push_str(&format!("{}<br>\n", text));
                }
            }
            out.push_str("</p>\n");
        }
    }
}
