use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::accumulator::FinalizedIndicators;
use crate::constants::NO_DATA_BANNER;
use crate::matcher::IndicatorMatcher;
use crate::report::catalog::{help_with_source, SectionDescriptor};
use crate::report::html;
use crate::report::renderer::{ReportSection, SectionBody, SectionRenderer, SectionState};

/// Streams the report one section at a time.
///
/// Every section is written as soon as it is rendered, so nothing but the
/// per-section summaries is kept in memory.
pub struct ReportComposer<W: Write> {
    out: W,
    renderer: SectionRenderer,
    sections: Vec<ReportSection>,
}

impl ReportComposer<BufWriter<File>> {
    /// Create (or truncate) the report file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ReportComposer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            renderer: SectionRenderer::new(),
            sections: Vec::new(),
        }
    }

    fn write_str(&mut self, markup: &str) -> Result<()> {
        self.out
            .write_all(markup.as_bytes())
            .context("Failed to write report")
    }

    pub fn write_header(&mut self, collection_name: &str, branding: Option<&str>, nav: &[(&str, &str)]) -> Result<()> {
        let header = html::document_header(collection_name, branding, nav);
        self.write_str(&header)
    }

    /// Render and write one collected section
    pub fn write_section(&mut self, descriptor: &SectionDescriptor, body: &SectionBody) -> Result<&ReportSection> {
        let help = help_with_source(descriptor);
        let (markup, section) = self.renderer.render(descriptor.anchor, descriptor.title, &help, body);
        self.write_str(&markup)?;
        Ok(self.push(section))
    }

    /// Note a section the configuration switched off; nothing is written
    pub fn record_disabled(&mut self, descriptor: &SectionDescriptor) {
        self.sections
            .push(SectionRenderer::disabled(descriptor.anchor, descriptor.title));
    }

    /// One de-duplicated indicator per line, highlighted when it matches an IOC
    pub fn write_dump(
        &mut self,
        descriptor: &SectionDescriptor,
        indicators: &FinalizedIndicators,
        matcher: &IndicatorMatcher,
    ) -> Result<&ReportSection> {
        let mut markup = self
            .renderer
            .open(descriptor.anchor, descriptor.title, descriptor.help);

        let count = indicators.unique_count();
        if count == 0 {
            markup.push_str(&html::banner(NO_DATA_BANNER));
        } else {
            markup.push_str("<p>\n");
            for (value, _) in &indicators.values {
                markup.push_str(&html::text(value, matcher.matches(value)));
                markup.push_str("<br>\n");
            }
            markup.push_str("</p>\n");
            markup.push_str(&format!(
                "<p>Records Found: {}<br>\nDuplicates Found: {}</p>\n",
                count, indicators.total_duplicates
            ));
        }
        markup.push_str(html::section_close());
        self.write_str(&markup)?;

        Ok(self.push(ReportSection {
            title: descriptor.title.to_string(),
            anchor: descriptor.anchor.to_string(),
            state: state_for(count),
            count,
        }))
    }

    /// Every configured IOC with the number of records it matched
    pub fn write_ioc_summary(&mut self, descriptor: &SectionDescriptor, matcher: &IndicatorMatcher) -> Result<&ReportSection> {
        let mut markup = self
            .renderer
            .open(descriptor.anchor, descriptor.title, descriptor.help);

        let entries = matcher.entries();
        markup.push_str("<p>\n");
        for entry in entries {
            markup.push_str(&format!(
                "<A HREF='javascript:searchIOC(\"{}\")'> {}</A> ({})<br>\n",
                html::js_string(&entry.pattern),
                html::escape(&entry.pattern),
                entry.hits
            ));
        }
        markup.push_str("</p>\n");
        markup.push_str(&format!(
            "<p>Records Found: {}<br>\nTotal IOC Hits: {}</p>\n",
            entries.len(),
            matcher.total_hits()
        ));
        markup.push_str(html::section_close());
        self.write_str(&markup)?;

        Ok(self.push(ReportSection {
            title: descriptor.title.to_string(),
            anchor: descriptor.anchor.to_string(),
            state: state_for(entries.len()),
            count: entries.len(),
        }))
    }

    fn push(&mut self, section: ReportSection) -> &ReportSection {
        self.sections.push(section);
        &self.sections[self.sections.len() - 1]
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    /// Write the closing line and flush
    pub fn finish(mut self) -> Result<(W, Vec<ReportSection>)> {
        self.write_str(html::END_REPORT)?;
        self.out.flush().context("Failed to flush report")?;
        Ok((self.out, self.sections))
    }
}

fn state_for(count: usize) -> SectionState {
    if count > 0 {
        SectionState::EnabledWithData
    } else {
        SectionState::EnabledNoData
    }
}
