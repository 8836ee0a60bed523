use std::collections::HashMap;
use std::sync::Arc;

use jobscan_core::error::AppError;
use jobscan_core::layout::{Accessor, FieldRule, Layout};
use jobscan_core::models::JobRecord;
use jobscan_core::source::SourceKind;
use jobscan_core::traits::Extractor;
use scraper::{ElementRef, Html, Selector};

/// A [`Layout`] with every selector parsed.
#[derive(Debug)]
pub enum CompiledLayout {
    Cards {
        card: Selector,
        fields: Vec<CompiledRule>,
    },
    Columns {
        fields: Vec<CompiledRule>,
    },
}

#[derive(Debug)]
pub struct CompiledRule {
    rule: FieldRule,
    selector: Selector,
}

fn parse_selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ExtractorError(format!("Invalid selector '{css}': {e}")))
}

impl CompiledLayout {
    pub fn compile(layout: &Layout) -> Result<Self, AppError> {
        let fields = layout
            .fields()
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    rule: *rule,
                    selector: parse_selector(rule.selector)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(match layout {
            Layout::Cards { card, .. } => CompiledLayout::Cards {
                card: parse_selector(card)?,
                fields,
            },
            Layout::Columns { .. } => CompiledLayout::Columns { fields },
        })
    }
}

/// Shared selectors for the `<noscript>` image fallback.
#[derive(Debug)]
struct ImageSelectors {
    img: Selector,
    noscript: Selector,
}

impl ImageSelectors {
    fn new() -> Result<Self, AppError> {
        Ok(Self {
            img: parse_selector("img[src]")?,
            noscript: parse_selector("noscript")?,
        })
    }

    /// `src` of an image inside `element`, or inside markup wrapped in a
    /// `<noscript>` (which parses as raw text when scripting is enabled).
    fn image_src(&self, element: ElementRef<'_>) -> Option<String> {
        if let Some(src) = element
            .select(&self.img)
            .find_map(|img| img.value().attr("src"))
        {
            return Some(src.to_string());
        }

        element.select(&self.noscript).find_map(|noscript| {
            let markup: String = noscript.text().collect();
            let fragment = Html::parse_fragment(&markup);
            fragment
                .select(&self.img)
                .find_map(|img| img.value().attr("src"))
                .map(str::to_string)
        })
    }
}

/// CSS-selector extractor covering every built-in source.
///
/// All layouts are compiled once at construction; extraction itself never
/// fails. Cheap to clone.
#[derive(Clone)]
pub struct SelectorExtractor {
    layouts: Arc<HashMap<SourceKind, CompiledLayout>>,
    images: Arc<ImageSelectors>,
}

impl SelectorExtractor {
    pub fn new() -> Result<Self, AppError> {
        let layouts = SourceKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, CompiledLayout::compile(&kind.descriptor().layout)?)))
            .collect::<Result<HashMap<_, _>, AppError>>()?;

        Ok(Self {
            layouts: Arc::new(layouts),
            images: Arc::new(ImageSelectors::new()?),
        })
    }

    /// Run an arbitrary compiled layout; links resolve against `base_url`.
    pub fn extract_with(
        &self,
        layout: &CompiledLayout,
        html: &str,
        source: SourceKind,
        base_url: &str,
    ) -> Vec<JobRecord> {
        let document = Html::parse_document(html);

        match layout {
            CompiledLayout::Cards { card, fields } => document
                .select(card)
                .map(|card| {
                    let mut record = JobRecord::new(source);
                    for field in fields {
                        let value = card
                            .select(&field.selector)
                            .next()
                            .and_then(|el| self.read(field, el, base_url));
                        record.set(field.rule.field, value);
                    }
                    record
                })
                .collect(),
            CompiledLayout::Columns { fields } => {
                let columns: Vec<Vec<Option<String>>> = fields
                    .iter()
                    .map(|field| {
                        document
                            .select(&field.selector)
                            .map(|el| self.read(field, el, base_url))
                            .collect()
                    })
                    .collect();

                let shortest = columns
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, column)| column.len());
                let rows = shortest.map_or(0, |(_, column)| column.len());
                if let Some((index, _)) = shortest
                    && columns.iter().any(|c| c.len() != rows)
                {
                    tracing::debug!(
                        %source,
                        rows,
                        shortest = fields[index].rule.field.as_str(),
                        "Column lengths differ, truncating to the shortest"
                    );
                }

                (0..rows)
                    .map(|row| {
                        let mut record = JobRecord::new(source);
                        for (field, column) in fields.iter().zip(&columns) {
                            record.set(field.rule.field, column[row].clone());
                        }
                        record
                    })
                    .collect()
            }
        }
    }

    fn read(&self, field: &CompiledRule, element: ElementRef<'_>, base_url: &str) -> Option<String> {
        let raw = match field.rule.accessor {
            // Separate text nodes so sibling elements don't run together.
            Accessor::Text => element.text().collect::<Vec<_>>().join(" "),
            Accessor::Attr(name) => element.value().attr(name)?.to_string(),
            Accessor::NoscriptImage => self.images.image_src(element)?,
        };
        field.rule.shape(&raw, base_url)
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, html: &str, source: SourceKind) -> Vec<JobRecord> {
        match self.layouts.get(&source) {
            Some(layout) => self.extract_with(layout, html, source, source.descriptor().base_url),
            None => Vec::new(),
        }
    }
}
