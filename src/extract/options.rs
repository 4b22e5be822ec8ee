//! Extraction options and page selection.

use std::ops::RangeInclusive;

/// Options for extracting documents from PDF bytes.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Which pages to extract
    pub pages: PageSelection,

    /// Process pages in parallel
    pub parallel: bool,

    /// Reconstruct tables from ruled grids and aligned columns
    pub detect_tables: bool,

    /// Assign heading levels from font size statistics
    pub detect_headings: bool,

    /// Password for encrypted documents
    pub password: Option<String>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Enable or disable heading detection.
    pub fn with_headings(mut self, detect: bool) -> Self {
        self.detect_headings = detect;
        self
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: PageSelection::All,
            parallel: true,
            detect_tables: true,
            detect_headings: true,
            password: None,
        }
    }
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number is selected.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a selection such as "all", "2-4" or "1,3,5-7".
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (page_number(start)?, page_number(end)?);
                if start > end {
                    return Err(format!("Empty page range '{}'", s));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(page_number(start)?..=page_number(end)?),
                None => pages.push(page_number(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

fn page_number(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("Page numbers start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("Invalid page number '{}'", s.trim())),
    }
}

impl std::str::FromStr for PageSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_options_builder() {
        let options = ExtractOptions::new()
            .sequential()
            .with_tables(false)
            .with_pages(PageSelection::Pages(vec![2]));
        assert!(!options.parallel);
        assert!(!options.detect_tables);
        assert!(options.detect_headings);
        assert!(options.pages.includes(2));
        assert!(!options.pages.includes(1));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("2-4").unwrap(), PageSelection::Range(2..=4));
        assert_eq!(
            PageSelection::parse("5, 1,3-4,3").unwrap(),
            PageSelection::Pages(vec![1, 3, 4, 5])
        );
    }

    #[test]
    fn test_page_selection_rejects_garbage() {
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("x-3").is_err());
        assert!(PageSelection::parse("4-2").is_err());
    }
}
