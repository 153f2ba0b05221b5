// src/session.rs

use crate::classify::FileCategory;
use crate::model::{Commit, RepositoryIdentity};
use crate::wrap::wrap_words;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

const DATE_FORMAT: &str = "%d/%m/%Y";
const RULE: &str = "====================";
const NO_METHOD_CHANGES: &str = "No Changes Within Method Contexts";

/// Rendering knobs for the text report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Soft width for commit messages
    pub wrap_width: usize,
    /// Indent of wrapped message continuation lines
    pub continuation_indent: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { wrap_width: 35, continuation_indent: 13 }
    }
}

/// Everything one diff run found, consumed by `render`.
#[derive(Debug, Clone, Default)]
pub struct DiffSession {
    options: ReportOptions,
    markup_files: BTreeSet<String>,
    query_files: BTreeSet<String>,
    /// Package (qualified type name) to changed method signatures
    packages: BTreeMap<String, BTreeSet<String>>,
    identity: RepositoryIdentity,
    delta_count: usize,
    base: Option<Commit>,
    new: Option<Commit>,
}

impl DiffSession {
    pub fn new(options: ReportOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn set_identity(&mut self, identity: RepositoryIdentity) {
        self.identity = identity;
    }

    pub fn set_delta_count(&mut self, delta_count: usize) {
        self.delta_count = delta_count;
    }

    pub fn set_endpoints(&mut self, base: Commit, new: Commit) {
        self.base = Some(base);
        self.new = Some(new);
    }

    /// Adds `signature` to the method set of `package`. Absent or empty
    /// signatures are ignored.
    pub fn record_method_change(&mut self, package: &str, signature: Option<&str>) {
        let Some(signature) = signature.filter(|s| !s.is_empty()) else {
            return;
        };
        self.packages.entry(package.to_string()).or_default().insert(signature.to_string());
    }

    /// Registers a package whose source changed, even if no method did.
    pub fn record_source_file(&mut self, package: &str) {
        if package.is_empty() {
            return;
        }
        self.packages.entry(package.to_string()).or_default();
    }

    /// Adds a markup or query script path. Empty paths and the literal
    /// `"null"` are ignored, as are source paths.
    pub fn record_auxiliary_file(&mut self, category: FileCategory, path: Option<&str>) {
        let Some(path) = path.filter(|p| !p.is_empty() && *p != "null") else {
            return;
        };
        let files = match category {
            FileCategory::Markup => &mut self.markup_files,
            FileCategory::QueryScript => &mut self.query_files,
            FileCategory::Source => return,
        };
        files.insert(path.to_string());
    }

    pub fn auxiliary_files(&self, category: FileCategory) -> Option<&BTreeSet<String>> {
        match category {
            FileCategory::Markup => Some(&self.markup_files),
            FileCategory::QueryScript => Some(&self.query_files),
            FileCategory::Source => None,
        }
    }

    pub fn methods(&self, package: &str) -> Option<&BTreeSet<String>> {
        self.packages.get(package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn delta_count(&self) -> usize {
        self.delta_count
    }

    /// Renders the report dated today.
    pub fn render(self) -> String {
        self.render_on(Utc::now().date_naive())
    }

    pub fn render_on(self, today: NaiveDate) -> String {
        Report { session: &self, today }.to_string()
    }

    fn write_report(&self, out: &mut impl Write, today: NaiveDate) -> fmt::Result {
        writeln!(out, "Repository:  {}", self.identity.name)?;
        writeln!(out, "Date:        {}", today.format(DATE_FORMAT))?;
        writeln!(out, "User:        {}<{}>", self.identity.user_name, self.identity.user_email)?;
        writeln!(out, "Delta Count: {}", self.delta_count)?;
        writeln!(out)?;

        self.write_commit(out, "Base Commit:", self.base.as_ref())?;
        writeln!(out)?;
        self.write_commit(out, "New Commit:", self.new.as_ref())?;
        writeln!(out)?;

        write_file_section(out, "Markup Files", &self.markup_files)?;
        writeln!(out)?;
        write_file_section(out, "Query Script Files", &self.query_files)?;
        writeln!(out)?;

        writeln!(out, "Source Packages ({}):", self.packages.len())?;
        writeln!(out, "{RULE}")?;
        writeln!(out)?;
        for (package, methods) in &self.packages {
            writeln!(out, "{package}")?;
            if methods.is_empty() {
                writeln!(out, "    {NO_METHOD_CHANGES}")?;
            }
            for method in methods {
                writeln!(out, "    {method}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    fn write_commit(&self, out: &mut impl Write, title: &str, commit: Option<&Commit>) -> fmt::Result {
        let (id, date, message) = match commit {
            Some(c) => (c.id.as_str(), format_timestamp(c.timestamp), c.message.as_str()),
            None => ("", String::new(), ""),
        };

        writeln!(out, "{title}")?;
        writeln!(out, "    SHA-1: {id}")?;
        writeln!(out, "    Date: {date}")?;
        write!(out, "    Message: ")?;

        let indent = " ".repeat(self.options.continuation_indent);
        for (i, line) in wrap_words(message, self.options.wrap_width).iter().enumerate() {
            if i > 0 {
                write!(out, "\n{indent}")?;
            }
            write!(out, "{line}")?;
        }
        writeln!(out)
    }
}

/// A session paired with the date printed in its header
struct Report<'a> {
    session: &'a DiffSession,
    today: NaiveDate,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.session.write_report(f, self.today)
    }
}

fn write_file_section(out: &mut impl Write, title: &str, files: &BTreeSet<String>) -> fmt::Result {
    writeln!(out, "{title} ({}):", files.len())?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    for file in files {
        writeln!(out, "    {file}")?;
    }
    Ok(())
}

fn format_timestamp(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|t| t.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}
