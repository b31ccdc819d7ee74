use polars::prelude::*;
use regex::Regex;

use super::table::Table;
use crate::error::{Result, TableError};

#[derive(Debug, Clone)]
pub enum TextTransform {
    Lowercase,
    Uppercase,
    /// First letter of every alphabetic run upper case, the rest lower case.
    TitleCase,
    /// Case-sensitive replacement of every occurrence of `from`.
    Replace { from: String, to: String },
    ReplacePattern { pattern: Regex, replacement: String },
    Trim,
}

impl TextTransform {
    pub fn replace(from: &str, to: &str) -> Self {
        TextTransform::Replace {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn replace_pattern(pattern: &str, replacement: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| TableError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        Ok(TextTransform::ReplacePattern {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::TitleCase => title_case(text),
            TextTransform::Replace { from, to } => text.replace(from.as_str(), to),
            TextTransform::ReplacePattern {
                pattern,
                replacement,
            } => pattern.replace_all(text, replacement.as_str()).into_owned(),
            TextTransform::Trim => text.trim().to_string(),
        }
    }
}

impl Table {
    /// `column` with `transform` applied to every cell; nulls stay null.
    pub fn transformed_text(&self, column: &str, transform: &TextTransform) -> Result<Series> {
        let dtype = self.dtype(column)?;
        if dtype != DataType::String {
            return Err(TableError::type_mismatch(column, "text", dtype));
        }

        let values = self.frame().column(column)?.str()?;
        let mut transformed = Vec::with_capacity(values.len());
        for value in values.into_iter() {
            transformed.push(value.map(|text| transform.apply(text)));
        }

        Ok(Series::new(column.into(), transformed))
    }

    /// Overwrite `column` with its transformed text.
    pub fn apply_text(&mut self, column: &str, transform: &TextTransform) -> Result<()> {
        let series = self.transformed_text(column, transform)?;
        let mut frame = self.frame().clone();
        frame.with_column(series)?;
        *self = self.replace_frame(frame)?;
        Ok(())
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                let mut upper = c.to_uppercase();
                out.extend(upper.next());
                out.extend(upper.flat_map(char::to_lowercase));
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
