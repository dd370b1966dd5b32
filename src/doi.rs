// src/doi.rs
//! DOI value type. The only way to build a [`Doi`] is a pattern search, so every
//! instance in the pipeline satisfies `10.<4-9 digits>/<charset>+`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+").expect("valid DOI pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    /// First DOI-shaped substring of `text`, if any.
    pub fn find_in(text: &str) -> Option<Self> {
        DOI_RE.find(text).map(|m| Doi(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
