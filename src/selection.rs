use std::collections::BTreeSet;

use crate::errors::{AtitweakError, Result};

pub const ALL: &str = "all";

// A set of adapter or performance level indices given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Indices(BTreeSet<usize>),
}

impl Selection {
    // Parse "all" or a comma separated list of indices, `what` names the
    // list in error messages
    pub fn parse(what: &'static str, text: &str) -> Result<Self> {
        let text = text.trim();

        if text == ALL {
            return Ok(Self::All);
        }

        let mut indices = BTreeSet::new();
        for token in text.split(',') {
            let token = token.trim();
            let index = token.parse::<usize>().map_err(|_| {
                AtitweakError::invalid_argument(
                    what,
                    text,
                    format!("\"{token}\" is not an index"),
                )
            })?;

            indices.insert(index);
        }

        Ok(Self::Indices(indices))
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            Self::All => true,
            Self::Indices(indices) => indices.contains(&index),
        }
    }

    // Selected indices that are not below `len`
    pub fn out_of_range(&self, len: usize) -> Vec<usize> {
        match self {
            Self::All => Vec::new(),
            Self::Indices(indices) => indices.range(len..).copied().collect(),
        }
    }
}
