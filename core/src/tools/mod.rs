//! The `search_cats` tool exposed to the assistant

pub mod cats;

pub use cats::CatClient;

use crate::assistant::ToolDefinition;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

pub const SEARCH_CATS: &str = "search_cats";

/// Anything that can answer a cat search. Implementations never fail: problems
/// are reported through [`SearchOutcome::Error`].
#[async_trait]
pub trait CatSearch: Send + Sync {
    async fn search(&self, args: &SearchCatsArgs) -> SearchOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatSize {
    Small,
    Medium,
    Large,
}

impl CatSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatSize::Small => "small",
            CatSize::Medium => "medium",
            CatSize::Large => "large",
        }
    }

    /// Size class from a body weight upper bound in kilograms
    pub fn from_weight_kg(max_kg: f64) -> Self {
        if max_kg < 4.0 {
            CatSize::Small
        } else if max_kg <= 6.0 {
            CatSize::Medium
        } else {
            CatSize::Large
        }
    }
}

impl FromStr for CatSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(CatSize::Small),
            "medium" => Ok(CatSize::Medium),
            "large" => Ok(CatSize::Large),
            other => Err(format!("unknown size '{other}', expected small, medium or large")),
        }
    }
}

impl fmt::Display for CatSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a `search_cats` call. All filters are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCatsArgs {
    pub breed: Option<String>,
    pub temperament: Option<String>,
    pub size: Option<CatSize>,
}

#[derive(Deserialize)]
struct RawSearchCatsArgs {
    #[serde(default)]
    breed: Option<String>,
    #[serde(default)]
    temperament: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

impl SearchCatsArgs {
    /// Parse the JSON argument string of a tool call.
    ///
    /// Blank strings count as absent; a blank argument string means no filters.
    pub fn parse(arguments: &str) -> Result<Self> {
        let invalid = |reason: String| Error::ToolArgument {
            tool_name: SEARCH_CATS.to_string(),
            reason,
        };

        if arguments.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawSearchCatsArgs =
            serde_json::from_str(arguments).map_err(|e| invalid(e.to_string()))?;

        let size = match non_blank(raw.size) {
            Some(size) => Some(size.parse::<CatSize>().map_err(invalid)?),
            None => None,
        };

        Ok(Self {
            breed: non_blank(raw.breed),
            temperament: non_blank(raw.temperament),
            size,
        })
    }

    pub fn has_traits(&self) -> bool {
        self.temperament.is_some() || self.size.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Result of a cat search as seen by the assistant
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// First matching image record, as returned by the image service
    Found(Value),
    NotFound,
    Error { message: String },
}

impl SearchOutcome {
    /// JSON text submitted as the tool output
    pub fn to_output(&self) -> String {
        match self {
            SearchOutcome::Found(record) => record.to_string(),
            SearchOutcome::NotFound => json!({
                "status": "not_found",
                "message": "No cats matched the search criteria."
            })
            .to_string(),
            SearchOutcome::Error { message } => json!({
                "status": "error",
                "message": message
            })
            .to_string(),
        }
    }
}

/// Declaration of `search_cats` for the assistant definition
pub fn search_cats_definition() -> ToolDefinition {
    ToolDefinition::function(
        SEARCH_CATS,
        "Search for cats based on specific criteria",
        json!({
            "type": "object",
            "properties": {
                "breed": {
                    "type": "string",
                    "description": "The breed of cat to search for"
                },
                "temperament": {
                    "type": "string",
                    "description": "The desired temperament of the cat"
                },
                "size": {
                    "type": "string",
                    "enum": ["small", "medium", "large"],
                    "description": "The size of the cat"
                }
            },
            "required": []
        }),
    )
}
