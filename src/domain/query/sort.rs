use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, Debug, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(AppError::validation(format!(
                "Invalid sort order '{}': expected 'asc' or 'desc'",
                raw
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Resolves a caller-supplied sort against the entity's allow-list.
    ///
    /// A direction without a field re-orients the default sort.
    pub fn parse(
        allowed: &[&'static str],
        default: SortSpec,
        field: Option<&str>,
        direction: Option<&str>,
    ) -> AppResult<SortSpec> {
        let direction = direction
            .filter(|d| !d.trim().is_empty())
            .map(SortDirection::parse)
            .transpose()?;

        let field = match field.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f,
            None => {
                return Ok(SortSpec {
                    column: default.column,
                    direction: direction.unwrap_or(default.direction),
                })
            }
        };

        let column = allowed
            .iter()
            .copied()
            .find(|c| *c == field)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid sort field '{}'. Allowed: {}",
                    field,
                    allowed.join(", ")
                ))
            })?;

        Ok(SortSpec {
            column,
            direction: direction.unwrap_or(SortDirection::Asc),
        })
    }
}
