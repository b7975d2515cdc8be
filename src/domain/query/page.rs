use crate::error::{AppError, AppResult};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn parse(page: Option<&str>, limit: Option<&str>, defaults: &PageDefaults) -> AppResult<Page> {
        let page = match page.map(str::trim).filter(|s| !s.is_empty()) {
            None => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    return Err(AppError::validation(format!(
                        "Invalid page '{}': must be an integer >= 1",
                        raw
                    )))
                }
            },
        };

        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            None => defaults.default_limit,
            Some(raw) => match raw.parse::<u32>() {
                Ok(l) if l >= 1 => l,
                _ => {
                    return Err(AppError::validation(format!(
                        "Invalid limit '{}': must be an integer >= 1",
                        raw
                    )))
                }
            },
        };

        Ok(Page {
            page,
            limit: limit.min(defaults.max_limit.max(1)),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    /// Rows matching the filter before slicing.
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        let limit = page.limit.max(1) as i64;
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct PagedResult<T> {
    pub rows: Vec<T>,
    pub pagination: Pagination,
}
