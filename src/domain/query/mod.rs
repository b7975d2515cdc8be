//! List query construction: filters, sorting and pagination for `GET /api/{entity}`.

use crate::domain::model::EntityModel;
use crate::error::{AppError, AppResult};
use std::collections::HashMap;

pub mod builder;
pub mod filter;
pub mod page;
pub mod sort;

pub use filter::{FilterField, FilterOp, FilterValue, FilterValues, Predicate, ValueType};
pub use page::{Page, PageDefaults, PagedResult, Pagination};
pub use sort::{SortDirection, SortSpec};

const PAGE_PARAM: &str = "page";
const LIMIT_PARAM: &str = "limit";
const SORT_FIELD_PARAMS: &[&str] = &["sort_by", "sortBy"];
const SORT_ORDER_PARAMS: &[&str] = &["sort_order", "sortOrder"];

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub predicates: Vec<Predicate>,
    pub sort: SortSpec,
    pub page: Page,
}

/// Value of whichever alias was sent. Aliases that disagree are rejected.
fn first_of<'a>(params: &'a HashMap<String, String>, keys: &[&str]) -> AppResult<Option<&'a str>> {
    let mut found: Option<(&str, &'a str)> = None;
    for key in keys {
        let Some(value) = params.get(*key) else {
            continue;
        };
        match found {
            Some((first_key, first)) if first.trim() != value.trim() => {
                return Err(AppError::validation(format!(
                    "Conflicting values for '{}' and '{}'",
                    first_key, key
                )));
            }
            Some(_) => {}
            None => found = Some((key, value.as_str())),
        }
    }
    Ok(found.map(|(_, v)| v))
}

impl ListQuery {
    /// Validates raw query-string parameters against the model's allow-lists.
    pub fn parse(
        model: &dyn EntityModel,
        params: &HashMap<String, String>,
        defaults: &PageDefaults,
    ) -> AppResult<ListQuery> {
        let mut unknown: Vec<&str> = params
            .keys()
            .map(String::as_str)
            .filter(|k| {
                *k != PAGE_PARAM
                    && *k != LIMIT_PARAM
                    && !SORT_FIELD_PARAMS.contains(k)
                    && !SORT_ORDER_PARAMS.contains(k)
                    && !model
                        .filters()
                        .iter()
                        .any(|f| f.accepted_params().iter().any(|p| p == k))
            })
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(AppError::validation(format!(
                "Unknown query parameter(s) for '{}': {}",
                model.name(),
                unknown.join(", ")
            )));
        }

        let predicates = filter::build_predicates(model.filters(), params)?;
        let sort = SortSpec::parse(
            model.sortable(),
            model.default_sort(),
            first_of(params, SORT_FIELD_PARAMS)?,
            first_of(params, SORT_ORDER_PARAMS)?,
        )?;
        let page = Page::parse(
            params.get(PAGE_PARAM).map(String::as_str),
            params.get(LIMIT_PARAM).map(String::as_str),
            defaults,
        )?;

        Ok(ListQuery {
            predicates,
            sort,
            page,
        })
    }
}
