use sharedspace_types::api::ListQuery;
use sharedspace_types::models::Services;

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Validated listing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
    /// Service flags every returned location must have.
    pub services: Vec<String>,
}

impl PageParams {
    pub fn from_query(query: ListQuery) -> Result<Self> {
        let page = parse_positive("page", query.page.as_deref(), DEFAULT_PAGE)?;
        let limit = parse_positive("limit", query.limit.as_deref(), DEFAULT_LIMIT)?;

        let services: Vec<String> = query
            .services
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let unknown: Vec<&str> = services
            .iter()
            .map(String::as_str)
            .filter(|s| !Services::is_flag(s))
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::Validation(format!("Unknown services: {}", unknown.join(", "))));
        }

        let params = Self { page, limit, services };
        if i64::try_from(params.offset()).is_err() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        Ok(params)
    }

    /// Rows to skip. Always fits in `u64`: both factors are below 2^32.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// The active filter as it appears in pagination links.
    pub fn services_filter(&self) -> Option<String> {
        (!self.services.is_empty()).then(|| self.services.join(","))
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: u32) -> Result<u32> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::Validation(format!("{name} must be a positive integer"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Build the `next`/`previous` links for a listing.
///
/// `base_url` is the absolute URL of the listing route without a query
/// string. `next` exists while `page < count / limit`; `previous` whenever
/// `page > 1`. An active `services` filter is carried into both links.
pub fn page_links(page: u32, limit: u32, count: u64, base_url: &str, services: Option<&str>) -> PageLinks {
    let link = |target: u32| {
        let mut url = format!("{base_url}?page={target}&limit={limit}");
        if let Some(services) = services {
            url.push_str("&services=");
            url.push_str(services);
        }
        url
    };

    let has_next = u64::from(page) * u64::from(limit) < count;

    PageLinks {
        next: has_next.then(|| link(page + 1)),
        previous: (page > 1).then(|| link(page - 1)),
    }
}
