//! Lifecycle services.
//!
//! Each operation takes the repository, the resolved `AuthenticatedActor` and already
//! deserialized input, and follows the same order: validate input, resolve the records
//! (NotFound), consult the policy (Forbidden), then mutate.

use uuid::Uuid;

use crate::{
    error::{AppError, FieldError},
    models::{ApplicationStatus, PageRequest},
};

pub mod accounts;
pub mod applications;
pub mod dashboard;
pub mod jobs;

/// Largest page size a listing accepts.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// page_request
///
/// Parses raw `page`/`limit` query values. Absent values default to page 1 and
/// limit 10; anything that is not a positive integer is a validation failure.
/// `limit` is capped at `MAX_PAGE_LIMIT`, and a `page` whose offset does not fit
/// in an `i64` is rejected.
pub fn page_request(page: Option<&str>, limit: Option<&str>) -> Result<PageRequest, AppError> {
    let defaults = PageRequest::default();
    let mut errors = Vec::new();

    let page = positive_or(page, defaults.page, "page", "Page must be a positive integer", &mut errors);
    let mut limit = positive_or(limit, defaults.limit, "limit", "Limit must be a positive integer", &mut errors);

    if limit > MAX_PAGE_LIMIT {
        errors.push(FieldError::new(
            "limit",
            format!("Limit must not exceed {MAX_PAGE_LIMIT}"),
        ));
        limit = defaults.limit;
    }
    if (page - 1).checked_mul(limit).is_none() {
        errors.push(FieldError::new("page", "Page is out of range"));
    }

    if errors.is_empty() {
        Ok(PageRequest { page, limit })
    } else {
        Err(AppError::Validation(errors))
    }
}

fn positive_or(
    raw: Option<&str>,
    default: i64,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> i64 {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => default,
        Some(value) => match value.parse::<i64>() {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.push(FieldError::new(field, message));
                default
            }
        },
    }
}

/// parse_id
///
/// Path and query identifiers arrive as strings so that a malformed id produces the
/// JSON validation envelope instead of a bare extractor rejection.
pub fn parse_id(raw: &str, field: &str, message: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(field, message))
}

pub fn parse_status(raw: &str) -> Result<ApplicationStatus, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::invalid("status", "Invalid status value"))
}
