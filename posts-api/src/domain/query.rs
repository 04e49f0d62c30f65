//! List query specification: paging, sorting, exact-match filters and
//! substring search over posts.
//!
//! Field names coming from clients are resolved to [`PostField`] before
//! they get anywhere near SQL; values are always passed as bind
//! parameters by the repository.

use std::collections::BTreeMap;

use super::error::DomainError;

pub(crate) const DEFAULT_LIMIT: u32 = 10;
pub(crate) const DEFAULT_PAGE: u32 = 1;
pub(crate) const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum PostField {
    Id,
    PostId,
    Content,
    CreatedAt,
    UpdatedAt,
}

impl PostField {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "id" => Some(Self::Id),
            "post_id" => Some(Self::PostId),
            "content" => Some(Self::Content),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::PostId => "post_id",
            Self::Content => "content",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Only text columns take part in filter and search predicates.
    pub(crate) fn is_text(self) -> bool {
        matches!(self, Self::PostId | Self::Content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sort {
    pub(crate) field: PostField,
    pub(crate) direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: PostField::CreatedAt,
            direction: SortDirection::Asc,
        }
    }
}

impl Sort {
    /// Parses `field.asc` / `field.desc`.
    pub(crate) fn parse(raw: &str) -> Result<Self, DomainError> {
        let (field, direction) = split_pair(raw).ok_or(DomainError::Validation {
            field: "sort",
            message: "malformed sort query, should be field.direction",
        })?;

        let field = PostField::parse(field).ok_or(DomainError::Validation {
            field: "sort",
            message: "unknown sort field",
        })?;

        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => {
                return Err(DomainError::Validation {
                    field: "sort",
                    message: "malformed order in sort query, should be asc or desc",
                });
            }
        };

        Ok(Self { field, direction })
    }
}

/// Raw values are kept as received; zero means "not set" and the
/// accessors fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PostQuery {
    limit: u32,
    page: u32,
    sort: Option<Sort>,
    filter: BTreeMap<PostField, String>,
    search: BTreeMap<PostField, String>,
}

impl PostQuery {
    #[cfg(test)]
    pub(crate) fn new(limit: u32, page: u32) -> Self {
        Self {
            limit,
            page,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub(crate) fn with_filter(
        mut self,
        field: PostField,
        value: impl Into<String>,
    ) -> Result<Self, DomainError> {
        ensure_text_field("filter", field)?;
        self.filter.insert(field, value.into());
        Ok(self)
    }

    pub(crate) fn with_search(
        mut self,
        field: PostField,
        term: impl Into<String>,
    ) -> Result<Self, DomainError> {
        ensure_text_field("search", field)?;
        self.search.insert(field, term.into());
        Ok(self)
    }

    /// Builds a query from decoded `key=value` pairs of a list request.
    ///
    /// `filter` and `search` may repeat and accumulate, a repeated field
    /// keeps its last value. Unknown keys are ignored.
    pub(crate) fn from_params<'a, I>(params: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();

        for (key, value) in params {
            match key {
                "limit" => query.limit = parse_count("limit", value)?,
                "page" => query.page = parse_count("page", value)?,
                "sort" => query.sort = Some(Sort::parse(value)?),
                "filter" => {
                    let (field, value) = parse_field_value("filter", value)?;
                    query = query.with_filter(field, value)?;
                }
                "search" => {
                    let (field, term) = parse_field_value("search", value)?;
                    query = query.with_search(field, term)?;
                }
                _ => {}
            }
        }

        if query.limit > MAX_LIMIT {
            return Err(DomainError::Validation {
                field: "limit",
                message: "must be <= 100",
            });
        }

        Ok(query)
    }

    pub(crate) fn limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        }
    }

    pub(crate) fn page(&self) -> u32 {
        if self.page == 0 {
            DEFAULT_PAGE
        } else {
            self.page
        }
    }

    pub(crate) fn sort(&self) -> Sort {
        self.sort.unwrap_or_default()
    }

    pub(crate) fn filter(&self) -> &BTreeMap<PostField, String> {
        &self.filter
    }

    pub(crate) fn search(&self) -> &BTreeMap<PostField, String> {
        &self.search
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.limit())
    }

    pub(crate) fn total_pages(&self, total_rows: i64) -> i64 {
        if total_rows <= 0 {
            return 0;
        }
        let limit = i64::from(self.limit());
        (total_rows + limit - 1) / limit
    }
}

fn split_pair(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(left), Some(right), None) => Some((left, right)),
        _ => None,
    }
}

fn parse_field_value<'a>(
    param: &'static str,
    raw: &'a str,
) -> Result<(PostField, &'a str), DomainError> {
    let (field, value) = split_pair(raw).ok_or(DomainError::Validation {
        field: param,
        message: "malformed query parameter, should be field.value",
    })?;

    let field = PostField::parse(field).ok_or(DomainError::Validation {
        field: param,
        message: "unknown field",
    })?;

    Ok((field, value))
}

fn ensure_text_field(param: &'static str, field: PostField) -> Result<(), DomainError> {
    if !field.is_text() {
        return Err(DomainError::Validation {
            field: param,
            message: "only post_id and content are supported",
        });
    }
    Ok(())
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>().map_err(|_| DomainError::Validation {
        field,
        message: "must be a non-negative integer",
    })
}
