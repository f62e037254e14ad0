//! Post query values and pagination.
//!
//! A [`PostQuery`] is a conjunction of predicate clauses over posts. It is a
//! plain value: repositories translate it into their own query language and
//! only touch the store when a page is fetched or counted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Post, PostSummary};
use crate::error::DomainError;
use crate::ports::PostRepository;

/// Number of posts shown per listing page.
pub const POSTS_PER_PAGE: u64 = 5;

/// Filter over posts. All set clauses must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    /// Each term must occur in the title or the content, ignoring case.
    pub terms: Vec<String>,
    pub published_only: bool,
}

impl PostQuery {
    /// Every post, restricted to published ones for anonymous viewers.
    pub fn visible_to(authenticated: bool) -> Self {
        Self {
            published_only: !authenticated,
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tag(mut self, tag_id: Uuid) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    /// Match the whole string as one term. Blank input adds no clause.
    pub fn containing(mut self, text: &str) -> Self {
        if !text.is_empty() {
            self.terms.push(text.to_string());
        }
        self
    }

    /// Match every whitespace-separated word.
    pub fn containing_words(mut self, text: &str) -> Self {
        self.terms
            .extend(text.split_whitespace().map(str::to_string));
        self
    }

    /// Evaluate the query against a single post and the ids of its tags.
    pub fn matches(&self, post: &Post, tag_ids: &[Uuid]) -> bool {
        if self.published_only && !post.is_published {
            return false;
        }
        if self.category_id.is_some_and(|id| id != post.category_id) {
            return false;
        }
        if self.tag_id.is_some_and(|id| !tag_ids.contains(&id)) {
            return false;
        }
        let title = post.title.to_lowercase();
        let content = post.content.to_lowercase();
        self.terms.iter().all(|term| {
            let term = term.to_lowercase();
            title.contains(&term) || content.contains(&term)
        })
    }
}

/// Which page of a listing was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(u64),
    Last,
}

impl PageSelector {
    /// Parse the `page` query parameter. Missing or empty means the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        match raw {
            None | Some("") => Ok(Self::Number(1)),
            Some("last") => Ok(Self::Last),
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|n| *n >= 1)
                .map(Self::Number)
                .ok_or_else(|| DomainError::InvalidPage(value.to_string())),
        }
    }
}

/// Resolved slice of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// Resolve a selector against the listing size. Page 1 always exists,
    /// even for an empty listing.
    pub fn resolve(
        selector: PageSelector,
        per_page: u64,
        total_items: u64,
    ) -> Result<Self, DomainError> {
        let total_pages = total_items.div_ceil(per_page).max(1);
        let number = match selector {
            PageSelector::Last => total_pages,
            PageSelector::Number(n) if n <= total_pages => n,
            PageSelector::Number(n) => {
                return Err(DomainError::InvalidPage(format!(
                    "page {n} is past the last page ({total_pages})"
                )));
            }
        };
        Ok(Self {
            number,
            per_page,
            total_items,
            total_pages,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }
}

/// One page of results with its position in the full listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            per_page: window.per_page,
            total_items: window.total_items,
            total_pages: window.total_pages,
            has_next: window.number < window.total_pages,
            has_previous: window.number > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

/// Count the matches, resolve the requested page and fetch it.
pub async fn fetch_page(
    posts: &dyn PostRepository,
    query: &PostQuery,
    selector: PageSelector,
    per_page: u64,
) -> Result<Page<PostSummary>, DomainError> {
    let total = posts.count(query).await?;
    let window = PageWindow::resolve(selector, per_page, total)?;
    let items = posts.list(query, window.offset(), per_page).await?;
    Ok(Page::new(items, window))
}
