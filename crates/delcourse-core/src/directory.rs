//! Searchable, sortable view over the platform's user list.

use crate::models::User;
use crate::utils::{cmp_ignore_case, contains_ignore_case, format_date, initials};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    pub search_query: String,
    pub order: SortOrder,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Query should already be lowercased.
    fn matches_search(user: &User, query: &str) -> bool {
        contains_ignore_case(&user.name, query) || contains_ignore_case(&user.email, query)
    }

    /// Users matching the search query, sorted by name.
    pub fn visible(&self) -> Vec<&User> {
        let mut sorted: Vec<&User> = self.users.iter().collect();

        let query = self.search_query.trim().to_lowercase();
        if !query.is_empty() {
            sorted.retain(|u| Self::matches_search(u, &query));
        }

        sorted.sort_by(|a, b| {
            let cmp = cmp_ignore_case(&a.name, &b.name)
                .then_with(|| cmp_ignore_case(&a.email, &b.email));
            match self.order {
                SortOrder::Ascending => cmp,
                SortOrder::Descending => cmp.reverse(),
            }
        });

        sorted
    }
}

/// Avatar initials for a user.
pub fn user_initials(user: &User) -> String {
    initials(&user.name, &user.email)
}

/// Registration date for display, or "-".
pub fn joined_display(user: &User) -> String {
    format_date(user.created_at.as_deref())
}
