use serde::Serialize;

use crate::models::account::Account;

/// URL templates for the account endpoints, resolved once at startup from
/// the configured base URL. Handlers never build hrefs by hand.
#[derive(Clone)]
pub struct LinkTemplates {
    base: String,
}

impl LinkTemplates {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn add(&self) -> String {
        format!("{}/api/accounts/add", self.base)
    }

    pub fn account(&self, username: &str) -> String {
        format!("{}/api/accounts/{}", self.base, username)
    }

    pub fn update(&self) -> String {
        format!("{}/api/accounts/update", self.base)
    }

    pub fn collection(&self) -> String {
        format!("{}/api/accounts/", self.base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    fn new(rel: &str, href: String) -> Self {
        Self {
            rel: rel.to_string(),
            href,
        }
    }
}

/// An account wrapped with its navigation links. Same four affordances for
/// every account: add, self, update, delete.
#[derive(Debug, Serialize)]
pub struct AccountResource {
    pub account: Account,
    pub links: Vec<Link>,
}

impl AccountResource {
    pub fn new(account: Account, templates: &LinkTemplates) -> Self {
        let links = vec![
            Link::new("add", templates.add()),
            Link::new("self", templates.account(&account.username)),
            Link::new("update", templates.update()),
            Link::new("delete", templates.account(&account.username)),
        ];
        Self { account, links }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountCollection {
    pub items: Vec<AccountResource>,
    pub links: Vec<Link>,
}

impl AccountCollection {
    pub fn new(accounts: Vec<Account>, templates: &LinkTemplates) -> Self {
        let items = accounts
            .into_iter()
            .map(|account| AccountResource::new(account, templates))
            .collect();
        Self {
            items,
            links: vec![Link::new("self", templates.collection())],
        }
    }
}
