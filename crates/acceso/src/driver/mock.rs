//! Scripted in-memory page for unit and integration tests.
//!
//! A [`MockDriver`] holds a flat list of [`MockElement`]s per route and
//! evaluates [`Selector`]s against them with a small compound-CSS matcher
//! (tag, `.class`, `#id`, `[attr]`, `[attr=v]`, `*=`, `^=`, `$=`, `~=`,
//! `:not(...)`, selector lists). Combinators are rejected.
//!
//! Clicking an element with a registered [`ClickHandler`] runs the handler
//! against the page, which is how [`MockLoginApp`] simulates the application
//! under test.

use super::PageDriver;
use crate::locator::{implicit_role_tags, Selector};
use crate::result::{AccesoError, AccesoResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reaction to a click on a keyed element
pub type ClickHandler = Arc<dyn Fn(&mut MockPage) + Send + Sync>;

// =============================================================================
// ELEMENTS
// =============================================================================

/// One element of the fake DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    key: Option<String>,
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    checked: bool,
    visible: bool,
    hidden_polls: u32,
}

impl MockElement {
    /// Visible element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            key: None,
            tag: tag.into().to_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            checked: false,
            visible: true,
            hidden_polls: 0,
        }
    }

    /// Handle used by tests and click handlers to address this element
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Append a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let classes = self.attrs.entry("class".to_string()).or_default();
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
        self
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Render but hide (`display: none`)
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Report hidden for the first `polls` visibility checks
    #[must_use]
    pub const fn visible_after_polls(mut self, polls: u32) -> Self {
        self.hidden_polls = polls;
        self
    }

    /// Attribute value
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Tag name (lowercase)
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Current value of a form field
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checkbox state
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        self.checked
    }

    fn is_rendered(&self) -> bool {
        self.visible && self.hidden_polls == 0
    }

    fn is_checkbox(&self) -> bool {
        self.tag == "input" && self.get_attr("type") == Some("checkbox")
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// Page state visible to click handlers
#[derive(Debug, Default)]
pub struct MockPage {
    url: String,
    elements: Vec<MockElement>,
    routes: HashMap<String, Vec<MockElement>>,
    pending_redirect: Option<(String, u32)>,
}

impl MockPage {
    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Load `url`, rendering the route registered for its path.
    pub fn goto(&mut self, url: &str) {
        self.url = url.to_string();
        self.pending_redirect = None;
        self.elements = self.routes.get(path_of(url)).cloned().unwrap_or_default();
    }

    /// Load `url` once the URL has been read `polls` more times.
    pub fn redirect_after(&mut self, url: impl Into<String>, polls: u32) {
        self.pending_redirect = Some((url.into(), polls));
    }

    /// Register the markup served at `path`
    pub fn set_route(&mut self, path: impl Into<String>, elements: Vec<MockElement>) {
        self.routes.insert(path.into(), elements);
    }

    /// Replace the rendered elements
    pub fn set_elements(&mut self, elements: Vec<MockElement>) {
        self.elements = elements;
    }

    /// Element by key
    #[must_use]
    pub fn element(&self, key: &str) -> Option<&MockElement> {
        self.elements.iter().find(|e| e.key.as_deref() == Some(key))
    }

    /// Mutable element by key
    pub fn element_mut(&mut self, key: &str) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|e| e.key.as_deref() == Some(key))
    }

    /// Value of a keyed form field
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.element(key).map(MockElement::value)
    }

    /// Make a keyed element visible
    pub fn show(&mut self, key: &str) {
        if let Some(el) = self.element_mut(key) {
            el.visible = true;
        }
    }

    /// Set text of a keyed element
    pub fn set_text(&mut self, key: &str, text: impl Into<String>) {
        if let Some(el) = self.element_mut(key) {
            el.text = text.into();
        }
    }

    fn tick_redirect(&mut self) {
        match self.pending_redirect.take() {
            Some((url, 0)) => self.goto(&url),
            Some((url, polls)) => self.pending_redirect = Some((url, polls - 1)),
            None => {}
        }
    }

    fn matching(&self, selector: &Selector) -> AccesoResult<Vec<usize>> {
        let hit: Box<dyn Fn(&MockElement) -> bool> = match selector {
            Selector::Css(css) => {
                let list = parse_selector_list(css)?;
                Box::new(move |el| list.iter().any(|c| c.matches(el)))
            }
            Selector::Text(text) => {
                let needle = text.to_lowercase();
                Box::new(move |el| el.text.to_lowercase().contains(&needle))
            }
            Selector::CssWithText { css, text } => {
                let list = parse_selector_list(css)?;
                let needle = text.to_lowercase();
                Box::new(move |el| {
                    list.iter().any(|c| c.matches(el)) && el.text.to_lowercase().contains(&needle)
                })
            }
            Selector::Role(role) => {
                let mut implicit = Vec::new();
                for css in implicit_role_tags(role) {
                    implicit.extend(parse_selector_list(css)?);
                }
                let role = role.clone();
                Box::new(move |el| {
                    el.get_attr("role") == Some(role.as_str())
                        || implicit.iter().any(|c| c.matches(el))
                })
            }
            Selector::TestId(id) => {
                let id = id.clone();
                Box::new(move |el| el.get_attr("data-testid") == Some(id.as_str()))
            }
            Selector::XPath(_) => {
                return Err(AccesoError::driver(
                    "XPath selectors are not supported by MockDriver",
                ))
            }
        };
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| hit(el))
            .map(|(i, _)| i)
            .collect())
    }

    fn first_match(&self, selector: &Selector) -> AccesoResult<Option<usize>> {
        Ok(self.matching(selector)?.first().copied())
    }

    fn actionable(&self, selector: &Selector) -> AccesoResult<usize> {
        let index = self
            .first_match(selector)?
            .ok_or_else(|| AccesoError::driver(format!("no element matches {selector}")))?;
        if !self.elements[index].is_rendered() {
            return Err(AccesoError::driver(format!("element {selector} is not visible")));
        }
        Ok(index)
    }
}

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("/", |i| &rest[i..]);
    path.split(['?', '#']).next().unwrap_or(path)
}

// =============================================================================
// DRIVER
// =============================================================================

#[derive(Default)]
struct MockState {
    page: MockPage,
    handlers: HashMap<String, ClickHandler>,
    history: Vec<String>,
    network_busy_polls: u32,
    navigation_failure: Option<String>,
}

/// Mock driver for unit testing
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MockDriver")
            .field("page", &state.page)
            .field("handlers", &state.handlers.keys().collect::<Vec<_>>())
            .field("history", &state.history)
            .finish_non_exhaustive()
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the markup served at `path`
    pub fn add_route(&self, path: impl Into<String>, elements: Vec<MockElement>) {
        self.lock().page.set_route(path, elements);
    }

    /// Replace the currently rendered elements
    pub fn set_elements(&self, elements: Vec<MockElement>) {
        self.lock().page.set_elements(elements);
    }

    /// Run `handler` whenever the element keyed `key` is clicked
    pub fn on_click(&self, key: impl Into<String>, handler: ClickHandler) {
        self.lock().handlers.insert(key.into(), handler);
    }

    /// Report network busy for the next `polls` idle checks
    pub fn set_network_busy_polls(&self, polls: u32) {
        self.lock().network_busy_polls = polls;
    }

    /// Fail every subsequent navigation with `message`
    pub fn fail_navigation(&self, message: impl Into<String>) {
        self.lock().navigation_failure = Some(message.into());
    }

    /// Inspect or script the page directly
    pub fn with_page<R>(&self, f: impl FnOnce(&mut MockPage) -> R) -> R {
        f(&mut self.lock().page)
    }

    /// Value of a keyed form field
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.lock().page.value_of(key).map(str::to_string)
    }

    /// Checkbox state of a keyed element
    #[must_use]
    pub fn is_checked(&self, key: &str) -> bool {
        self.lock().page.element(key).is_some_and(MockElement::is_checked)
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&self, url: &str) -> AccesoResult<()> {
        let mut state = self.lock();
        state.history.push(format!("navigate:{url}"));
        if let Some(message) = state.navigation_failure.clone() {
            return Err(AccesoError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        state.page.goto(url);
        Ok(())
    }

    async fn current_url(&self) -> AccesoResult<String> {
        let mut state = self.lock();
        state.page.tick_redirect();
        Ok(state.page.url.clone())
    }

    async fn reload(&self) -> AccesoResult<()> {
        let mut state = self.lock();
        state.history.push("reload".to_string());
        let url = state.page.url.clone();
        state.page.goto(&url);
        Ok(())
    }

    async fn load_state_reached(&self, state: LoadState) -> AccesoResult<bool> {
        if state != LoadState::NetworkIdle {
            return Ok(true);
        }
        let mut guard = self.lock();
        if guard.network_busy_polls > 0 {
            guard.network_busy_polls -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn count(&self, selector: &Selector) -> AccesoResult<usize> {
        Ok(self.lock().page.matching(selector)?.len())
    }

    async fn is_visible(&self, selector: &Selector) -> AccesoResult<bool> {
        let mut state = self.lock();
        let Some(index) = state.page.first_match(selector)? else {
            return Ok(false);
        };
        let el = &mut state.page.elements[index];
        if el.hidden_polls > 0 {
            el.hidden_polls -= 1;
            return Ok(false);
        }
        Ok(el.visible)
    }

    async fn fill(&self, selector: &Selector, text: &str) -> AccesoResult<()> {
        let mut state = self.lock();
        state.history.push(format!("fill:{selector}"));
        let index = state.page.actionable(selector)?;
        state.page.elements[index].value = text.to_string();
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> AccesoResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.history.push(format!("click:{selector}"));
        let index = state.page.actionable(selector)?;
        let el = &mut state.page.elements[index];
        if el.is_checkbox() {
            el.checked = !el.checked;
        }
        let handler = el
            .key
            .as_ref()
            .and_then(|key| state.handlers.get(key))
            .cloned();
        if let Some(handler) = handler {
            handler(&mut state.page);
        }
        Ok(())
    }

    async fn check(&self, selector: &Selector) -> AccesoResult<()> {
        let mut state = self.lock();
        state.history.push(format!("check:{selector}"));
        let index = state.page.actionable(selector)?;
        state.page.elements[index].checked = true;
        Ok(())
    }

    async fn text_content(&self, selector: &Selector) -> AccesoResult<Option<String>> {
        let state = self.lock();
        Ok(state
            .page
            .first_match(selector)?
            .map(|i| state.page.elements[i].text.clone()))
    }

    async fn close(&self) -> AccesoResult<()> {
        self.lock().history.push("close".to_string());
        Ok(())
    }
}

// =============================================================================
// SIMULATED LOGIN APPLICATION
// =============================================================================

/// Which markup the simulated application serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMarkup {
    /// `name` attributes, submit button, `.error`, user menu
    #[default]
    Standard,
    /// email/id attributes, "Sign in" button, `role="alert"`, no user menu
    Alternate,
}

/// A login/dashboard application served by a [`MockDriver`].
///
/// Valid accounts redirect to `/dashboard`; anything else reveals an error.
#[derive(Debug, Clone)]
pub struct MockLoginApp {
    base_url: String,
    accounts: Vec<(String, String)>,
    markup: LoginMarkup,
    redirect_polls: u32,
}

impl MockLoginApp {
    /// Application rooted at `base_url`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            accounts: Vec::new(),
            markup: LoginMarkup::default(),
            redirect_polls: 0,
        }
    }

    /// Accept `username` / `password`
    #[must_use]
    pub fn with_account(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.push((username.into(), password.into()));
        self
    }

    /// Serve `markup`
    #[must_use]
    pub const fn with_markup(mut self, markup: LoginMarkup) -> Self {
        self.markup = markup;
        self
    }

    /// Delay the post-login redirect by `polls` URL reads
    #[must_use]
    pub const fn with_redirect_delay(mut self, polls: u32) -> Self {
        self.redirect_polls = polls;
        self
    }

    /// Fresh driver serving this application
    #[must_use]
    pub fn driver(&self) -> MockDriver {
        let driver = MockDriver::new();
        self.install(&driver);
        driver
    }

    /// Register routes and click handlers on `driver`
    pub fn install(&self, driver: &MockDriver) {
        driver.add_route("/login", self.login_markup());
        driver.add_route(
            "/forgot-password",
            vec![MockElement::new("h1").text("Reset your password")],
        );

        let app = self.clone();
        driver.on_click("submit", Arc::new(move |page: &mut MockPage| app.submit(page)));

        let login_url = self.url("/login");
        driver.on_click(
            "logout",
            Arc::new(move |page: &mut MockPage| page.goto(&login_url)),
        );

        let forgot_url = self.url("/forgot-password");
        driver.on_click(
            "forgot",
            Arc::new(move |page: &mut MockPage| page.goto(&forgot_url)),
        );

        driver.on_click(
            "user-menu",
            Arc::new(|page: &mut MockPage| page.show("logout")),
        );
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn submit(&self, page: &mut MockPage) {
        let username = page.value_of("username").unwrap_or_default().to_string();
        let password = page.value_of("password").unwrap_or_default().to_string();

        let error = if username.is_empty() {
            Some("Username is required")
        } else if password.is_empty() {
            Some("Password is required")
        } else if self
            .accounts
            .iter()
            .any(|(u, p)| *u == username && *p == password)
        {
            None
        } else {
            Some("Invalid username or password")
        };

        match error {
            Some(message) => {
                page.set_text("error", message);
                page.show("error");
            }
            None => {
                page.set_route("/dashboard", self.dashboard_markup(&username));
                let target = self.url("/dashboard");
                if self.redirect_polls == 0 {
                    page.goto(&target);
                } else {
                    page.redirect_after(target, self.redirect_polls);
                }
            }
        }
    }

    fn login_markup(&self) -> Vec<MockElement> {
        match self.markup {
            LoginMarkup::Standard => vec![
                MockElement::new("h1").text("Log in to your account"),
                MockElement::new("input")
                    .attr("name", "username")
                    .attr("type", "text")
                    .key("username"),
                MockElement::new("input")
                    .attr("name", "password")
                    .attr("type", "password")
                    .key("password"),
                MockElement::new("input")
                    .attr("type", "checkbox")
                    .attr("name", "remember-me")
                    .key("remember"),
                MockElement::new("button")
                    .attr("type", "submit")
                    .text("Log in")
                    .key("submit"),
                MockElement::new("div").class("error").hidden().key("error"),
                MockElement::new("a")
                    .attr("href", "/forgot-password")
                    .text("Forgot password?")
                    .key("forgot"),
            ],
            LoginMarkup::Alternate => vec![
                MockElement::new("input")
                    .attr("type", "email")
                    .attr("id", "user-email")
                    .key("username"),
                MockElement::new("input")
                    .attr("type", "password")
                    .attr("id", "user-password")
                    .key("password"),
                MockElement::new("button")
                    .attr("type", "button")
                    .text("Sign in")
                    .key("submit"),
                MockElement::new("div").attr("role", "alert").hidden().key("error"),
                MockElement::new("a")
                    .attr("href", "/forgot-password")
                    .text("Forgot your password?")
                    .key("forgot"),
            ],
        }
    }

    fn dashboard_markup(&self, username: &str) -> Vec<MockElement> {
        match self.markup {
            LoginMarkup::Standard => vec![
                MockElement::new("nav").key("nav").text("Overview Reports Settings"),
                MockElement::new("h1")
                    .class("welcome")
                    .text(format!("Welcome, {username}"))
                    .key("welcome"),
                MockElement::new("div")
                    .attr("data-testid", "dashboard-title")
                    .text("Dashboard")
                    .key("title"),
                MockElement::new("button")
                    .attr("data-testid", "user-menu")
                    .text("Account")
                    .key("user-menu"),
                MockElement::new("button").text("Logout").hidden().key("logout"),
            ],
            LoginMarkup::Alternate => vec![
                MockElement::new("div").attr("role", "navigation").key("nav"),
                MockElement::new("h2")
                    .text(format!("Welcome back, {username}"))
                    .key("welcome"),
                MockElement::new("div")
                    .attr("data-testid", "dashboard-title")
                    .text("Home")
                    .key("title"),
                MockElement::new("a")
                    .attr("href", "/logout")
                    .text("Logout")
                    .key("logout"),
            ],
        }
    }
}

// =============================================================================
// COMPOUND CSS MATCHING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Class(String),
    Id(String),
    Attr {
        name: String,
        op: AttrOp,
        value: String,
    },
    Not(Box<Compound>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches(&self, el: &MockElement) -> bool {
        if self.tag.as_deref().is_some_and(|t| t != el.tag) {
            return false;
        }
        self.conditions.iter().all(|c| c.matches(el))
    }
}

impl Condition {
    fn matches(&self, el: &MockElement) -> bool {
        match self {
            Self::Class(class) => el
                .get_attr("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
            Self::Id(id) => el.get_attr("id") == Some(id.as_str()),
            Self::Attr { name, op, value } => el.get_attr(name).is_some_and(|v| match op {
                AttrOp::Exists => true,
                AttrOp::Equals => v == value,
                AttrOp::Contains => v.contains(value.as_str()),
                AttrOp::Prefix => v.starts_with(value.as_str()),
                AttrOp::Suffix => v.ends_with(value.as_str()),
                AttrOp::Word => v.split_whitespace().any(|w| w == value),
            }),
            Self::Not(inner) => !inner.matches(el),
        }
    }
}

struct CssParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

fn parse_selector_list(css: &str) -> AccesoResult<Vec<Compound>> {
    let mut parser = CssParser {
        source: css,
        chars: css.chars().collect(),
        pos: 0,
    };
    let mut list = Vec::new();
    loop {
        parser.skip_ws();
        list.push(parser.compound()?);
        parser.skip_ws();
        match parser.peek() {
            None => return Ok(list),
            Some(',') => parser.pos += 1,
            Some(_) => return Err(parser.unsupported()),
        }
    }
}

impl CssParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> AccesoResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }

    fn unsupported(&self) -> AccesoError {
        AccesoError::driver(format!(
            "MockDriver cannot evaluate selector {:?} (at offset {})",
            self.source, self.pos
        ))
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn required_ident(&mut self) -> AccesoResult<String> {
        let ident = self.ident();
        if ident.is_empty() {
            Err(self.unsupported())
        } else {
            Ok(ident)
        }
    }

    fn compound(&mut self) -> AccesoResult<Compound> {
        let start = self.pos;
        let mut compound = Compound::default();
        let tag = self.ident();
        if !tag.is_empty() {
            compound.tag = Some(tag.to_lowercase());
        } else if self.peek() == Some('*') {
            self.pos += 1;
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Class(self.required_ident()?));
                }
                '#' => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Id(self.required_ident()?));
                }
                '[' => {
                    self.pos += 1;
                    compound.conditions.push(self.attribute()?);
                }
                ':' => {
                    self.pos += 1;
                    if self.ident() != "not" {
                        return Err(self.unsupported());
                    }
                    self.eat('(')?;
                    self.skip_ws();
                    let inner = self.compound()?;
                    self.skip_ws();
                    self.eat(')')?;
                    compound.conditions.push(Condition::Not(Box::new(inner)));
                }
                c if c.is_whitespace() || c == ',' || c == ')' => break,
                _ => return Err(self.unsupported()),
            }
        }

        if self.pos == start {
            return Err(self.unsupported());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> AccesoResult<Condition> {
        self.skip_ws();
        let name = self.required_ident()?;
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(Condition::Attr {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => AttrOp::Equals,
            Some('*') => AttrOp::Contains,
            Some('^') => AttrOp::Prefix,
            Some('$') => AttrOp::Suffix,
            Some('~') => AttrOp::Word,
            _ => return Err(self.unsupported()),
        };
        self.pos += 1;
        if op != AttrOp::Equals {
            self.eat('=')?;
        }
        self.skip_ws();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.unsupported()),
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some('\\') => {
                            self.pos += 1;
                            if let Some(escaped) = self.peek() {
                                value.push(escaped);
                                self.pos += 1;
                            }
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                value
            }
            _ => self.required_ident()?,
        };

        self.skip_ws();
        self.eat(']')?;
        Ok(Condition::Attr { name, op, value })
    }
}
