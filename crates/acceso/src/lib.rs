//! Acceso: page objects, resilient locators and fixtures for login-flow and
//! users-API test suites.
//!
//! Browser tests talk to the page through the [`PageDriver`] trait. Each page
//! object owns a [`LocatorSet`] of named fallback chains, so the same test runs
//! against several markup variants of the application. API tests use the
//! bearer-authenticated [`ApiClient`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ACCESO Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Test Data  │    │ Page       │    │ PageDriver │            │
//! │   │ + Settings │───►│ Objects +  │───►│ (chromium  │            │
//! │   │            │    │ Fixtures   │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │          │                                                       │
//! │          │          ┌────────────┐    ┌────────────┐            │
//! │          └─────────►│ ApiClient  │───►│ Users API  │            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use acceso::prelude::*;
//!
//! let settings = Settings::from_env()?;
//! let driver = Arc::new(ChromiumDriver::launch(DriverConfig::default()).await?);
//! let login = LoginPage::new(PageContext::new(driver, &settings));
//! login.goto().await?;
//! login.login_as(&settings.credentials()).await?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Error taxonomy shared by every module
mod result;

/// Environment profiles and credentials
pub mod config;

/// Subscriber setup for test binaries
pub mod logging;

/// Fixture users loaded from JSON
pub mod data;

/// Bounded polling, URL patterns and load states
pub mod wait;

/// Selectors and named fallback chains
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod locator;

/// Browser abstraction and the in-process mock
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod driver;

/// Chromium over CDP
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
pub mod browser;

/// Page objects for the login flow
pub mod page;

/// Bearer-authenticated HTTP client for the users API
pub mod api;

/// Authenticated-session fixture
pub mod fixture;

pub use api::{
    users::{ApiErrorBody, NewUser, User, UserId, UserListing, UserUpdate},
    ApiClient, ApiConfig, ApiResponse, UsersApi,
};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::{Credentials, Settings};
pub use data::{TestDataLoader, TestDataSet, UserRecord};
pub use driver::{DriverConfig, MockDriver, MockLoginApp, PageDriver};
pub use fixture::{
    scoped, AuthenticatedSession, AuthenticatedSessionFixture, Fixture, FixtureState,
    SessionState, TeardownPolicy,
};
pub use locator::{LocatorChain, LocatorOptions, LocatorSet, Selector};
pub use page::{DashboardPage, LoginPage, PageContext, PageObject};
pub use result::{AccesoError, AccesoResult, FailureKind};
pub use secrecy::{ExposeSecret, SecretString};
pub use wait::{LoadState, UrlPattern, WaitOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::api::users::*;
    pub use super::api::*;
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::data::*;
    pub use super::driver::*;
    pub use super::fixture::*;
    pub use super::locator::*;
    pub use super::page::*;
    pub use super::result::*;
    pub use super::wait::*;
    pub use secrecy::{ExposeSecret, SecretString};
    pub use std::sync::Arc;
}
