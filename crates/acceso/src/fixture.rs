//! Test fixtures.
//!
//! A [`Fixture`] produces a resource in `setup` and releases it in
//! `teardown`. [`scoped`] runs a test body between the two and tears down
//! even when the body fails or panics.
//!
//! The one fixture shipped here is the authenticated session: log in through
//! the UI, wait for the post-login redirect, and hand the test a page context
//! that is already signed in.
//!
//! ```ignore
//! let fixture = AuthenticatedSessionFixture::new(ctx, settings.credentials());
//! scoped(fixture, |session| async move {
//!     session.dashboard_page().verify_welcome_message(None).await
//! })
//! .await?;
//! ```

use crate::config::{Credentials, Settings};
use crate::driver::PageDriver;
use crate::page::dashboard::AUTHENTICATED_URLS;
use crate::page::{DashboardPage, LoginPage, PageContext};
use crate::result::{AccesoError, AccesoResult};
use crate::wait::UrlPattern;
use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Fixture name used in setup and teardown errors
pub const SESSION_FIXTURE: &str = "authenticated session";

/// A resource with a setup and a teardown step.
#[async_trait]
pub trait Fixture: Send {
    /// What setup hands to the test body
    type Resource: Send + Sync;

    /// Set up the fixture before test execution.
    async fn setup(&mut self) -> AccesoResult<Self::Resource>;

    /// Tear down the fixture after test execution.
    async fn teardown(&mut self, resource: Self::Resource) -> AccesoResult<()>;

    /// Get the fixture name for logging/debugging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Lifecycle of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureState {
    /// Created but not set up.
    #[default]
    Registered,
    /// Set up successfully.
    SetUp,
    /// Torn down.
    TornDown,
    /// Setup failed.
    Failed,
}

/// Progress of a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Credentials not yet submitted
    #[default]
    Unauthenticated,
    /// Submitted; waiting for the redirect
    AwaitingRedirect,
    /// Landed on `dashboard|home`
    Authenticated,
}

impl SessionState {
    /// Next state in the login sequence; `Authenticated` is terminal.
    #[must_use]
    pub const fn advance(self) -> Self {
        match self {
            Self::Unauthenticated => Self::AwaitingRedirect,
            Self::AwaitingRedirect | Self::Authenticated => Self::Authenticated,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingRedirect => "awaiting redirect",
            Self::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// What to do with the session after the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// Nothing; the owner of the browser context discards it.
    #[default]
    Delegate,
    /// Log out through the dashboard.
    Logout,
}

/// A signed-in page context with its page objects
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    ctx: PageContext,
    login: LoginPage,
    dashboard: DashboardPage,
    username: String,
    state: SessionState,
}

impl AuthenticatedSession {
    /// Log in through the UI and wait for the dashboard.
    ///
    /// Any failure is reported as [`AccesoError::SetupFailed`] wrapping the
    /// step that failed.
    pub async fn establish(ctx: PageContext, credentials: &Credentials) -> AccesoResult<Self> {
        let login = LoginPage::new(ctx.clone());
        let dashboard = DashboardPage::new(ctx.clone());
        let mut state = SessionState::Unauthenticated;

        let outcome = async {
            login.goto().await?;
            login.login_as(credentials).await?;
            state = state.advance();
            tracing::info!(username = %credentials.username, %state, "credentials submitted");

            ctx.wait_for_url(&UrlPattern::any_of(AUTHENTICATED_URLS), ctx.navigation_timeout_ms())
                .await?;
            state = state.advance();
            Ok::<_, AccesoError>(())
        }
        .await;

        if let Err(e) = outcome {
            tracing::warn!(%state, error = %e, "session setup failed");
            return Err(AccesoError::setup(SESSION_FIXTURE, e));
        }

        tracing::info!(username = %credentials.username, %state, "session established");
        Ok(Self {
            ctx,
            login,
            dashboard,
            username: credentials.username.clone(),
            state,
        })
    }

    /// The shared page context
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// The driver behind the session
    #[must_use]
    pub fn driver(&self) -> Arc<dyn PageDriver> {
        self.ctx.shared_driver()
    }

    /// Login page bound to this session's context
    #[must_use]
    pub const fn login_page(&self) -> &LoginPage {
        &self.login
    }

    /// Dashboard page bound to this session's context
    #[must_use]
    pub const fn dashboard_page(&self) -> &DashboardPage {
        &self.dashboard
    }

    /// Who is signed in
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Always `Authenticated` for an established session
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Release the session according to `policy`.
    pub async fn teardown(self, policy: TeardownPolicy) -> AccesoResult<()> {
        match policy {
            TeardownPolicy::Delegate => Ok(()),
            TeardownPolicy::Logout => {
                self.dashboard
                    .logout()
                    .await
                    .map_err(|e| AccesoError::TeardownFailed {
                        fixture: SESSION_FIXTURE.to_string(),
                        message: e.to_string(),
                    })
            }
        }
    }
}

/// [`Fixture`] producing an [`AuthenticatedSession`]
#[derive(Debug)]
pub struct AuthenticatedSessionFixture {
    ctx: PageContext,
    credentials: Credentials,
    policy: TeardownPolicy,
    state: FixtureState,
}

impl AuthenticatedSessionFixture {
    /// Log in as `credentials` on `ctx`
    #[must_use]
    pub fn new(ctx: PageContext, credentials: Credentials) -> Self {
        Self {
            ctx,
            credentials,
            policy: TeardownPolicy::default(),
            state: FixtureState::Registered,
        }
    }

    /// Log in with the profile's credentials on its web application
    #[must_use]
    pub fn from_settings(driver: Arc<dyn PageDriver>, settings: &Settings) -> Self {
        Self::new(PageContext::new(driver, settings), settings.credentials())
    }

    /// Choose what happens at teardown
    #[must_use]
    pub const fn with_teardown(mut self, policy: TeardownPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> FixtureState {
        self.state
    }
}

#[async_trait]
impl Fixture for AuthenticatedSessionFixture {
    type Resource = AuthenticatedSession;

    async fn setup(&mut self) -> AccesoResult<AuthenticatedSession> {
        match AuthenticatedSession::establish(self.ctx.clone(), &self.credentials).await {
            Ok(session) => {
                self.state = FixtureState::SetUp;
                Ok(session)
            }
            Err(e) => {
                self.state = FixtureState::Failed;
                Err(e)
            }
        }
    }

    async fn teardown(&mut self, session: AuthenticatedSession) -> AccesoResult<()> {
        let result = session.teardown(self.policy).await;
        self.state = FixtureState::TornDown;
        result
    }

    fn name(&self) -> &str {
        SESSION_FIXTURE
    }
}

/// Set up `fixture`, run `body` with a clone of the resource, tear down.
///
/// Teardown runs whenever setup succeeded, including after a panic in
/// `body` (which is then resumed). When both the body and teardown fail the
/// body's error is returned and the teardown error is logged.
pub async fn scoped<F, B, Fut, T>(mut fixture: F, body: B) -> AccesoResult<T>
where
    F: Fixture,
    F::Resource: Clone,
    B: FnOnce(F::Resource) -> Fut,
    Fut: Future<Output = AccesoResult<T>>,
{
    let resource = fixture.setup().await?;
    let outcome = AssertUnwindSafe(body(resource.clone())).catch_unwind().await;
    let teardown = fixture.teardown(resource).await;

    match (outcome, teardown) {
        (Err(panic), teardown) => {
            if let Err(e) = teardown {
                tracing::warn!(fixture = fixture.name(), error = %e, "teardown failed after panic");
            }
            std::panic::resume_unwind(panic)
        }
        (Ok(Ok(value)), Ok(())) => Ok(value),
        (Ok(Ok(_)), Err(e)) => Err(e),
        (Ok(Err(e)), Ok(())) => Err(e),
        (Ok(Err(e)), Err(teardown_error)) => {
            tracing::warn!(fixture = fixture.name(), error = %teardown_error, "teardown failed");
            Err(e)
        }
    }
}
