//! JSON-driven test data.
//!
//! A fixture file holds two ordered lists of user records:
//!
//! ```json
//! {
//!   "validUsers":   [{ "username": "...", "password": "...", "expectedRole": "admin" }],
//!   "invalidUsers": [{ "username": "...", "password": "...", "expectedError": "Invalid" }]
//! }
//! ```
//!
//! Nothing is cached: every [`TestDataLoader::load`] re-reads the file, so a
//! test always sees what is on disk.

use crate::result::{AccesoError, AccesoResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixture file read when no name is given.
pub const DEFAULT_FIXTURE: &str = "users.json";

/// One user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Username or email; may be empty for negative cases
    pub username: String,
    /// Password; may be empty for negative cases
    pub password: String,
    /// Role the account is expected to have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_role: Option<String>,
    /// Error text the login form is expected to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
}

impl UserRecord {
    /// Label for generated test names; empty usernames read as `empty`.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.username.is_empty() {
            "empty"
        } else {
            &self.username
        }
    }
}

/// Valid and invalid user records, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDataSet {
    /// Records that must authenticate
    pub valid_users: Vec<UserRecord>,
    /// Records that must be rejected
    pub invalid_users: Vec<UserRecord>,
}

impl TestDataSet {
    /// Valid record at `index`.
    pub fn pick_valid(&self, index: usize) -> AccesoResult<&UserRecord> {
        pick(&self.valid_users, "valid", index)
    }

    /// Invalid record at `index`.
    pub fn pick_invalid(&self, index: usize) -> AccesoResult<&UserRecord> {
        pick(&self.invalid_users, "invalid", index)
    }

    /// Uniformly random valid record, drawn from a fresh thread RNG.
    ///
    /// Not reproducible across runs; use [`Self::pick_random_valid_with`]
    /// with a seeded RNG when that matters.
    pub fn pick_random_valid(&self) -> AccesoResult<&UserRecord> {
        self.pick_random_valid_with(&mut rand::thread_rng())
    }

    /// Uniformly random valid record drawn from `rng`.
    pub fn pick_random_valid_with<R: Rng>(&self, rng: &mut R) -> AccesoResult<&UserRecord> {
        if self.valid_users.is_empty() {
            return Err(AccesoError::IndexOutOfRange {
                set: "valid",
                index: 0,
                len: 0,
            });
        }
        let index = rng.gen_range(0..self.valid_users.len());
        self.pick_valid(index)
    }
}

fn pick<'a>(
    users: &'a [UserRecord],
    set: &'static str,
    index: usize,
) -> AccesoResult<&'a UserRecord> {
    users.get(index).ok_or(AccesoError::IndexOutOfRange {
        set,
        index,
        len: users.len(),
    })
}

/// Reads fixture files from a directory.
#[derive(Debug, Clone)]
pub struct TestDataLoader {
    root: PathBuf,
}

impl Default for TestDataLoader {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl TestDataLoader {
    /// Loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The crate's bundled `test-data` directory.
    #[must_use]
    pub fn default_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
    }

    /// Directory this loader reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and parse `name` from the root directory.
    pub fn load(&self, name: &str) -> AccesoResult<TestDataSet> {
        let path = self.root.join(name);
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AccesoError::NotFound {
                    path: shown.clone(),
                }
            } else {
                AccesoError::Io(e)
            }
        })?;

        let data: TestDataSet =
            serde_json::from_str(&content).map_err(|e| AccesoError::Parse {
                path: shown.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            file = %shown,
            valid = data.valid_users.len(),
            invalid = data.invalid_users.len(),
            "loaded test data"
        );
        Ok(data)
    }

    /// Read the default fixture file.
    pub fn load_default(&self) -> AccesoResult<TestDataSet> {
        self.load(DEFAULT_FIXTURE)
    }

    /// Re-read `name` and return its valid record at `index`.
    pub fn valid_user(&self, name: &str, index: usize) -> AccesoResult<UserRecord> {
        self.load(name)?.pick_valid(index).cloned()
    }

    /// Re-read `name` and return its invalid record at `index`.
    pub fn invalid_user(&self, name: &str, index: usize) -> AccesoResult<UserRecord> {
        self.load(name)?.pick_invalid(index).cloned()
    }

    /// Re-read `name` and return a random valid record.
    pub fn random_valid_user(&self, name: &str) -> AccesoResult<UserRecord> {
        self.load(name)?.pick_random_valid().cloned()
    }
}
