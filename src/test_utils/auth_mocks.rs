//! In-memory identity store, manual clock and token issuer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::json;

use crate::{
    app_error::{AppError, AppResult},
    application::{ports::clock::Clock, use_cases::identity::PrincipalRepo},
    domain::entities::principal::Principal,
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-with-enough-entropy";
pub const TEST_AUDIENCE: &str = "authenticated";

pub fn test_secret() -> SecretString {
    SecretString::new(TEST_JWT_SECRET.into())
}

/// Sign an HS256 token the way the identity provider does.
pub fn issue_test_token(sub: &str, email: Option<&str>, aud: &str, exp: i64) -> String {
    let claims = json!({
        "sub": sub,
        "email": email.unwrap_or_default(),
        "aud": aud,
        "exp": exp,
        "role": "authenticated",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

// ============================================================================
// ManualClock
// ============================================================================

/// Clock that only moves when told to. Every instance starts at the same instant.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// InMemoryPrincipalRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPrincipalRepo {
    pub principals: Mutex<HashMap<String, Principal>>,
    find_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    hidden: Mutex<Option<Principal>>,
    fail_lookup: AtomicBool,
}

impl InMemoryPrincipalRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principals(principals: Vec<Principal>) -> Self {
        let repo = Self::default();
        *repo.principals.lock().unwrap() = principals
            .into_iter()
            .map(|p| (p.subject_id.clone(), p))
            .collect();
        repo
    }

    pub fn count(&self) -> usize {
        self.principals.lock().unwrap().len()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// The next lookup misses, and `principal` is committed right after it,
    /// as if a concurrent request had won the insert.
    pub fn hide_next_lookup(&self, principal: Principal) {
        *self.hidden.lock().unwrap() = Some(principal);
    }

    pub fn fail_next_lookup(&self) {
        self.fail_lookup.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PrincipalRepo for InMemoryPrincipalRepo {
    async fn find_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Principal>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database("lookup failed".into()));
        }
        if let Some(hidden) = self.hidden.lock().unwrap().take() {
            self.principals
                .lock()
                .unwrap()
                .insert(hidden.subject_id.clone(), hidden);
            return Ok(None);
        }
        Ok(self.principals.lock().unwrap().get(subject_id).cloned())
    }

    async fn insert(&self, principal: &Principal) -> AppResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut principals = self.principals.lock().unwrap();
        if principals.contains_key(&principal.subject_id) {
            return Err(AppError::UniqueConstraintViolation);
        }
        principals.insert(principal.subject_id.clone(), principal.clone());
        Ok(())
    }

    async fn delete_by_id(&self, subject_id: &str) -> AppResult<bool> {
        Ok(self.principals.lock().unwrap().remove(subject_id).is_some())
    }
}
