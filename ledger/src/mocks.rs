//! Mock collaborators and fixtures for tests and demos.

use crate::classifier::{Classifier, ClassifierError, ImageFrame};
use crate::identity::{AuthUser, IdentityError, IdentityProvider, ProfileDefaults};
use crate::ledger::TimeSource;
use crate::state::Adb;
use commonware_runtime::{buffer::PoolRef, Clock, Metrics, Spawner, Storage};
use commonware_storage::{adb, translator::EightCap};
use commonware_utils::{NZUsize, NZU64};
use greenloop_types::{confidence_to_bps, Classification, Guess, UserId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

/// Creates a state database for testing, mirroring the node's production
/// configuration at test-friendly sizes.
pub async fn create_adb<E: Spawner + Metrics + Storage + Clock>(context: &E) -> Adb<E, EightCap> {
    let buffer_pool = PoolRef::new(NZUsize!(1024), NZUsize!(1024));

    Adb::init(
        context.with_label("state"),
        adb::any::variable::Config {
            mmr_journal_partition: String::from("state-mmr-journal"),
            mmr_metadata_partition: String::from("state-mmr-metadata"),
            mmr_items_per_blob: NZU64!(1024),
            mmr_write_buffer: NZUsize!(1024),
            log_journal_partition: String::from("state-log-journal"),
            log_items_per_section: NZU64!(1024),
            log_write_buffer: NZUsize!(1024),
            log_compression: None,
            log_codec_config: (),
            locations_journal_partition: String::from("state-locations-journal"),
            locations_items_per_blob: NZU64!(1024),
            translator: EightCap,
            thread_pool: None,
            buffer_pool,
        },
    )
    .await
    .expect("failed to initialize state adb")
}

/// Deterministic test user id.
pub fn test_user(seed: u64) -> UserId {
    UserId::new(format!("uid-{seed:04}"))
}

/// A single-guess classification for driving confirmations directly.
pub fn classification(label: &str, confidence: f32) -> Classification {
    Classification::new(vec![Guess {
        label: label.to_string(),
        confidence_bps: confidence_to_bps(confidence),
    }])
}

/// Profile defaults for a test account.
pub fn defaults(name: &str) -> ProfileDefaults {
    ProfileDefaults {
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

/// Manually advanced time source for deterministic timestamps.
#[derive(Default)]
pub struct ManualTime {
    now_ms: AtomicU64,
}

impl ManualTime {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

struct MockCredentials {
    password: String,
    user: AuthUser,
}

/// In-memory identity provider issuing sequential stable user ids.
pub struct MockIdentity {
    users: Mutex<HashMap<String, MockCredentials>>,
    next_uid: AtomicU64,
    state: watch::Sender<Option<AuthUser>>,
}

impl Default for MockIdentity {
    fn default() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            next_uid: AtomicU64::new(1),
            state,
        }
    }
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for MockIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let mut users = self.users.lock().expect("identity lock poisoned");
        if users.contains_key(email) {
            return Err(IdentityError::EmailInUse);
        }

        let uid = self.next_uid.fetch_add(1, Ordering::SeqCst);
        let user = AuthUser {
            user_id: UserId::new(format!("uid-{uid:08x}")),
            display_name: display_name.to_string(),
            email: email.to_string(),
        };
        users.insert(
            email.to_string(),
            MockCredentials {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        let _ = self.state.send(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let users = self.users.lock().expect("identity lock poisoned");
        let Some(credentials) = users.get(email) else {
            return Err(IdentityError::InvalidCredentials);
        };
        if credentials.password != password {
            return Err(IdentityError::InvalidCredentials);
        }
        let _ = self.state.send(Some(credentials.user.clone()));
        Ok(credentials.user.clone())
    }

    async fn sign_out(&self) {
        let _ = self.state.send(None);
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}

const MOCK_LABELS: [&str; 6] = [
    "plastic bottle",
    "aluminum can",
    "glass jar",
    "cardboard box",
    "paper bag",
    "steel tin",
];

/// Classifier returning ranked guesses derived deterministically from the
/// frame contents.
#[derive(Default)]
pub struct MockClassifier;

impl Classifier for MockClassifier {
    async fn classify(&self, frame: &ImageFrame) -> Result<Classification, ClassifierError> {
        if frame.bytes.is_empty() {
            return Err(ClassifierError::EmptyFrame);
        }

        let seed = frame
            .bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u64));
        let mut rng = StdRng::seed_from_u64(seed);

        let top = rng.gen_range(0..MOCK_LABELS.len());
        let runner_up = (top + 1 + rng.gen_range(0..MOCK_LABELS.len() - 1)) % MOCK_LABELS.len();
        let top_bps: u16 = rng.gen_range(6_000..9_800);
        let runner_up_bps = rng.gen_range(100..(10_000 - top_bps).max(101));

        Ok(Classification::new(vec![
            Guess {
                label: MOCK_LABELS[top].to_string(),
                confidence_bps: top_bps,
            },
            Guess {
                label: MOCK_LABELS[runner_up].to_string(),
                confidence_bps: runner_up_bps,
            },
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_identity_full_session_flow() {
        let identity = MockIdentity::new();
        let mut auth = identity.auth_state();
        assert!(auth.borrow().is_none());

        let user = identity
            .sign_up("alice@example.com", "hunter22", "Alice")
            .await
            .unwrap();
        assert_eq!(auth.borrow_and_update().as_ref(), Some(&user));

        assert_eq!(
            identity
                .sign_up("alice@example.com", "other", "Alice2")
                .await,
            Err(IdentityError::EmailInUse)
        );
        assert_eq!(
            identity.sign_in("alice@example.com", "wrong").await,
            Err(IdentityError::InvalidCredentials)
        );

        identity.sign_out().await;
        assert!(auth.borrow_and_update().is_none());

        let again = identity
            .sign_in("alice@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(again.user_id, user.user_id);
    }

    #[tokio::test]
    async fn mock_classifier_is_deterministic_per_frame() {
        let classifier = MockClassifier;
        let frame = ImageFrame {
            width: 4,
            height: 4,
            bytes: vec![1, 2, 3, 4],
        };

        let first = classifier.classify(&frame).await.unwrap();
        let second = classifier.classify(&frame).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert!(first.top().unwrap().confidence_bps <= 10_000);

        let empty = ImageFrame {
            width: 0,
            height: 0,
            bytes: Vec::new(),
        };
        assert_eq!(
            classifier.classify(&empty).await,
            Err(ClassifierError::EmptyFrame)
        );
    }
}
