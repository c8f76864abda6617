//! Test collaborators shared by the integration tests.

#![allow(dead_code)]

use dbcache::DataSource;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Example record served by [`FakeDataSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub age: u32,
}

impl User {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let name: String = (0..12).map(|_| rng.sample(Alphanumeric) as char).collect();
        User {
            name,
            age: rng.gen_range(0..100),
        }
    }
}

/// An in-memory user table that counts how often it is asked.
///
/// Keys are `"0"`, `"1"`, ... `"{n-1}"`.
pub struct FakeDataSource {
    users: HashMap<String, User>,
    access_count: AtomicUsize,
    should_fail: bool,
    latency: Duration,
}

impl FakeDataSource {
    pub fn new(user_amount: usize, should_fail: bool) -> Self {
        let users = (0..user_amount)
            .map(|i| (i.to_string(), User::random()))
            .collect();
        FakeDataSource {
            users,
            access_count: AtomicUsize::new(0),
            should_fail,
            latency: Duration::ZERO,
        }
    }

    /// Makes every lookup sleep for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn access_count(&self) -> usize {
        self.access_count.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    pub fn user(&self, key: &str) -> Option<&User> {
        self.users.get(key)
    }

    pub fn users(&self) -> impl Iterator<Item = (&String, &User)> {
        self.users.iter()
    }
}

impl DataSource<String, User> for FakeDataSource {
    type Error = String;

    fn get(&self, key: &String) -> Result<Option<User>, String> {
        self.access_count.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        if self.should_fail {
            return Err("simulated source error".to_string());
        }
        Ok(self.users.get(key).cloned())
    }
}

/// Installs a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
