/// Produces a value of type `T`, abstracting over where that value comes from (the wall clock,
/// a CSPRNG, a fixed test vector). Passed by reference wherever the core needs "the current
/// time" or "a fresh identifier" so that tests can substitute deterministic generators.
pub trait Generator<T> {
    fn generate(&self) -> T;
}

/// The default, non-deterministic [`Generator`] for the current UTC time.
pub struct TimeGenerator;

impl Generator<chrono::DateTime<chrono::Utc>> for TimeGenerator {
    fn generate(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}

/// The default, non-deterministic [`Generator`] for a fresh v4 UUID, used as identifiers for
/// documents and credentials.
pub struct UuidGenerator;

impl Generator<uuid::Uuid> for UuidGenerator {
    fn generate(&self) -> uuid::Uuid {
        uuid::Uuid::new_v4()
    }
}

#[cfg(any(test, feature = "mock_time"))]
pub mod mock {
    use chrono::DateTime;
    use chrono::Utc;
    use parking_lot::Mutex;

    use super::Generator;

    /// A [`Generator`] of the current time whose value can be moved forward by tests, used to
    /// exercise credential validity-interval and reader-message-timeout logic deterministically.
    pub struct MockTimeGenerator {
        time: Mutex<DateTime<Utc>>,
    }

    impl MockTimeGenerator {
        pub fn new(time: DateTime<Utc>) -> Self {
            Self { time: Mutex::new(time) }
        }

        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock() = time;
        }
    }

    impl Default for MockTimeGenerator {
        fn default() -> Self {
            Self::new(Utc::now())
        }
    }

    impl Generator<DateTime<Utc>> for MockTimeGenerator {
        fn generate(&self) -> DateTime<Utc> {
            *self.time.lock()
        }
    }
}
