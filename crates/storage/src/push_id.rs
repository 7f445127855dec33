//! Chronologically ordered child keys for queue appends.
//!
//! A push id is 20 characters: 8 encode the creation time in milliseconds,
//! 12 are random. Ids minted within the same millisecond reuse the random
//! part incremented by one, so ids from one generator sort strictly in
//! creation order.

use std::sync::{Mutex, PoisonError};

use rand::Rng;

/// Alphabet in ascending ASCII order so that ids compare lexically.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Thread-safe push id source.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

#[derive(Debug, Default)]
struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an id stamped with the current wall-clock time.
    pub fn next_id(&self) -> String {
        self.next_id_at(now_millis())
    }

    /// Mint an id stamped with `millis` since the Unix epoch.
    pub fn next_id_at(&self, millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if millis == state.last_millis {
            increment(&mut state.last_random);
        } else {
            state.last_millis = millis;
            let mut rng = rand::thread_rng();
            for digit in state.last_random.iter_mut() {
                *digit = rng.gen_range(0..PUSH_CHARS.len() as u8);
            }
        }

        let mut time_part = [0u8; TIME_CHARS];
        let mut remaining = millis.max(0);
        for slot in time_part.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        id.extend(time_part.iter().map(|&c| c as char));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&digit| PUSH_CHARS[digit as usize] as char),
        );
        id
    }
}

/// Add one to a base-64 number stored most significant digit first.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
