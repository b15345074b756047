//! Random identifiers for test data.

use rand::Rng;

/// `len` random lowercase ASCII letters.
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}
