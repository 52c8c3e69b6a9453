//! Random human-readable nicknames for accounts registered without one.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "clever", "eager", "fancy", "gentle", "happy", "jolly", "keen", "lively",
    "merry", "nimble", "proud", "quick", "quiet", "silly", "swift", "witty", "zany", "bold",
];

const NOUNS: &[&str] = &[
    "badger", "cat", "dolphin", "eagle", "falcon", "fox", "gecko", "heron", "koala", "lion",
    "lynx", "otter", "panda", "puffin", "raven", "seal", "tiger", "walrus", "wolf", "yak",
];

/// `adjective_noun_NNN`, e.g. `clever_fox_042`.
pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number: u16 = rng.random_range(0..1000);
    format!("{adjective}_{noun}_{number:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_nickname;

    #[test]
    fn generated_nicknames_pass_validation() {
        for _ in 0..50 {
            let nickname = generate_nickname();
            assert!(validate_nickname(&nickname).is_ok(), "{nickname}");
        }
    }

    #[test]
    fn generated_nickname_has_three_parts() {
        let nickname = generate_nickname();
        assert_eq!(nickname.split('_').count(), 3);
    }
}
