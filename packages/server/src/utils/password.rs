use rand::Rng;
use rand::distr::Alphanumeric;

/// Generate a random alphanumeric password.
pub fn generate_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a team invite code. Knowing the code is what lets a user join,
/// so it comes from the same CSPRNG as passwords.
pub fn generate_invite_code() -> String {
    generate_password(12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        assert_eq!(generate_password(12).len(), 12);
        assert_eq!(generate_password(0).len(), 0);
    }

    #[test]
    fn outputs_are_alphanumeric() {
        assert!(generate_password(64).chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn outputs_differ() {
        assert_ne!(generate_password(16), generate_password(16));
    }
}
