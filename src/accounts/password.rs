//! Password policy applied at registration and when an admin sets a password.

const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "password", "password1", "password123", "qwerty", "qwerty123",
    "abc123", "111111", "123123", "1234567890", "letmein", "welcome", "monkey", "dragon", "iloveyou",
    "admin", "admin123", "football", "baseball", "sunshine", "princess", "passw0rd", "trustno1",
    "superman", "starwars", "whatever", "qazwsx", "1q2w3e4r", "changeme", "secret",
];

/// Returns every policy violation, empty when the password is acceptable.
///
/// `attributes` are user-visible values (username, email) the password must not resemble.
pub fn validate(password: &str, attributes: &[&str]) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }

    let lowered = password.to_lowercase();

    if attributes
        .iter()
        .flat_map(|attr| attribute_parts(attr))
        .any(|part| too_similar(&lowered, &part))
    {
        problems.push("The password is too similar to your personal information.".to_string());
    }

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

/// The whole attribute plus its `@`/`.`/`-`/`_` separated pieces, lowercased.
fn attribute_parts(attribute: &str) -> Vec<String> {
    let lowered = attribute.trim().to_lowercase();
    if lowered.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = lowered
        .split(['@', '.', '-', '_', '+'])
        .filter(|part| part.len() >= 3)
        .map(str::to_string)
        .collect();
    parts.push(lowered);
    parts
}

fn too_similar(password: &str, attribute: &str) -> bool {
    if password == attribute {
        return true;
    }
    // Containment only counts when the attribute makes up most of the password.
    password.contains(attribute) && attribute.len() * 10 >= password.len() * 7
}
