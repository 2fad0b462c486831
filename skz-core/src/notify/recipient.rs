// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recipient address validation.

/// Basic email validation: exactly one `@`, a non-empty local part, and a
/// dotted domain.
pub fn validate_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let mut labels = domain.split('.');
    let has_dot = domain.contains('.');
    has_dot && labels.all(|l| !l.is_empty())
}

/// Basic phone validation: 10-15 decimal digits after stripping
/// `+`, `-`, `(`, `)`, and spaces.
pub fn validate_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | '(' | ')' | ' '))
        .collect();
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
