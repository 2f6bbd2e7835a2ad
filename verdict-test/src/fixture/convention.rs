//! Expected verdicts encoded in fixture file names.
//!
//! The part of the file name before its first `.` is split on `_` and `-`, and each
//! token is looked up case-insensitively in [`TOKENS`]. Exactly one distinct verdict
//! must turn up.

use crate::ExpectedVerdict;

pub const TOKENS: &[(&str, ExpectedVerdict)] = &[
    ("false", ExpectedVerdict::Unsafe),
    ("unsafe", ExpectedVerdict::Unsafe),
    ("true", ExpectedVerdict::Safe),
    ("safe", ExpectedVerdict::Safe),
    ("unknown", ExpectedVerdict::Unknown),
];

/// Read the expected verdict from a file name such as `recursive_simple_false_assert.c`.
///
/// The error is a reason suitable for a `MalformedFixture`.
pub fn expected_from_file_name(file_name: &str) -> Result<ExpectedVerdict, String> {
    let stem = file_name.split('.').next().unwrap_or_default();
    let mut found: Vec<ExpectedVerdict> = Vec::new();
    for token in stem.split(['_', '-']) {
        let token = token.to_ascii_lowercase();
        if let Some((_, verdict)) = TOKENS.iter().find(|(name, _)| *name == token) {
            if !found.contains(verdict) {
                found.push(*verdict);
            }
        }
    }
    match found.as_slice() {
        [verdict] => Ok(*verdict),
        [] => Err(format!(
            "no expected verdict in file name `{file_name}`; add a manifest entry or a \
             `_true_`/`_false_` token"
        )),
        conflicting => {
            let names: Vec<String> = conflicting.iter().map(ToString::to_string).collect();
            Err(format!(
                "file name `{file_name}` names conflicting verdicts: {}",
                names.join(", ")
            ))
        }
    }
}
