//! Completeness gate: are the required categories filled before generating?

use std::collections::BTreeMap;

use crate::profile::Profile;

/// True iff every required category holds a non-empty value.
pub fn is_complete<S: AsRef<str>>(profile: &Profile, required: &[S]) -> bool {
    required.iter().all(|c| is_filled(profile, c.as_ref()))
}

/// Required categories that are absent or empty, in `required` order.
pub fn missing<'a, S: AsRef<str>>(profile: &Profile, required: &'a [S]) -> Vec<&'a str> {
    required
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !is_filled(profile, c))
        .collect()
}

/// The first missing category and, if the host configured one, its question.
pub fn next_follow_up<'a, S: AsRef<str>>(
    profile: &Profile,
    required: &'a [S],
    questions: &'a BTreeMap<String, String>,
) -> Option<(&'a str, Option<&'a str>)> {
    let category = missing(profile, required).into_iter().next()?;
    Some((category, questions.get(category).map(String::as_str)))
}

fn is_filled(profile: &Profile, category: &str) -> bool {
    profile.get(category).is_some_and(|s| s.is_filled())
}
