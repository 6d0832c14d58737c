//! Greeting names and English list helpers.

/// Join items as English prose: "A", "A and B", "A, B, and C".
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(|s| s.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Count as a word for 1 through 3, numerals otherwise.
pub fn count_word(n: usize) -> String {
    match n {
        1 => "one".to_string(),
        2 => "two".to_string(),
        3 => "three".to_string(),
        other => other.to_string(),
    }
}

/// Derive a first name from an address like "jane.doe@x.gov" → "Jane".
///
/// Returns `None` for candidates without `@` or with an empty local part.
pub fn first_name_from_address(candidate: &str) -> Option<String> {
    let (local, _) = candidate.split_once('@')?;
    let stem = local.split(['.', '_']).next().unwrap_or_default();

    let mut chars = stem.chars();
    let first = chars.next()?;
    let mut name: String = first.to_uppercase().collect();
    name.push_str(&chars.as_str().to_lowercase());
    Some(name)
}

/// Greeting target for a newline-separated contacts field.
///
/// Falls back to `fallback` when no address yields a name.
pub fn greeting_name(contacts: &str, fallback: &str) -> String {
    let names: Vec<String> = contacts
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(first_name_from_address)
        .collect();

    if names.is_empty() {
        fallback.to_string()
    } else {
        join_list(&names)
    }
}
