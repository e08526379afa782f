/// Fallback name for a link that is not in the alias table: the last path
/// segment without its extension. Names that start with dots keep them
/// (`/.profile` → `.profile`).
pub fn filename_stem(link: &str) -> String {
    let tail = link.rsplit('/').next().unwrap_or(link);
    let leading_dots = tail.len() - tail.trim_start_matches('.').len();
    let (dots, rest) = tail.split_at(leading_dots);
    match rest.rfind('.') {
        Some(i) => format!("{}{}", dots, &rest[..i]),
        None => tail.to_string(),
    }
}

/// Links holding an `@` are taken to be e-mail addresses.
pub fn is_email_like(link: &str) -> bool {
    link.contains('@')
}
