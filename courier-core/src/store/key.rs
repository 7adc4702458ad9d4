const SEPARATOR: char = '|';

fn escape(part: &str) -> String {
    part.replace('%', "%25").replace(SEPARATOR, "%7C")
}

/// `compose_key` joins the parts of a composite store key
///
/// Each part is escaped first, so parts containing `:` or the separator itself never
/// collide with another split of the same characters.
pub fn compose_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| escape(part))
        .collect::<Vec<String>>()
        .join(&SEPARATOR.to_string())
}
