//! JQL queries issued by the rollup.

/// Children of an Epic.
pub fn children_of(epic_key: &str) -> String {
    format!("parent = {epic_key}")
}

/// Issues carrying a fix version.
pub fn fix_version(release: &str) -> String {
    format!("fixVersion = \"{}\"", release.replace('"', "\\\""))
}

/// A batch of issues by key.
pub fn keys_in(keys: &[String]) -> String {
    format!("key in ({})", keys.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries() {
        assert_eq!(children_of("PRJ-1"), "parent = PRJ-1");
        assert_eq!(fix_version("1.2 \"beta\""), "fixVersion = \"1.2 \\\"beta\\\"\"");
        assert_eq!(
            keys_in(&["A-1".to_string(), "A-2".to_string()]),
            "key in (A-1, A-2)"
        );
    }
}
