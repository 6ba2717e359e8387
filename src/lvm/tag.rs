//! LVM2 tag validation.
//!
//! Tags are restricted by LVM2 to a conservative character set; reject anything
//! else before it ever reaches `vgcreate --addtag`.

use super::error::{LvmError, Result};

const ALLOWED_EXTRA: &[char] = &['_', '+', '.', '-', '/', '=', '!', ':', '&', '#'];

/// Validates a single LVM tag per the facade's `ValidateTag` contract.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(LvmError::InvalidTag("tag cannot be empty".to_string()));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED_EXTRA.contains(&c))
    {
        return Err(LvmError::InvalidTag(format!(
            "tag '{tag}' contains characters outside LVM2's supported set"
        )));
    }
    Ok(())
}

/// Validates every tag in `tags`, returning the first failure.
pub fn validate_tags(tags: &[String]) -> Result<()> {
    tags.iter().try_for_each(|t| validate_tag(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_tags() {
        assert!(validate_tag("csilvm").is_ok());
        assert!(validate_tag("kubernetes.io/created-by").is_ok());
    }

    #[test]
    fn rejects_empty_and_disallowed_chars() {
        assert!(validate_tag("").is_err());
        assert!(validate_tag("has space").is_err());
        assert!(validate_tag("has,comma").is_err());
    }
}
