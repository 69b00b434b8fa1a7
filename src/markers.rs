//! Marker strings written into the compiled document.
//!
//! Downstream renderers and the people cleaning up a bad paste both look for
//! these exact strings, so they are kept in one place and never built inline.

/// Prefix of a pending-image placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "[图片处理中";

/// Suffix of a pending-image placeholder token.
pub const PLACEHOLDER_SUFFIX: &str = "]";

/// Alt text for a successfully resolved image.
pub const IMAGE_ALT: &str = "图片";

/// Alt text for an image whose rehosting failed.
pub const FAILED_IMAGE_ALT: &str = "图片加载失败";

/// Placeholder token for the `index`-th image (1-based).
pub fn placeholder_token(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Markdown image reference for a resolved image.
pub fn image_ref(url: &str) -> String {
    format!("![{IMAGE_ALT}]({url})")
}

/// Failure marker preserving the original locator for manual recovery.
pub fn failure_marker(locator: &str) -> String {
    format!("![{FAILED_IMAGE_ALT}]({locator})")
}

/// Block appended for each uploaded raw attachment.
pub fn attachment_block(url: &str) -> String {
    format!("\n\n{}\n\n", image_ref(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_format() {
        assert_eq!(placeholder_token(1), "[图片处理中1]");
        assert_eq!(placeholder_token(12), "[图片处理中12]");
    }

    #[test]
    fn tokens_are_not_prefixes_of_each_other() {
        assert!(!placeholder_token(10).contains(&placeholder_token(1)));
    }

    #[test]
    fn reference_formats() {
        assert_eq!(image_ref("https://cdn/x.png"), "![图片](https://cdn/x.png)");
        assert_eq!(failure_marker("blob:abc"), "![图片加载失败](blob:abc)");
        assert_eq!(
            attachment_block("https://cdn/x.png"),
            "\n\n![图片](https://cdn/x.png)\n\n"
        );
    }
}
