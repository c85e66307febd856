//! User-Agent string sent by the native transport.

const PRODUCT: &str = "xrequest";

#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (reqwest)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_product_and_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("xrequest/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
        );
        assert!(ua.ends_with("(reqwest)"), "unexpected UA: {ua}");
    }
}
