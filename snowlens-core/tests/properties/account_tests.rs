//! Property-based tests for account locator normalization

use proptest::prelude::*;
use snowlens_core::Account;

// Strategy for generating bare account locators, optionally with
// region/cloud segments
fn arb_locator() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{2,15}(\\.[a-z0-9]{2,12}){0,2}"
}

proptest! {
    // Bare locators normalize to themselves
    #[test]
    fn bare_locator_is_unchanged(locator in arb_locator()) {
        let account = Account::parse(&locator).unwrap();
        prop_assert_eq!(account.as_str(), locator.as_str());
    }

    // Account URLs normalize to the host minus the vendor suffix
    #[test]
    fn url_with_vendor_suffix_is_stripped(locator in arb_locator()) {
        let url = format!("https://{locator}.snowflakecomputing.com");
        let account = Account::parse(&url).unwrap();
        prop_assert_eq!(account.as_str(), locator.as_str());
    }

    // URL and bare forms of the same locator agree
    #[test]
    fn url_and_bare_forms_agree(locator in arb_locator()) {
        let from_url =
            Account::parse(&format!("https://{locator}.snowflakecomputing.com/console")).unwrap();
        let from_bare = Account::parse(&locator).unwrap();
        prop_assert_eq!(from_url, from_bare);
    }
}
