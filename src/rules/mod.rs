// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Rule registry.

pub mod current_managed_thread_id;

use std::sync::Arc;

use tuglint_core::diagnostic::RuleDescriptor;
use tuglint_core::driver::Rule;
use tuglint_core::fix::CodeFix;

use current_managed_thread_id::{CurrentManagedThreadIdFix, CurrentManagedThreadIdRule};

/// Every registered rule.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![Arc::new(CurrentManagedThreadIdRule)]
}

/// Every registered code fix.
pub fn all_fixers() -> Vec<Box<dyn CodeFix>> {
    vec![Box::new(CurrentManagedThreadIdFix)]
}

/// Descriptor of a registered rule.
pub fn descriptor(rule_id: &str) -> Option<&'static RuleDescriptor> {
    all_rules()
        .into_iter()
        .map(|rule| rule.descriptor())
        .find(|d| d.id.eq_ignore_ascii_case(rule_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_consistent() {
        let rules = all_rules();
        let fixers = all_fixers();
        for rule in &rules {
            if rule.descriptor().fixable {
                assert!(fixers
                    .iter()
                    .any(|f| f.fixable_rule_ids().contains(&rule.descriptor().id)));
            }
        }
        assert_eq!(descriptor("ca1839").map(|d| d.id), Some("CA1839"));
        assert!(descriptor("CA0000").is_none());
    }
}
