use crate::error::{CatalogError, CatalogResult};
use conform_types::ConformanceRule;

/// Ordered, densely numbered rules of one dataset version.
///
/// Every operation returns a new list; the list a dataset version was
/// loaded with is never modified, because the gateway only accepts whole
/// new versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleList {
    rules: Vec<ConformanceRule>,
}

impl RuleList {
    /// Wrap persisted rules, renumbering `order` to match position.
    ///
    /// Rules are sorted by their stored `order` first (stable), so a
    /// document with gaps or shuffled entries is normalised rather than
    /// rejected. Use [`crate::validate::check_dense_order`] to reject instead.
    pub fn from_rules(mut rules: Vec<ConformanceRule>) -> Self {
        rules.sort_by_key(|r| r.order);
        renumber(&mut rules, 0);
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> CatalogResult<&ConformanceRule> {
        self.rules.get(index).ok_or(CatalogError::OutOfRange {
            index,
            len: self.rules.len(),
        })
    }

    pub fn as_slice(&self) -> &[ConformanceRule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConformanceRule> {
        self.rules.iter()
    }

    /// Rules strictly before `index`.
    pub fn prefix(&self, index: usize) -> CatalogResult<&[ConformanceRule]> {
        self.check_index(index)?;
        Ok(&self.rules[..index])
    }

    pub fn into_vec(self) -> Vec<ConformanceRule> {
        self.rules
    }

    /// Append `rule` with `order = len`. Returns the new list and the order.
    pub fn insert_at_end(&self, mut rule: ConformanceRule) -> (RuleList, u32) {
        let order = self.rules.len() as u32;
        rule.order = order;
        let mut rules = self.rules.clone();
        rules.push(rule);
        (RuleList { rules }, order)
    }

    /// Remove the rule at `index`; later rules move up by one.
    pub fn remove_at(&self, index: usize) -> CatalogResult<RuleList> {
        self.check_index(index)?;
        let mut rules = self.rules.clone();
        rules.remove(index);
        renumber(&mut rules, index);
        Ok(RuleList { rules })
    }

    /// Replace the rule at `index`, keeping its position and `order`.
    pub fn replace_at(&self, index: usize, mut rule: ConformanceRule) -> CatalogResult<RuleList> {
        self.check_index(index)?;
        rule.order = index as u32;
        let mut rules = self.rules.clone();
        rules[index] = rule;
        Ok(RuleList { rules })
    }

    fn check_index(&self, index: usize) -> CatalogResult<()> {
        if index < self.rules.len() {
            Ok(())
        } else {
            Err(CatalogError::OutOfRange {
                index,
                len: self.rules.len(),
            })
        }
    }
}

fn renumber(rules: &mut [ConformanceRule], from: usize) {
    for (i, rule) in rules.iter_mut().enumerate().skip(from) {
        rule.order = i as u32;
    }
}

impl From<RuleList> for Vec<ConformanceRule> {
    fn from(list: RuleList) -> Self {
        list.rules
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a ConformanceRule;
    type IntoIter = std::slice::Iter<'a, ConformanceRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_types::RuleKind;

    fn literal(order: u32, column: &str) -> ConformanceRule {
        ConformanceRule::new(
            order,
            column,
            RuleKind::Literal {
                value: column.to_uppercase(),
            },
        )
    }

    fn orders(list: &RuleList) -> Vec<u32> {
        list.iter().map(|r| r.order).collect()
    }

    fn columns(list: &RuleList) -> Vec<&str> {
        list.iter().map(|r| r.output_column.as_str()).collect()
    }

    #[test]
    fn from_rules_sorts_and_renumbers() {
        let list = RuleList::from_rules(vec![literal(7, "c"), literal(2, "a"), literal(5, "b")]);
        assert_eq!(columns(&list), vec!["a", "b", "c"]);
        assert_eq!(orders(&list), vec![0, 1, 2]);
    }

    #[test]
    fn insert_at_end_assigns_len_as_order() {
        let list = RuleList::from_rules(vec![literal(0, "a")]);
        let (next, order) = list.insert_at_end(literal(99, "b"));
        assert_eq!(order, 1);
        assert_eq!(orders(&next), vec![0, 1]);
        assert_eq!(list.len(), 1, "source list untouched");
    }

    #[test]
    fn remove_first_renumbers_rest() {
        let list = RuleList::from_rules(vec![literal(0, "a"), literal(1, "b")]);
        let next = list.remove_at(0).unwrap();
        assert_eq!(columns(&next), vec!["b"]);
        assert_eq!(orders(&next), vec![0]);
    }

    #[test]
    fn remove_out_of_range_fails() {
        let list = RuleList::from_rules(vec![literal(0, "a")]);
        assert!(matches!(
            list.remove_at(1),
            Err(CatalogError::OutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            RuleList::default().remove_at(0),
            Err(CatalogError::OutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn replace_keeps_position_and_order() {
        let list = RuleList::from_rules(vec![literal(0, "a"), literal(1, "b"), literal(2, "c")]);
        let next = list.replace_at(1, literal(42, "z")).unwrap();
        assert_eq!(columns(&next), vec!["a", "z", "c"]);
        assert_eq!(orders(&next), vec![0, 1, 2]);
        assert_eq!(columns(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_out_of_range_fails() {
        let list = RuleList::from_rules(vec![literal(0, "a")]);
        assert!(matches!(
            list.replace_at(3, literal(0, "z")),
            Err(CatalogError::OutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn prefix_excludes_index() {
        let list = RuleList::from_rules(vec![literal(0, "a"), literal(1, "b"), literal(2, "c")]);
        let p = list.prefix(2).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(list.prefix(0).unwrap().len(), 0);
        assert!(list.prefix(3).is_err());
    }
}
