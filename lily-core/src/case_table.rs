//! Case tables of `match` and `switch` statements.
//!
//! A table holds an ordered list of cases keyed by a pattern (or case
//! value), each with an ordered list of sub-cases `(guard?, body)`.
//! [`CaseTable::classify`] is asked before every insertion.

use crate::error::SemaError;

/// Key of a case: compared structurally, with one catch-all form.
pub trait CaseKey {
    fn same_case(&self, other: &Self) -> bool;
    /// Catch-all key (`_`, a bare binding, `else`).
    fn is_else(&self) -> bool;
}

/// Structural equality of guard expressions, ignoring source locations.
pub trait StructuralEq {
    fn structural_eq(&self, other: &Self) -> bool;
}

impl StructuralEq for () {
    fn structural_eq(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Ok,
    DuplicateCase,
    UnusedCase,
}

impl CaseStatus {
    pub fn into_result(self) -> Result<(), SemaError> {
        match self {
            CaseStatus::Ok => Ok(()),
            CaseStatus::DuplicateCase => Err(SemaError::DuplicateCase),
            CaseStatus::UnusedCase => Err(SemaError::UnusedCase),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubCase<G, B> {
    pub guard: Option<G>,
    pub body: B,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case<K, G, B> {
    pub key: K,
    pub subcases: Vec<SubCase<G, B>>,
}

impl<K, G, B> Case<K, G, B> {
    /// Has a sub-case without guard, after which nothing is reachable.
    pub fn is_closed(&self) -> bool {
        self.subcases.iter().any(|s| s.guard.is_none())
    }
}

#[derive(Debug, Clone)]
pub struct CaseTable<K, G, B> {
    cases: Vec<Case<K, G, B>>,
    has_else: bool,
}

impl<K, G, B> Default for CaseTable<K, G, B> {
    fn default() -> Self {
        CaseTable {
            cases: Vec::new(),
            has_else: false,
        }
    }
}

impl<K: CaseKey, G: StructuralEq, B> CaseTable<K, G, B> {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, key: &K) -> Option<&Case<K, G, B>> {
        self.cases.iter().find(|case| case.key.same_case(key))
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut Case<K, G, B>> {
        self.cases.iter_mut().find(|case| case.key.same_case(key))
    }

    /// Decides whether `(key, guard)` may be added.
    pub fn classify(&self, key: &K, guard: Option<&G>) -> CaseStatus {
        if !key.is_else() && self.has_else {
            return CaseStatus::UnusedCase;
        }
        let Some(case) = self.find(key) else {
            return CaseStatus::Ok;
        };
        if let Some(guard) = guard {
            let repeated = case
                .subcases
                .iter()
                .filter_map(|s| s.guard.as_ref())
                .any(|g| g.structural_eq(guard));
            if repeated {
                return CaseStatus::DuplicateCase;
            }
        }
        match (case.is_closed(), guard) {
            (true, None) => CaseStatus::DuplicateCase,
            (true, Some(_)) => CaseStatus::UnusedCase,
            (false, _) => CaseStatus::Ok,
        }
    }

    /// Classifies and, when the answer is `Ok`, inserts.
    pub fn add(&mut self, key: K, guard: Option<G>, body: B) -> CaseStatus {
        let status = self.classify(&key, guard.as_ref());
        if status != CaseStatus::Ok {
            return status;
        }
        if key.is_else() && guard.is_none() {
            self.has_else = true;
        }
        let subcase = SubCase { guard, body };
        match self.find_mut(&key) {
            Some(case) => case.subcases.push(subcase),
            None => self.cases.push(Case {
                key,
                subcases: vec![subcase],
            }),
        }
        CaseStatus::Ok
    }
}

impl<K, G, B> CaseTable<K, G, B> {
    /// An unguarded catch-all arm was supplied.
    pub fn has_else(&self) -> bool {
        self.has_else
    }

    pub fn cases(&self) -> &[Case<K, G, B>] {
        &self.cases
    }

    pub fn into_cases(self) -> Vec<Case<K, G, B>> {
        self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, PatternLiteral, SwitchCaseValue};

    #[derive(Debug, Clone, PartialEq)]
    struct Guard(&'static str);

    impl StructuralEq for Guard {
        fn structural_eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    fn lit(b: bool) -> Pattern {
        Pattern::Literal(PatternLiteral::Bool(b))
    }

    #[test]
    fn repeated_unguarded_case_is_duplicate() {
        let mut table: CaseTable<Pattern, Guard, u32> = CaseTable::new();
        assert_eq!(table.add(lit(true), None, 0), CaseStatus::Ok);
        assert_eq!(table.classify(&lit(true), None), CaseStatus::DuplicateCase);
    }

    #[test]
    fn guard_after_unguarded_case_is_unused() {
        let mut table: CaseTable<Pattern, Guard, u32> = CaseTable::new();
        table.add(lit(true), None, 0);
        assert_eq!(
            table.classify(&lit(true), Some(&Guard("g"))),
            CaseStatus::UnusedCase
        );
    }

    #[test]
    fn guarded_subcases_accumulate() {
        let mut table: CaseTable<Pattern, Guard, u32> = CaseTable::new();
        assert_eq!(table.add(lit(true), Some(Guard("a")), 0), CaseStatus::Ok);
        assert_eq!(table.add(lit(true), Some(Guard("b")), 1), CaseStatus::Ok);
        assert_eq!(
            table.classify(&lit(true), Some(&Guard("a"))),
            CaseStatus::DuplicateCase
        );
        assert_eq!(table.add(lit(true), None, 2), CaseStatus::Ok);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cases()[0].subcases.len(), 3);
        assert_eq!(table.add(lit(false), None, 3), CaseStatus::Ok);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn arms_after_catch_all_are_unused() {
        let mut table: CaseTable<Pattern, Guard, u32> = CaseTable::new();
        assert_eq!(table.add(Pattern::Name("x".into()), None, 0), CaseStatus::Ok);
        assert!(table.has_else());
        assert_eq!(table.classify(&lit(false), None), CaseStatus::UnusedCase);
        assert_eq!(table.classify(&Pattern::Wildcard, None), CaseStatus::DuplicateCase);
    }

    #[test]
    fn switch_values_share_the_state_machine() {
        let mut table: CaseTable<SwitchCaseValue, (), &str> = CaseTable::new();
        assert_eq!(table.add(SwitchCaseValue::Int(1), None, "one"), CaseStatus::Ok);
        assert_eq!(
            table.add(SwitchCaseValue::Int(1), None, "again"),
            CaseStatus::DuplicateCase
        );
        assert_eq!(table.add(SwitchCaseValue::Else, None, "rest"), CaseStatus::Ok);
        assert!(table.has_else());
        assert_eq!(
            CaseStatus::UnusedCase.into_result(),
            Err(SemaError::UnusedCase)
        );
    }
}
