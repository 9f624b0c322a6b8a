//! Complaints raised against the dealer and the dealer's answers to them.
//!
//! A complaint and its answer are broadcast independently, so either may arrive first. An
//! entry is created by whichever arrives first and only becomes adjudicable once both halves
//! are present. Entries are never removed and their halves, once set, are never reset.

use crate::bls12381::primitives::group::Scalar;
use std::collections::BTreeMap;
use zeroize::Zeroize;

/// The state of a single complainer's complaint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complaint {
    /// Whether the complaint itself was received.
    pub received: bool,

    /// The share revealed by the dealer in response (if any).
    pub answer: Option<Scalar>,
}

impl Complaint {
    /// Whether the dealer's answer was received.
    pub fn answered(&self) -> bool {
        self.answer.is_some()
    }

    /// Whether both the complaint and its answer were received.
    pub fn adjudicable(&self) -> bool {
        self.received && self.answered()
    }
}

/// The outcome of recording half of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First time anything was heard about this complainer.
    New,

    /// The other half was already present (the entry is now adjudicable).
    Completed,

    /// This half was already present: nothing changed.
    Duplicate,
}

/// Complaints keyed by complainer.
#[derive(Debug, Default)]
pub struct Ledger {
    complaints: BTreeMap<u32, Complaint>,
}

impl Ledger {
    /// Records the complaint of `complainer`.
    pub fn complain(&mut self, complainer: u32) -> Recorded {
        let Some(complaint) = self.complaints.get_mut(&complainer) else {
            self.complaints.insert(
                complainer,
                Complaint {
                    received: true,
                    answer: None,
                },
            );
            return Recorded::New;
        };
        if complaint.received {
            return Recorded::Duplicate;
        }
        complaint.received = true;
        Recorded::Completed
    }

    /// Records the dealer's answer to the complaint of `complainer`.
    ///
    /// The first answer is authoritative: later answers are never stored.
    pub fn answer(&mut self, complainer: u32, answer: Scalar) -> Recorded {
        let Some(complaint) = self.complaints.get_mut(&complainer) else {
            self.complaints.insert(
                complainer,
                Complaint {
                    received: false,
                    answer: Some(answer),
                },
            );
            return Recorded::New;
        };
        if complaint.answered() {
            return Recorded::Duplicate;
        }
        complaint.answer = Some(answer);
        if complaint.received {
            Recorded::Completed
        } else {
            Recorded::New
        }
    }

    /// Returns the entry of `complainer` (if any).
    pub fn get(&self, complainer: u32) -> Option<&Complaint> {
        self.complaints.get(&complainer)
    }

    /// Returns whether `complainer` has complained.
    pub fn has_complained(&self, complainer: u32) -> bool {
        self.get(complainer).is_some_and(|c| c.received)
    }

    /// Returns the number of distinct participants that complained.
    pub fn complainers(&self) -> usize {
        self.complaints.values().filter(|c| c.received).count()
    }

    /// Returns all entries that have both a complaint and an answer (in complainer order).
    pub fn adjudicable(&self) -> impl Iterator<Item = (u32, &Scalar)> {
        self.complaints
            .iter()
            .filter_map(|(complainer, c)| match (c.received, &c.answer) {
                (true, Some(answer)) => Some((*complainer, answer)),
                _ => None,
            })
    }

    /// Returns the first complainer (in complainer order) that was never answered.
    pub fn unanswered(&self) -> Option<u32> {
        self.complaints
            .iter()
            .find(|(_, c)| c.received && !c.answered())
            .map(|(complainer, _)| *complainer)
    }
}

impl Zeroize for Ledger {
    fn zeroize(&mut self) {
        for complaint in self.complaints.values_mut() {
            if let Some(answer) = complaint.answer.as_mut() {
                answer.zeroize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bls12381::primitives::group::Element;

    #[test]
    fn test_complaint_then_answer() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.complain(1), Recorded::New);
        assert_eq!(ledger.unanswered(), Some(1));
        assert_eq!(ledger.adjudicable().count(), 0);

        assert_eq!(ledger.answer(1, Scalar::one()), Recorded::Completed);
        assert_eq!(ledger.unanswered(), None);
        assert_eq!(ledger.adjudicable().collect::<Vec<_>>(), vec![(1, &Scalar::one())]);
        assert_eq!(ledger.complainers(), 1);
    }

    #[test]
    fn test_answer_then_complaint() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.answer(2, Scalar::one()), Recorded::New);

        // An answer alone is not a complaint
        assert_eq!(ledger.complainers(), 0);
        assert!(!ledger.has_complained(2));
        assert_eq!(ledger.unanswered(), None);

        assert_eq!(ledger.complain(2), Recorded::Completed);
        assert!(ledger.get(2).unwrap().adjudicable());
        assert_eq!(ledger.complainers(), 1);
    }

    #[test]
    fn test_duplicates_do_not_change_state() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.complain(3), Recorded::New);
        assert_eq!(ledger.complain(3), Recorded::Duplicate);
        assert_eq!(ledger.complainers(), 1);

        let mut two = Scalar::zero();
        two.set_int(2);
        assert_eq!(ledger.answer(3, Scalar::one()), Recorded::Completed);
        assert_eq!(ledger.answer(3, two), Recorded::Duplicate);
        assert_eq!(ledger.get(3).unwrap().answer, Some(Scalar::one()));
    }

    #[test]
    fn test_unanswered_is_ordered() {
        let mut ledger = Ledger::default();
        ledger.complain(5);
        ledger.complain(2);
        ledger.answer(2, Scalar::one());
        ledger.complain(4);
        assert_eq!(ledger.unanswered(), Some(4));
        assert_eq!(ledger.complainers(), 3);
    }

    #[test]
    fn test_zeroize() {
        let mut ledger = Ledger::default();
        ledger.complain(1);
        ledger.answer(1, Scalar::one());
        ledger.zeroize();
        assert!(ledger.get(1).unwrap().answer.unwrap().is_zero());
    }
}
