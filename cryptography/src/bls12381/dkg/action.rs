//! Side effects requested by an [Instance](crate::bls12381::dkg::Instance).
//!
//! An instance never talks to the network (or to whatever tracks misbehavior) directly.
//! Every call that processes input returns the [Action]s it produced, in order, and the
//! host is responsible for carrying them out (either by matching on them or by handing
//! them to a [Processor]).

use bytes::Bytes;

/// A side effect produced while processing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Broadcast a message to all participants.
    Broadcast(Bytes),

    /// Send a message to a single participant over a private channel.
    Send { to: u32, msg: Bytes },

    /// Record misbehavior of a participant that does not (by itself) end the protocol.
    FlagMisbehavior { participant: u32, reason: String },

    /// Record that a participant has been disqualified.
    Disqualify { participant: u32, reason: String },
}

/// Sink for the [Action]s produced by an instance.
///
/// Implementations are invoked synchronously and must not block indefinitely.
pub trait Processor {
    /// Broadcast a message to all participants.
    fn broadcast(&mut self, msg: Bytes);

    /// Send a message to a single participant over a private channel.
    fn send(&mut self, to: u32, msg: Bytes);

    /// Record misbehavior of a participant.
    fn flag_misbehavior(&mut self, participant: u32, reason: String);

    /// Record that a participant has been disqualified.
    fn disqualify(&mut self, participant: u32, reason: String);
}

impl Action {
    /// Hands the action to a [Processor].
    pub fn apply(self, processor: &mut impl Processor) {
        match self {
            Action::Broadcast(msg) => processor.broadcast(msg),
            Action::Send { to, msg } => processor.send(to, msg),
            Action::FlagMisbehavior {
                participant,
                reason,
            } => processor.flag_misbehavior(participant, reason),
            Action::Disqualify {
                participant,
                reason,
            } => processor.disqualify(participant, reason),
        }
    }
}

/// Hands all actions to a [Processor], in order.
pub fn dispatch(actions: Vec<Action>, processor: &mut impl Processor) {
    for action in actions {
        action.apply(processor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Processor for Recorder {
        fn broadcast(&mut self, msg: Bytes) {
            self.events.push(format!("broadcast {}", msg.len()));
        }

        fn send(&mut self, to: u32, msg: Bytes) {
            self.events.push(format!("send {} {}", to, msg.len()));
        }

        fn flag_misbehavior(&mut self, participant: u32, reason: String) {
            self.events.push(format!("flag {} {}", participant, reason));
        }

        fn disqualify(&mut self, participant: u32, reason: String) {
            self.events.push(format!("disqualify {} {}", participant, reason));
        }
    }

    #[test]
    fn test_dispatch_preserves_order() {
        let actions = vec![
            Action::FlagMisbehavior {
                participant: 0,
                reason: "bad share".into(),
            },
            Action::Broadcast(Bytes::from_static(&[2, 0])),
            Action::Send {
                to: 3,
                msg: Bytes::from_static(&[0, 1, 2]),
            },
            Action::Disqualify {
                participant: 0,
                reason: "too many complaints".into(),
            },
        ];
        let mut recorder = Recorder::default();
        dispatch(actions, &mut recorder);
        assert_eq!(
            recorder.events,
            vec![
                "flag 0 bad share",
                "broadcast 2",
                "send 3 3",
                "disqualify 0 too many complaints",
            ]
        );
    }
}
