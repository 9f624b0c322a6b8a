//! A single participant's view of a Feldman VSS dealing with dealer qualification.
//!
//! # Lifecycle
//!
//! ```txt
//! NotRunning --start--> Running --next_timeout--> SharesTimeoutElapsed
//!     --next_timeout--> ComplaintsTimeoutElapsed --end--> Ended
//! ```
//!
//! Disqualification is orthogonal to the phase: once the dealer is disqualified it stays
//! disqualified, all further messages are dropped, and [Instance::end] returns
//! [Error::Failure].
//!
//! # Misbehavior
//!
//! Malformed or unexpected messages from peers are never returned as errors. They are
//! absorbed into the state machine and surface as [Action::FlagMisbehavior] or
//! [Action::Disqualify]. Errors are reserved for misuse by the caller.

use crate::bls12381::{
    dkg::{
        action::Action,
        ledger::{Ledger, Recorded},
        wire::{self, Tag},
        Config, Error, MAX_SIZE, MINIMUM_THRESHOLD, MIN_SIZE,
    },
    primitives::{
        group::{self, verify_discrete_log, Element, Scalar, Share},
        poly,
    },
};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};
use vssq_utils::hex;
use zeroize::Zeroize;

/// Phase of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created but not started.
    NotRunning,
    /// Waiting for the verification vector and shares.
    Running,
    /// Waiting for complaints.
    SharesTimeoutElapsed,
    /// Waiting for the remaining complaint answers.
    ComplaintsTimeoutElapsed,
    /// Finalized (successfully or not).
    Ended,
}

impl Phase {
    /// Whether messages and timeouts may be processed in this phase.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Phase::Running | Phase::SharesTimeoutElapsed | Phase::ComplaintsTimeoutElapsed
        )
    }
}

/// Output of a qualified dealing.
#[derive(Debug, Clone)]
pub struct Output {
    /// This participant's share of the group secret.
    pub share: Share,

    /// The group public key.
    pub public: group::Public,

    /// The public key share of every participant (indexed by participant).
    pub public_shares: Vec<group::Public>,
}

/// The private share delivered by the dealer.
#[derive(Clone, Copy)]
enum Received {
    Pending,
    Malformed,
    Valid(Scalar),
}

/// The dealer's verification vector and the public key shares derived from it.
struct Verification {
    commitment: poly::Public,
    public_shares: Vec<group::Public>,
}

impl Verification {
    fn new(commitment: poly::Public, size: u32) -> Self {
        let public_shares = commitment.evaluate_all(size);
        Self {
            commitment,
            public_shares,
        }
    }

    /// Returns whether `private` is the share of `participant` committed to by the dealer.
    fn verify(&self, participant: u32, private: &Scalar) -> bool {
        verify_discrete_log(private, &self.public_shares[participant as usize])
    }
}

/// One participant's instance of a dealing (the dealer runs one as well).
///
/// All methods take `&mut self`: calls on a single instance must be serialized by the caller.
pub struct Instance {
    size: u32,
    threshold: u32,
    me: u32,
    dealer: u32,

    phase: Phase,
    disqualified: bool,

    secret: Option<poly::Private>,
    verification: Option<Verification>,
    share: Received,
    ledger: Ledger,

    actions: Vec<Action>,
}

impl Instance {
    /// Create a new instance for the participant `cfg.me`.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&cfg.size) {
            return Err(Error::InvalidInput(format!(
                "size should be in [{}, {}], got {}",
                MIN_SIZE, MAX_SIZE, cfg.size
            )));
        }
        if cfg.threshold < MINIMUM_THRESHOLD || cfg.threshold >= cfg.size {
            return Err(Error::InvalidInput(format!(
                "threshold should be in [{}, {}], got {}",
                MINIMUM_THRESHOLD,
                cfg.size - 1,
                cfg.threshold
            )));
        }
        if cfg.me >= cfg.size {
            return Err(Error::InvalidInput(format!(
                "index should be less than {}, got {}",
                cfg.size, cfg.me
            )));
        }
        if cfg.dealer >= cfg.size {
            return Err(Error::InvalidInput(format!(
                "dealer should be less than {}, got {}",
                cfg.size, cfg.dealer
            )));
        }
        Ok(Self {
            size: cfg.size,
            threshold: cfg.threshold,
            me: cfg.me,
            dealer: cfg.dealer,

            phase: Phase::NotRunning,
            disqualified: false,

            secret: None,
            verification: None,
            share: Received::Pending,
            ledger: Ledger::default(),

            actions: Vec::new(),
        })
    }

    /// Returns the number of participants.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the threshold (degree of the dealer's polynomial).
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the index of this participant.
    pub fn me(&self) -> u32 {
        self.me
    }

    /// Returns the index of the dealer.
    pub fn dealer(&self) -> u32 {
        self.dealer
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns whether the instance is processing messages.
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Returns whether the dealer has been disqualified.
    pub fn is_disqualified(&self) -> bool {
        self.disqualified
    }

    fn is_dealer(&self) -> bool {
        self.me == self.dealer
    }

    /// Start the protocol.
    ///
    /// If this participant is the dealer, a fresh secret polynomial is sampled from `rng` and
    /// the returned actions broadcast the verification vector and send every other
    /// participant its share. Other participants do not use `rng`.
    pub fn start<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<Vec<Action>, Error> {
        if self.phase != Phase::NotRunning {
            return Err(Error::InvalidStateTransition(format!(
                "dkg {} was already started",
                self.me
            )));
        }
        self.phase = Phase::Running;
        debug!(me = self.me, dealer = self.dealer, "started dkg");
        if self.is_dealer() {
            self.deal(rng);
        }
        Ok(self.flush())
    }

    fn deal<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        // Generate a secret polynomial of degree `threshold` and commit to it
        let secret = poly::new_from(self.threshold, rng);
        let commitment = poly::Public::commit(&secret);
        self.actions
            .push(Action::Broadcast(wire::verification_vector(&commitment)));

        // Distribute shares
        for index in 0..self.size {
            let mut eval = secret.evaluate(index);
            if index == self.me {
                self.share = Received::Valid(eval.value);
            } else {
                self.actions.push(Action::Send {
                    to: index,
                    msg: wire::share(&eval.value),
                });
            }
            eval.value.zeroize();
        }
        self.verification = Some(Verification::new(commitment, self.size));
        self.secret = Some(secret);
    }

    /// Process a broadcast message from `origin`.
    pub fn handle_broadcast(&mut self, origin: u32, msg: &[u8]) -> Result<Vec<Action>, Error> {
        self.check_running()?;
        self.check_origin(origin)?;
        if origin == self.me {
            return Ok(Vec::new());
        }
        if self.disqualified {
            debug!(me = self.me, origin, "dropping broadcast: dealer disqualified");
            return Ok(Vec::new());
        }
        match wire::split(msg) {
            Ok((Tag::VerificationVector, payload)) => {
                self.receive_verification_vector(origin, payload)
            }
            Ok((Tag::Complaint, payload)) => self.receive_complaint(origin, payload),
            Ok((Tag::ComplaintAnswer, payload)) => self.receive_complaint_answer(origin, payload),
            Ok((Tag::Share, _)) => {
                self.punish(origin, "private share sent over broadcast".to_string())
            }
            Err(err) => self.punish(origin, format!("invalid broadcast: {}", err)),
        }
        Ok(self.flush())
    }

    /// Process a private message from `origin`.
    pub fn handle_private(&mut self, origin: u32, msg: &[u8]) -> Result<Vec<Action>, Error> {
        self.check_running()?;
        self.check_origin(origin)?;
        if origin == self.me {
            return Ok(Vec::new());
        }
        if self.disqualified {
            debug!(me = self.me, origin, "dropping private message: dealer disqualified");
            return Ok(Vec::new());
        }

        // Only the dealer has anything to say privately
        if origin != self.dealer {
            debug!(me = self.me, origin, "dropping private message from non-dealer");
            return Ok(Vec::new());
        }
        self.receive_share(msg);
        Ok(self.flush())
    }

    /// Advance to the next timeout.
    ///
    /// Must be called exactly twice: first when the time to deliver shares (and the
    /// verification vector) has elapsed, then when the time to broadcast complaints has
    /// elapsed.
    pub fn next_timeout(&mut self) -> Result<Vec<Action>, Error> {
        match self.phase {
            Phase::Running => {
                self.phase = Phase::SharesTimeoutElapsed;
                debug!(me = self.me, "shares timeout elapsed");
                if !self.disqualified {
                    self.shares_timeout();
                }
            }
            Phase::SharesTimeoutElapsed => {
                self.phase = Phase::ComplaintsTimeoutElapsed;
                debug!(me = self.me, "complaints timeout elapsed");
                if !self.disqualified {
                    self.complaints_timeout();
                }
            }
            Phase::ComplaintsTimeoutElapsed => {
                return Err(Error::InvalidStateTransition(
                    "both timeouts have elapsed, the dkg should be ended".to_string(),
                ));
            }
            Phase::NotRunning | Phase::Ended => {
                return Err(Error::InvalidStateTransition(format!(
                    "dkg {} is not running",
                    self.me
                )));
            }
        }
        Ok(self.flush())
    }

    /// End the protocol (this is also the deadline for complaint answers).
    ///
    /// Returns this participant's share, the group public key, and all public key shares if
    /// the dealer is qualified. Any other outcome discards all key material. The returned
    /// actions carry the disqualification of a dealer that left a complaint unanswered.
    pub fn end(&mut self) -> (Vec<Action>, Result<Output, Error>) {
        let result = self.finalize();
        (self.flush(), result)
    }

    fn finalize(&mut self) -> Result<Output, Error> {
        match self.phase {
            Phase::ComplaintsTimeoutElapsed => {}
            Phase::Running | Phase::SharesTimeoutElapsed => {
                return Err(Error::InvalidStateTransition(format!(
                    "{}: two timeouts should elapse before ending the dkg",
                    self.me
                )));
            }
            Phase::NotRunning | Phase::Ended => {
                return Err(Error::InvalidStateTransition(format!(
                    "dkg {} is not running",
                    self.me
                )));
            }
        }
        self.phase = Phase::Ended;

        // A complaint that was never answered disqualifies the dealer
        if !self.disqualified {
            if let Some(complainer) = self.ledger.unanswered() {
                let reason = format!("complaint from {} was not answered", complainer);
                self.disqualify(reason.clone());
                self.discard();
                return Err(Error::Failure(format!("dealer is disqualified: {}", reason)));
            }
        }
        if self.disqualified {
            self.discard();
            return Err(Error::Failure("dealer is disqualified".to_string()));
        }

        // Collect key material
        let private = match self.share {
            Received::Valid(private) => Some(private),
            Received::Pending | Received::Malformed => None,
        };
        let verification = self
            .verification
            .as_ref()
            .map(|v| (*v.commitment.constant(), v.public_shares.clone()));
        let (Some(private), Some((public, public_shares))) = (private, verification) else {
            self.disqualified = true;
            self.discard();
            return Err(Error::Failure("key material is missing".to_string()));
        };

        // An identity key can't produce valid signatures
        if private.is_zero() {
            warn!(me = self.me, dealer = self.dealer, "private key share is zero");
            self.disqualified = true;
            self.discard();
            return Err(Error::Failure(
                "private key share is zero and therefore invalid".to_string(),
            ));
        }
        if public.is_identity() {
            warn!(me = self.me, dealer = self.dealer, "group public key is identity");
            self.disqualified = true;
            self.discard();
            return Err(Error::Failure(
                "group public key is identity and therefore invalid".to_string(),
            ));
        }
        info!(
            me = self.me,
            dealer = self.dealer,
            public = hex(&public.serialize()),
            "dealer qualified"
        );
        Ok(Output {
            share: Share {
                index: self.me,
                private,
            },
            public,
            public_shares,
        })
    }

    /// Disqualify `participant` for a reason outside of the protocol (if it is the dealer).
    ///
    /// # Warning
    ///
    /// All honest participants must make the same call, otherwise they may not agree on
    /// whether the dealer is qualified.
    pub fn force_disqualify(&mut self, participant: u32) -> Result<(), Error> {
        self.check_running()?;
        if participant >= self.size {
            return Err(Error::InvalidInput(format!(
                "participant should be less than {}, got {}",
                self.size, participant
            )));
        }
        if participant == self.dealer && !self.disqualified {
            warn!(me = self.me, dealer = self.dealer, "forced dealer disqualification");
            self.disqualified = true;
        }
        Ok(())
    }

    fn check_running(&self) -> Result<(), Error> {
        if !self.phase.is_running() {
            return Err(Error::InvalidStateTransition(format!(
                "dkg {} is not running",
                self.me
            )));
        }
        Ok(())
    }

    fn check_origin(&self, origin: u32) -> Result<(), Error> {
        if origin >= self.size {
            return Err(Error::InvalidInput(format!(
                "origin should be less than {}, got {}",
                self.size, origin
            )));
        }
        Ok(())
    }

    fn flush(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    fn flag(&mut self, participant: u32, reason: String) {
        debug!(me = self.me, participant, %reason, "flagged misbehavior");
        self.actions.push(Action::FlagMisbehavior {
            participant,
            reason,
        });
    }

    fn disqualify(&mut self, reason: String) {
        warn!(me = self.me, dealer = self.dealer, %reason, "disqualified dealer");
        self.disqualified = true;
        self.actions.push(Action::Disqualify {
            participant: self.dealer,
            reason,
        });
    }

    /// Disqualifies the dealer if it sent an invalid message, otherwise flags the sender.
    fn punish(&mut self, origin: u32, reason: String) {
        if origin == self.dealer {
            self.disqualify(reason);
        } else {
            self.flag(origin, reason);
        }
    }

    fn discard(&mut self) {
        if let Received::Valid(private) = &mut self.share {
            private.zeroize();
        }
        self.share = Received::Pending;
        if let Some(secret) = self.secret.as_mut() {
            secret.zeroize();
        }
        self.secret = None;
        self.ledger.zeroize();
    }

    fn shares_timeout(&mut self) {
        // Nothing can be verified without the verification vector
        if self.verification.is_none() {
            self.disqualify("verification vector was not received".to_string());
            return;
        }
        if matches!(self.share, Received::Pending) {
            self.complain("private share was not received".to_string());
        }
    }

    fn complaints_timeout(&mut self) {
        // Too many complaints disqualify the dealer regardless of the answers
        let complainers = self.ledger.complainers();
        if complainers > self.threshold as usize {
            self.disqualify(format!(
                "there are {} complaints, they exceeded the threshold {}",
                complainers, self.threshold
            ));
        }
    }

    fn receive_verification_vector(&mut self, origin: u32, payload: &[u8]) {
        if origin != self.dealer {
            debug!(me = self.me, origin, "dropping verification vector from non-dealer");
            return;
        }
        if self.verification.is_some() {
            self.flag(origin, "verification vector was already received".to_string());
            return;
        }
        if self.phase != Phase::Running {
            self.disqualify("verification vector received after the shares timeout".to_string());
            return;
        }
        let commitment = match wire::decode_verification_vector(payload, self.threshold) {
            Ok(commitment) => commitment,
            Err(err) => {
                self.disqualify(format!("invalid verification vector: {}", err));
                return;
            }
        };
        let verification = Verification::new(commitment, self.size);

        // Check complaints that were answered before the commitment was known
        let invalid = self
            .ledger
            .adjudicable()
            .find(|(complainer, answer)| !verification.verify(*complainer, answer))
            .map(|(complainer, _)| complainer);
        if let Some(complainer) = invalid {
            let public = hex(&verification.public_shares[complainer as usize].serialize());
            self.verification = Some(verification);
            self.disqualify(format!(
                "answer to complaint from {} does not match public key share {}",
                complainer, public
            ));
            return;
        }

        // Check the share received before the commitment (if any)
        let valid = match self.share {
            Received::Valid(private) => Some(verification.verify(self.me, &private)),
            _ => None,
        };
        let public = verification.public_shares[self.me as usize];
        self.verification = Some(verification);
        if valid == Some(false) {
            self.complain(format!(
                "private share does not match public key share {}",
                hex(&public.serialize())
            ));
        }
    }

    fn receive_share(&mut self, msg: &[u8]) {
        if self.phase != Phase::Running {
            self.flag(
                self.dealer,
                "private share received after the shares timeout".to_string(),
            );
            return;
        }
        if !matches!(self.share, Received::Pending) {
            self.flag(self.dealer, "private share was already received".to_string());
            return;
        }
        let private = match wire::decode_share(msg) {
            Ok(private) => private,
            Err(err) => {
                // We can't trust anything about our share
                self.share = Received::Malformed;
                let reason = format!("invalid private share: {}", err);
                self.complain(reason.clone());
                self.flag(self.dealer, reason);
                return;
            }
        };
        self.share = Received::Valid(private);

        // Verify the share (if the commitment is already known)
        let Some(verification) = &self.verification else {
            return;
        };
        if !verification.verify(self.me, &private) {
            let public = hex(&verification.public_shares[self.me as usize].serialize());
            self.complain(format!(
                "private share does not match public key share {}",
                public
            ));
        }
    }

    fn receive_complaint(&mut self, origin: u32, payload: &[u8]) {
        if self.phase == Phase::ComplaintsTimeoutElapsed {
            if origin == self.dealer {
                if let Err(err) = wire::decode_complaint(payload, self.size) {
                    self.disqualify(format!("invalid complaint: {}", err));
                    return;
                }
            }
            debug!(
                me = self.me,
                origin, "dropping complaint received after the complaints timeout"
            );
            return;
        }
        let complainee = match wire::decode_complaint(payload, self.size) {
            Ok(complainee) => complainee,
            Err(err) => {
                self.punish(origin, format!("invalid complaint: {}", err));
                return;
            }
        };

        // Only complaints about the dealer (by someone else) matter
        if origin == self.dealer {
            debug!(me = self.me, "ignoring complaint sent by the dealer");
            return;
        }
        if complainee != self.dealer {
            debug!(me = self.me, origin, complainee, "ignoring complaint about a non-dealer");
            return;
        }
        match self.ledger.complain(origin) {
            Recorded::New => {
                if self.is_dealer() {
                    self.answer(origin);
                }
            }
            Recorded::Completed => self.adjudicate(origin),
            Recorded::Duplicate => {
                self.flag(origin, "complaint was already received".to_string());
            }
        }
    }

    fn receive_complaint_answer(&mut self, origin: u32, payload: &[u8]) {
        if origin != self.dealer {
            debug!(me = self.me, origin, "dropping complaint answer from non-dealer");
            return;
        }
        let (complainer, answer) = match wire::decode_complaint_answer(payload, self.size) {
            Ok(answer) => answer,
            Err(err) => {
                self.disqualify(format!("invalid complaint answer: {}", err));
                return;
            }
        };
        match self.ledger.answer(complainer, answer) {
            Recorded::New => {}
            Recorded::Completed => self.adjudicate(complainer),
            Recorded::Duplicate => {
                self.flag(origin, "complaint answer was already received".to_string());
            }
        }
    }

    /// Check a complaint that has both been received and answered.
    ///
    /// If the verification vector is not known yet, the check is deferred until it arrives.
    /// An answer to our own complaint that survives the check replaces our share.
    fn adjudicate(&mut self, complainer: u32) {
        if self.is_dealer() {
            return;
        }
        let Some(answer) = self.ledger.get(complainer).and_then(|c| c.answer) else {
            return;
        };
        if let Some(verification) = &self.verification {
            if !verification.verify(complainer, &answer) {
                let public = hex(&verification.public_shares[complainer as usize].serialize());
                self.disqualify(format!(
                    "answer to complaint from {} does not match public key share {}",
                    complainer, public
                ));
                return;
            }
        }
        if complainer == self.me {
            debug!(me = self.me, "replacing private share with complaint answer");
            if let Received::Valid(previous) = &mut self.share {
                previous.zeroize();
            }
            self.share = Received::Valid(answer);
        }
    }

    /// Broadcast a complaint against the dealer (at most once).
    fn complain(&mut self, reason: String) {
        if self.ledger.has_complained(self.me) {
            return;
        }
        let recorded = self.ledger.complain(self.me);
        self.actions
            .push(Action::Broadcast(wire::complaint(self.dealer)));
        self.flag(self.dealer, format!("building a complaint: {}", reason));

        // The dealer may have answered before we complained
        if recorded == Recorded::Completed {
            self.adjudicate(self.me);
        }
    }

    /// Reveal the share of `complainer` (dealer only).
    fn answer(&mut self, complainer: u32) {
        let Some(secret) = &self.secret else {
            return;
        };
        let private = secret.evaluate(complainer).value;
        self.ledger.answer(complainer, private);
        self.actions.push(Action::Broadcast(wire::complaint_answer(
            complainer, &private,
        )));
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.discard();
    }
}
