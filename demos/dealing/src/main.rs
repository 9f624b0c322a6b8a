//! Run a single Feldman VSS dealing (with dealer qualification) among in-process participants.
//!
//! Every participant runs its own [Instance] and all messages are delivered over a simulated
//! network (broadcasts reach everyone, private messages reach a single participant). Faults can be
//! injected into the dealer's outbound messages to observe complaints, answers, and
//! disqualification.
//!
//! # Usage
//!
//! ## Honest Dealer
//!
//! ```sh
//! cargo run --release -- --n 7 --seed 1
//! ```
//!
//! ## Corrupted Shares (Healed by Answers)
//!
//! ```sh
//! cargo run --release -- --n 7 --seed 1 --corrupt 2,5
//! ```
//!
//! ## Too Many Complaints
//!
//! ```sh
//! cargo run --release -- --n 7 --threshold 2 --seed 1 --corrupt 2 --withhold 3,4
//! ```
//!
//! ## Unanswered Complaint
//!
//! ```sh
//! cargo run --release -- --n 4 --seed 1 --corrupt 1 --silent
//! ```

use bytes::Bytes;
use clap::{value_parser, Arg, ArgAction, Command};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::{BTreeSet, VecDeque};
use tracing::{info, warn, Level};
use vssq_cryptography::bls12381::{
    dkg::{
        dispatch,
        wire::{self, Tag},
        Action, Config, Instance, Processor,
    },
    primitives::group::{Element, Scalar},
};
use vssq_utils::{hex, optimal_threshold};

/// Faults injected into the dealer's outbound messages.
struct Faults {
    corrupt: BTreeSet<u32>,
    withhold: BTreeSet<u32>,
    silent: bool,
}

/// A message in flight (`to` is `None` for broadcasts).
struct Envelope {
    from: u32,
    to: Option<u32>,
    msg: Bytes,
}

/// Carries out the actions of a single participant.
struct Outbox<'a> {
    me: u32,
    dealer: u32,
    faults: &'a Faults,
    rng: &'a mut StdRng,
    queue: &'a mut VecDeque<Envelope>,
}

impl Processor for Outbox<'_> {
    fn broadcast(&mut self, msg: Bytes) {
        if self.me == self.dealer
            && self.faults.silent
            && msg.first() == Some(&(Tag::ComplaintAnswer as u8))
        {
            info!(dealer = self.me, "withholding complaint answer");
            return;
        }
        self.queue.push_back(Envelope {
            from: self.me,
            to: None,
            msg,
        });
    }

    fn send(&mut self, to: u32, msg: Bytes) {
        let msg = if self.me != self.dealer {
            msg
        } else if self.faults.withhold.contains(&to) {
            info!(dealer = self.me, to, "withholding share");
            return;
        } else if self.faults.corrupt.contains(&to) {
            info!(dealer = self.me, to, "corrupting share");
            wire::share(&Scalar::rand(&mut *self.rng))
        } else {
            msg
        };
        self.queue.push_back(Envelope {
            from: self.me,
            to: Some(to),
            msg,
        });
    }

    fn flag_misbehavior(&mut self, participant: u32, reason: String) {
        warn!(reporter = self.me, participant, reason, "flagged misbehavior");
    }

    fn disqualify(&mut self, participant: u32, reason: String) {
        warn!(reporter = self.me, participant, reason, "disqualified");
    }
}

/// Participants connected by a simulated network.
struct Simulation {
    dealer: u32,
    instances: Vec<Instance>,
    faults: Faults,
    rng: StdRng,
    queue: VecDeque<Envelope>,
}

impl Simulation {
    fn enqueue(&mut self, me: u32, actions: Vec<Action>) {
        let mut outbox = Outbox {
            me,
            dealer: self.dealer,
            faults: &self.faults,
            rng: &mut self.rng,
            queue: &mut self.queue,
        };
        dispatch(actions, &mut outbox);
    }

    /// Delivers messages until none are left in flight.
    fn deliver(&mut self) {
        while let Some(Envelope { from, to, msg }) = self.queue.pop_front() {
            let recipients = match to {
                Some(to) => vec![to],
                None => (0..self.instances.len() as u32)
                    .filter(|i| *i != from)
                    .collect(),
            };
            for recipient in recipients {
                let instance = &mut self.instances[recipient as usize];
                let actions = match to {
                    Some(_) => instance.handle_private(from, &msg),
                    None => instance.handle_broadcast(from, &msg),
                }
                .expect("message should be processed");
                self.enqueue(recipient, actions);
            }
        }
    }

    fn start(&mut self) {
        for me in 0..self.instances.len() as u32 {
            let actions = self.instances[me as usize]
                .start(&mut self.rng)
                .expect("instance should start");
            self.enqueue(me, actions);
        }
        self.deliver();
    }

    fn timeout(&mut self) {
        for me in 0..self.instances.len() as u32 {
            let actions = self.instances[me as usize]
                .next_timeout()
                .expect("timeout should be processed");
            self.enqueue(me, actions);
        }
        self.deliver();
    }
}

fn participants(matches: &clap::ArgMatches, id: &str) -> BTreeSet<u32> {
    matches
        .get_many::<u32>(id)
        .map(|values| values.copied().collect())
        .unwrap_or_default()
}

fn main() {
    // Parse arguments
    let matches = Command::new("vssq-dealing")
        .about("run a feldman vss dealing with dealer qualification")
        .arg(
            Arg::new("n")
                .long("n")
                .required(true)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("dealer")
                .long("dealer")
                .default_value("0")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("0")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("corrupt")
                .long("corrupt")
                .value_delimiter(',')
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("withhold")
                .long("withhold")
                .value_delimiter(',')
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("silent")
                .long("silent")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .default_value("info")
                .value_parser(value_parser!(Level)),
        )
        .get_matches();

    // Create logger
    let level = *matches
        .get_one::<Level>("log-level")
        .expect("log level has a default");
    tracing_subscriber::fmt().with_max_level(level).init();

    // Parse args
    let n = *matches.get_one::<u32>("n").expect("n is required");
    let threshold = matches
        .get_one::<u32>("threshold")
        .copied()
        .or_else(|| optimal_threshold(n))
        .expect("unable to compute threshold");
    let dealer = *matches.get_one::<u32>("dealer").expect("dealer has a default");
    let seed = *matches.get_one::<u64>("seed").expect("seed has a default");
    let faults = Faults {
        corrupt: participants(&matches, "corrupt"),
        withhold: participants(&matches, "withhold"),
        silent: matches.get_flag("silent"),
    };
    info!(
        n,
        threshold,
        dealer,
        corrupt = ?faults.corrupt,
        withhold = ?faults.withhold,
        silent = faults.silent,
        "starting dealing"
    );

    // Create participants
    let instances = (0..n)
        .map(|me| {
            Instance::new(Config {
                size: n,
                threshold,
                me,
                dealer,
            })
            .expect("invalid configuration")
        })
        .collect();
    let mut simulation = Simulation {
        dealer,
        instances,
        faults,
        rng: StdRng::seed_from_u64(seed),
        queue: VecDeque::new(),
    };

    // Run the dealing
    simulation.start();
    info!("shares timeout elapsed");
    simulation.timeout();
    info!("complaints timeout elapsed");
    simulation.timeout();

    // Print outputs
    let mut public = None;
    for me in 0..n {
        let (actions, output) = simulation.instances[me as usize].end();
        simulation.enqueue(me, actions);
        match output {
            Ok(output) => {
                public.get_or_insert(output.public);
                println!("share-{}: {}", me, hex(&output.share.private.serialize()));
            }
            Err(err) => println!("share-{}: {}", me, err),
        }
    }
    match public {
        Some(public) => println!("public: {}", hex(&public.serialize())),
        None => println!("public: none"),
    }
}
