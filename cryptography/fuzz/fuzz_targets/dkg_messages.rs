#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::{rngs::StdRng, SeedableRng};
use vssq_cryptography::bls12381::dkg::{Action, Config, Error, Instance, Phase};

const SIZE: u32 = 5;
const THRESHOLD: u32 = 2;
const DEALER: u32 = 0;
const ME: u32 = 1;

#[derive(Arbitrary, Debug)]
enum Event {
    Broadcast { origin: u8, msg: Vec<u8> },
    Private { origin: u8, msg: Vec<u8> },
    Honest { index: u8 },
    Timeout,
    ForceDisqualify { participant: u8 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: u64,
    events: Vec<Event>,
}

fn fuzz(input: FuzzInput) {
    // Honest dealer messages that can be replayed in any order
    let mut dealer = Instance::new(Config {
        size: SIZE,
        threshold: THRESHOLD,
        me: DEALER,
        dealer: DEALER,
    })
    .unwrap();
    let honest = dealer
        .start(&mut StdRng::seed_from_u64(input.seed))
        .unwrap();

    let mut instance = Instance::new(Config {
        size: SIZE,
        threshold: THRESHOLD,
        me: ME,
        dealer: DEALER,
    })
    .unwrap();
    instance.start(&mut StdRng::seed_from_u64(0)).unwrap();

    let mut disqualified = false;
    for event in input.events.into_iter().take(64) {
        let result = match event {
            Event::Broadcast { origin, msg } => {
                instance.handle_broadcast(origin as u32, &msg)
            }
            Event::Private { origin, msg } => instance.handle_private(origin as u32, &msg),
            Event::Honest { index } => {
                match &honest[index as usize % honest.len()] {
                    Action::Broadcast(msg) => instance.handle_broadcast(DEALER, msg),
                    Action::Send { to, msg } if *to == ME => instance.handle_private(DEALER, msg),
                    _ => continue,
                }
            }
            Event::Timeout => {
                if instance.phase() == Phase::ComplaintsTimeoutElapsed {
                    break;
                }
                instance.next_timeout()
            }
            Event::ForceDisqualify { participant } => instance
                .force_disqualify(participant as u32)
                .map(|_| Vec::new()),
        };
        match result {
            Ok(actions) => {
                for action in actions {
                    match action {
                        Action::Disqualify { participant, .. } => {
                            assert_eq!(participant, DEALER);
                        }
                        Action::FlagMisbehavior { participant, .. } => {
                            assert!(participant < SIZE);
                        }
                        Action::Broadcast(_) => assert!(!disqualified),
                        Action::Send { .. } => panic!("participants never send privately"),
                    }
                }
            }
            Err(Error::InvalidInput(_)) => {}
            Err(err) => panic!("unexpected error: {}", err),
        }

        // Disqualification is sticky
        if disqualified {
            assert!(instance.is_disqualified());
        }
        disqualified = instance.is_disqualified();
    }

    // Finish the protocol
    while instance.phase() != Phase::ComplaintsTimeoutElapsed {
        instance.next_timeout().unwrap();
    }
    let (actions, result) = instance.end();
    match result {
        Ok(output) => {
            assert!(!disqualified);
            assert!(actions.is_empty());
            assert_eq!(output.share.public(), output.public_shares[ME as usize]);
        }
        Err(Error::Failure(_)) => {}
        Err(err) => panic!("unexpected error: {}", err),
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
