#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vssq_cryptography::bls12381::dkg::wire::{self, Tag};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    msg: Vec<u8>,
    size: u8,
    threshold: u8,
}

fn fuzz(input: FuzzInput) {
    let size = input.size as u32;
    let threshold = (input.threshold % 8) as u32;

    // Shares carry their own tag
    if let Ok(private) = wire::decode_share(&input.msg) {
        assert_eq!(wire::share(&private)[..], input.msg[..]);
    }

    let Ok((tag, payload)) = wire::split(&input.msg) else {
        return;
    };
    match tag {
        Tag::Share => {}
        Tag::VerificationVector => {
            if let Ok(commitment) = wire::decode_verification_vector(payload, threshold) {
                assert_eq!(commitment.required(), threshold + 1);
            }
        }
        Tag::Complaint => {
            if let Ok(complainee) = wire::decode_complaint(payload, size) {
                assert!(complainee < size);
                assert_eq!(wire::complaint(complainee)[..], input.msg[..]);
            }
        }
        Tag::ComplaintAnswer => {
            if let Ok((complainer, private)) = wire::decode_complaint_answer(payload, size) {
                assert!(complainer < size);
                assert_eq!(
                    wire::complaint_answer(complainer, &private)[..],
                    input.msg[..]
                );
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
