use error_chain::error_chain;

error_chain! {
    links {
        Common(common::error::Error, common::error::ErrorKind);
    }

    errors{
        InvalidParameterSet(eligible: usize, minimum: usize) {
            description("Invalid Parameter Set")
            display("Invalid Parameter Set: eligible = {}, minimum = {}.\n Valid params: eligible >= 1, 1 <= minimum <= eligible", eligible, minimum)
        }
        InvalidChoice(number: i64) {
            description("Invalid commitment choice")
            display("Invalid commitment choice {}: expected -1 (decline) or a threshold >= 1", number)
        }
        MalformedCommitment(index: usize, t: String) {
            description("Malformed commitment")
            display("Commitment {} is malformed: {}", index, t)
        }
        InterpolationMismatch(level: usize, index: usize, t: String) {
            description("Recovered coefficients do not match the stored commitments")
            display("Interpolation mismatch at level {} (commitment {}): {}", level, index, t)
        }
    }
}
