use error_chain::error_chain;

error_chain! {
    errors{
        InsufficientShares(count: usize, needed: usize){
            description("The number of available shares is less than the required threshold.")
            display("The number of available shares is {count}. This is less than the required {needed} shares.")
        }
        InvalidDegree(k: usize, eligible: usize) {
            description("Invalid threshold")
            display("Invalid threshold k = {}. Valid thresholds: 1 <= k <= {}", k, eligible)
        }
        DuplicateAbscissa(index: usize) {
            description("Two shares share the same x coordinate")
            display("Share {} repeats the x coordinate of an earlier share", index)
        }
        NonCanonicalScalar(t: String) {
            description("Unable to decode field element")
            display("Unable to decode field element: '{}'", t)
        }
    }
}
