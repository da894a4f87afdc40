//! Property-based invariant checks (spec section 7): the address-decode
//! disjointness rule, the writable-mask law, and the event-counter pending
//! predicate, checked against randomly generated inputs rather than a
//! handful of hand-picked cases.

pub mod generators;
pub mod invariants;
pub mod strategies;
