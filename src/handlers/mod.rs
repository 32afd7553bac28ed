// Two handler tiers: public (no auth, token acquisition) and protected
// (behind the auth middleware).
pub mod protected;
pub mod public;
