pub mod lookup_ctx;
pub mod place_lookup;

pub use lookup_ctx::LookupCtx;
pub use place_lookup::{classify_response, PlaceLookupClient, SlotHolding};
