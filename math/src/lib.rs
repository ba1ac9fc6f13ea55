//! Rebase math: the pure half of the settlement engine.
//!
//! A rebase never touches holders. It only moves the [`GlobalIndex`]:
//! `balance_factor_xy` rescales every holder's principal, and the two drift
//! pools (`balance_factor_ux`, `balance_factor_uy`) record how much value
//! moved between the legs. A holder's balances are recomputed lazily from
//! their [`UserSnapshot`] the next time they are touched:
//!
//! ```text
//! netX' = netX · F / F₀
//! ux'   = ux · Φ / Φ₀ + (Ux − Ux₀) · netX · Φ / (F₀ · WAD)
//! balanceX = netX' + ux' + uy'      balanceY = netY' + uy' + ux'
//! ```
//!
//! `Φ` is the fee index; with management fees disabled it stays at `WAD`
//! and the pool terms reduce to `ux + (Ux − Ux₀) · netX / F₀`.
//!
//! All arithmetic is unsigned WAD fixed point (1e18) with 256-bit
//! intermediates. Holder settlement truncates toward zero; the supply
//! aggregate rounds up so it bounds the holders from above. The factors are
//! renormalized in epochs before they run out of precision (see [`epoch`]).

pub mod advance;
pub mod epoch;
pub mod error;
pub mod fee;
pub mod fixed;
pub mod index;
pub mod settle;

pub use advance::advance_index;
pub use epoch::{settle_across, RENORMALIZE_BELOW};
pub use error::MathError;
pub use fee::{gross_for_net, interval_fee_factor, intervals_due, management_fee, FeeParameters};
pub use fixed::{mul_div, mul_div_rounded, mul_div_up, mul_mul_div, mul_mul_div_rounded, Rounding, WAD};
pub use index::{GlobalIndex, UserSnapshot};
pub use settle::{settle, settle_aggregate, Settlement};
