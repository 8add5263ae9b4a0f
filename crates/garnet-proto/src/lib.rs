//! Garnet protocol primitives
//!
//! Everything wire-adjacent and pure: the IRC line model, formatting and
//! case normalization, the service-notification patterns, and the
//! account-ban mask form. No I/O lives here; the node feeds this crate
//! stripped text and the engine consumes the structured results.

mod line;
mod notify;
mod text;

pub use line::Line;
pub use notify::{
    classify, parse_listing, Listing, Notification, DIRECTORY_ENTRY, DIRECTORY_END,
};
pub use text::{casefold, strip_formatting};

/// Numeric replies the node reacts to.
pub const RPL_WELCOME: &str = "001";
pub const RPL_YOUREOPER: &str = "381";
pub const RPL_BANLIST: &str = "367";
pub const RPL_ENDOFBANLIST: &str = "368";

/// Build the well-known account-ban mask for an account.
pub fn account_mask(account: &str) -> String {
    format!("$a:{account}")
}

/// Extract the account from an account-ban mask.
///
/// Returns `None` for every other mask form; foreign bans still occupy
/// capacity but carry no account.
pub fn mask_account(mask: &str) -> Option<&str> {
    mask.strip_prefix("$a:")
}
