//! HTTP Archive input: the entry model, archive parsing and the entry supply
//! that feeds the bounded worker queue.

mod model;
mod parse;
mod supply;

pub use model::{Entry, Har, HarCookie, HarLog, HarRequest, HarResponse, NameValue, PostData};
pub use parse::{load_entries, parse_entries};
pub use supply::{EntrySupply, HarSupply, IterSupply};
