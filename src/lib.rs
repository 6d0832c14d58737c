//! Rep Outreach: legislator roster browsing and outreach email drafting.

pub mod api;
pub mod composer;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod rewrite;
pub mod roster;
pub mod session;
