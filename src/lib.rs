//! Carotaj Pro — interaction core for the lead-generation site.
//!
//! Two independent controllers: [`lead::LeadFormController`] for the quote
//! request form and [`chat::ChatSessionController`] for the technical
//! consultant widget. Both are configured from [`config::SiteConfig`].

pub mod chat;
pub mod config;
pub mod lead;
pub mod llm;
pub mod site;
