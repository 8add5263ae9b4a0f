//! Service-notification parsing.
//!
//! Notices from the services package are free text; the five patterns here
//! are the whole wire contract. Classification runs over a reference string
//! of the form `"<nick> <stripped message text>"` and produces at most one
//! event. Captured account and project names come back verbatim; callers
//! casefold them before storing or comparing.

use once_cell::sync::Lazy;
use regex::Regex;

// NickServ sandcat SET:ACCOUNTNAME: sandcat-1
// NickServ sandcat_ (sandcat) SET:ACCOUNTNAME: sandcat-1
static RENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^NickServ (?P<oldnick>\S+)(?: \((?P<oldacct>\S+)\))? SET:ACCOUNTNAME: (?P<new>\S+)$")
        .expect("invalid rename pattern")
});

// ProjectServ jess PROJECT:CONTACT:ADD: sandcat to jesstest (primary, private)
// ProjectServ jess_ (jess) PROJECT:CONTACT:ADD: sandcat to jesstest (primary, private)
static CONTACT_ADD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ProjectServ \S+(?: \S+)? PROJECT:CONTACT:ADD: (?P<gc>\S+) to (?P<proj>\S+) ")
        .expect("invalid contact-add pattern")
});

// ProjectServ jess PROJECT:CONTACT:DEL: sandcat from jesstest
// ProjectServ jess_ (jess) PROJECT:CONTACT:DEL: sandcat from jesstest
// OperServ PROJECT:CONTACT:LOST: sandcat from jesstest
static CONTACT_REMOVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S+Serv (?:\S+(?: \S+)? )?PROJECT:CONTACT:(?:DEL|LOST): (?P<gc>\S+) from (?P<proj>\S+)$")
        .expect("invalid contact-remove pattern")
});

// ProjectServ jess PROJECT:DROP: jesstest
// ProjectServ jess_ (jess) PROJECT:DROP: jesstest
static PROJECT_DROP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ProjectServ \S+(?: \S+)? PROJECT:DROP: (?P<proj>\S+)$")
        .expect("invalid project-drop pattern")
});

// - jesstest (#jesstest; jess, sandcat)
static LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- (?P<proj>\S+) \([^;]+; (?P<gcs>.*)\)$").expect("invalid listing pattern")
});

/// A directory-listing page line, as handed to a waiter.
pub static DIRECTORY_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^- ").expect("invalid listing-entry pattern"));

/// The directory listing's match-count terminator.
pub static DIRECTORY_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+ matches ").expect("invalid listing-end pattern"));

/// A recognized service notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An account changed its name.
    Rename { old: String, new: String },
    /// A contact was added to a project.
    ContactAdd { contact: String, project: String },
    /// A contact was removed from (or lost by) a project.
    ContactRemove { contact: String, project: String },
    /// A project was dropped outright.
    ProjectDrop { project: String },
}

/// Classify a `"<nick> <text>"` reference line.
///
/// Structure is matched case-sensitively. Returns `None` when nothing
/// matches; malformed input is never an error.
pub fn classify(reference: &str) -> Option<Notification> {
    if let Some(c) = RENAME.captures(reference) {
        // The parenthesized account, when present, is authoritative; the
        // bare token may be a drifted nick.
        let old = c.name("oldacct").or_else(|| c.name("oldnick"));
        if let (Some(old), Some(new)) = (old, c.name("new")) {
            return Some(Notification::Rename {
                old: old.as_str().to_string(),
                new: new.as_str().to_string(),
            });
        }
    }
    if let Some(c) = CONTACT_ADD.captures(reference) {
        if let (Some(gc), Some(proj)) = (c.name("gc"), c.name("proj")) {
            return Some(Notification::ContactAdd {
                contact: gc.as_str().to_string(),
                project: proj.as_str().to_string(),
            });
        }
    }
    if let Some(c) = CONTACT_REMOVE.captures(reference) {
        if let (Some(gc), Some(proj)) = (c.name("gc"), c.name("proj")) {
            return Some(Notification::ContactRemove {
                contact: gc.as_str().to_string(),
                project: proj.as_str().to_string(),
            });
        }
    }
    if let Some(c) = PROJECT_DROP.captures(reference) {
        if let Some(proj) = c.name("proj") {
            return Some(Notification::ProjectDrop {
                project: proj.as_str().to_string(),
            });
        }
    }
    None
}

/// One page of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub project: String,
    /// Contact accounts on the project; empty for `no contacts`.
    pub contacts: Vec<String>,
}

/// Parse a directory listing page line (already casefolded by the waiter).
pub fn parse_listing(text: &str) -> Option<Listing> {
    let c = LISTING.captures(text)?;
    let project = c.name("proj")?.as_str().to_string();
    let contacts = c
        .name("gcs")?
        .as_str()
        .split(", ")
        .filter(|gc| *gc != "no contacts")
        .map(str::to_string)
        .collect();
    Some(Listing { project, contacts })
}
