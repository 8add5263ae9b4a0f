//! Group-contact membership store.
//!
//! The many-to-many relation between group contacts and the projects that
//! make them group contacts, kept in both directions. A contact exists in
//! the store exactly as long as it belongs to at least one project; a
//! project exists as long as it has at least one member. All identifiers
//! are expected pre-casefolded by the caller.

use std::collections::{HashMap, HashSet};

/// Outcome of removing a contact from a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOutcome {
    /// The pair was actually related; false for unknown references.
    pub removed: bool,
    /// The contact's membership set emptied; it is no longer tracked.
    pub contact_dropped: bool,
    /// The project's membership set emptied; it is no longer tracked.
    pub project_dropped: bool,
}

/// The contact ↔ project relation.
#[derive(Debug, Clone, Default)]
pub struct MembershipStore {
    /// contact → projects it belongs to (non-empty while present)
    contacts: HashMap<String, HashSet<String>>,
    /// project → member contacts (inverse of the above)
    projects: HashMap<String, HashSet<String>>,
}

impl MembershipStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Relate `contact` and `project`. Idempotent set union.
    ///
    /// Returns `true` when the contact was previously untracked, the
    /// caller's cue that it just became a group contact.
    pub fn add(&mut self, contact: &str, project: &str) -> bool {
        self.projects
            .entry(project.to_string())
            .or_default()
            .insert(contact.to_string());
        let newly_relevant = !self.contacts.contains_key(contact);
        self.contacts
            .entry(contact.to_string())
            .or_default()
            .insert(project.to_string());
        newly_relevant
    }

    /// Unrelate `contact` and `project`, dropping either side that
    /// empties. Unknown references report a no-op outcome.
    pub fn remove(&mut self, contact: &str, project: &str) -> RemoveOutcome {
        let mut outcome = RemoveOutcome::default();
        if let Some(members) = self.projects.get_mut(project) {
            if members.remove(contact) {
                outcome.removed = true;
                if members.is_empty() {
                    self.projects.remove(project);
                    outcome.project_dropped = true;
                }
            }
        }
        if let Some(projects) = self.contacts.get_mut(contact) {
            if projects.remove(project) {
                outcome.removed = true;
                if projects.is_empty() {
                    self.contacts.remove(contact);
                    outcome.contact_dropped = true;
                }
            }
        }
        outcome
    }

    /// Remove `project` outright, regardless of member count.
    ///
    /// Returns the contacts left without any membership, ascending, so the
    /// caller can retire their grants deterministically.
    pub fn drop_project(&mut self, project: &str) -> Vec<String> {
        let Some(members) = self.projects.remove(project) else {
            return Vec::new();
        };
        let mut dropped = Vec::new();
        for contact in members {
            if let Some(projects) = self.contacts.get_mut(&contact) {
                projects.remove(project);
                if projects.is_empty() {
                    self.contacts.remove(&contact);
                    dropped.push(contact);
                }
            }
        }
        dropped.sort();
        dropped
    }

    /// Re-key a contact, rewriting every project member set it appears in.
    /// No-op when `old` is untracked.
    pub fn rename(&mut self, old: &str, new: &str) {
        let Some(projects) = self.contacts.remove(old) else {
            return;
        };
        for project in &projects {
            if let Some(members) = self.projects.get_mut(project) {
                members.remove(old);
                members.insert(new.to_string());
            }
        }
        self.contacts.insert(new.to_string(), projects);
    }

    /// Replace the whole relation and rebuild the inverse. Bootstrap only.
    pub fn replace(&mut self, desired: HashMap<String, HashSet<String>>) {
        self.projects.clear();
        for (contact, projects) in &desired {
            for project in projects {
                self.projects
                    .entry(project.clone())
                    .or_default()
                    .insert(contact.clone());
            }
        }
        self.contacts = desired;
    }

    /// Whether `contact` is currently a group contact.
    pub fn contains(&self, contact: &str) -> bool {
        self.contacts.contains_key(contact)
    }

    /// Projects a contact belongs to.
    pub fn projects_of(&self, contact: &str) -> Option<&HashSet<String>> {
        self.contacts.get(contact)
    }

    /// Members of a project.
    pub fn members_of(&self, project: &str) -> Option<&HashSet<String>> {
        self.projects.get(project)
    }

    /// Number of tracked contacts.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Number of tracked projects.
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// All tracked contacts, ascending.
    pub fn contacts_sorted(&self) -> Vec<&str> {
        let mut contacts: Vec<&str> = self.contacts.keys().map(String::as_str).collect();
        contacts.sort_unstable();
        contacts
    }
}
